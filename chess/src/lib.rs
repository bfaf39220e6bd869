pub mod converters;
pub mod fen;
pub mod game;
pub mod pgn;
pub mod types;
pub mod uci;

pub use converters::*;
pub use fen::{FenError, STANDARD_FEN};
pub use game::{MoveSequence, SequenceError, StartPosition};
pub use pgn::{parse_pgn, write_pgn, PgnError, PgnGame, PgnHeaders, ResultToken};
pub use types::{PieceColor, PieceKind};
pub use uci::{convert_uci_castling_to_cozy, format_uci_move, parse_uci_move, to_standard_castling};
