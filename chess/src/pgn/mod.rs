//! Portable Game Notation: SAN moves, header blocks, export and import.

pub mod headers;
pub mod parser;
pub mod san;
pub mod writer;

pub use headers::PgnHeaders;
pub use parser::{parse_pgn, PgnError, PgnGame, ResultToken};
pub use san::{format_san, parse_san, SanError};
pub use writer::{format_movetext, write_pgn};
