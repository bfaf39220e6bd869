//! UCI (Universal Chess Interface) move notation helpers

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::converters::{format_piece, format_square};

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
///
/// Only a king move is rewritten, and only when the converted move appears in
/// `legal_moves`. A rook or queen on e1/e8 keeps its literal destination.
pub fn convert_uci_castling_to_cozy(board: &Board, mv: Move, legal_moves: &[Move]) -> Move {
    if board.piece_on(mv.from) != Some(Piece::King) {
        return mv;
    }
    let is_back_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_back_rank && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        let rook_file = if mv.to.file() == File::G {
            File::H
        } else {
            File::A
        };
        let converted = Move {
            from: mv.from,
            to: Square::new(rook_file, mv.from.rank()),
            promotion: None,
        };

        if legal_moves.contains(&converted) {
            return converted;
        }
    }

    mv
}

/// Inverse of [`convert_uci_castling_to_cozy`]: rewrite a king-takes-own-rook
/// castling move into the two-square king move used by standard UCI.
pub fn to_standard_castling(board: &Board, mv: Move) -> Move {
    if !is_castling(board, mv) {
        return mv;
    }
    let file = if (mv.to.file() as u8) > (mv.from.file() as u8) {
        File::G
    } else {
        File::C
    };
    Move {
        from: mv.from,
        to: Square::new(file, mv.from.rank()),
        promotion: None,
    }
}

/// Whether `mv` is a castling move in cozy_chess notation on `board`.
pub fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.colors(board.side_to_move()).has(mv.to)
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

/// Parse a UCI move string and resolve it against the legal moves of `board`.
/// Accepts both standard (e1g1) and king-to-rook (e1h1) castling.
pub fn parse_uci_move(board: &Board, text: &str) -> Option<Move> {
    let mv: Move = text.trim().parse().ok()?;
    let mut legal = Vec::new();
    board.generate_moves(|moves| {
        legal.extend(moves);
        false
    });
    let mv = convert_uci_castling_to_cozy(board, mv, &legal);
    legal.contains(&mv).then_some(mv)
}
