use cozy_chess::{Board, GameStatus, Move, Piece, Square};

use crate::converters::{format_file, format_rank, format_square, parse_file, parse_rank, parse_square};
use crate::types::PieceKind;
use crate::uci::is_castling;

/// Parse Standard Algebraic Notation (SAN) move
///
/// Check, mate and annotation suffixes are ignored. Castling accepts both
/// letter O and digit zero forms. A move that matches several legal moves
/// is rejected as ambiguous rather than guessed.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let text = san
        .trim()
        .trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'));
    if text.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = legal_moves(board);

    match text {
        "O-O" | "0-0" => return find_castling(board, &legal, true, san),
        "O-O-O" | "0-0-0" => return find_castling(board, &legal, false, san),
        _ => {}
    }

    let mut chars: Vec<char> = text.chars().collect();

    let piece = match chars.first().copied().and_then(PieceKind::from_san_letter) {
        Some(kind) => {
            chars.remove(0);
            Piece::from(kind)
        }
        None => Piece::Pawn,
    };

    let promotion = parse_promotion(&mut chars, piece, san)?;

    if chars.len() < 2 {
        return Err(SanError::InvalidFormat(san.to_string()));
    }
    let dest_text: String = chars[chars.len() - 2..].iter().collect();
    let to = parse_square(&dest_text).ok_or_else(|| SanError::InvalidSquare(dest_text.clone()))?;
    chars.truncate(chars.len() - 2);

    let mut from_file = None;
    let mut from_rank = None;
    for c in chars {
        match c {
            'x' | ':' | '-' => {}
            'a'..='h' => from_file = parse_file(c),
            '1'..='8' => from_rank = parse_rank(c),
            other => return Err(SanError::InvalidFile(other)),
        }
    }

    let candidates: Vec<Move> = legal
        .into_iter()
        .filter(|&mv| {
            mv.to == to
                && mv.promotion == promotion
                && board.piece_on(mv.from) == Some(piece)
                && !is_castling(board, mv)
                && from_file.is_none_or(|f| mv.from.file() == f)
                && from_rank.is_none_or(|r| mv.from.rank() == r)
        })
        .collect();

    match candidates.as_slice() {
        [mv] => Ok(*mv),
        [] => Err(SanError::NoLegalMove(san.to_string())),
        _ => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

/// Format a legal move as SAN, including disambiguation and check/mate suffix.
pub fn format_san(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return crate::uci::format_uci_move(mv);
    };

    let mut san = String::new();

    if is_castling(board, mv) {
        if (mv.to.file() as u8) > (mv.from.file() as u8) {
            san.push_str("O-O");
        } else {
            san.push_str("O-O-O");
        }
    } else {
        let capture = is_capture(board, mv, piece);
        match PieceKind::from(piece).san_letter() {
            Some(letter) => {
                san.push(letter);
                san.push_str(&disambiguation(board, mv, piece));
            }
            None => {
                if capture {
                    san.push(format_file(mv.from.file()));
                }
            }
        }
        if capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));
        if let Some(promo) = mv.promotion.and_then(|p| PieceKind::from(p).san_letter()) {
            san.push('=');
            san.push(promo);
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        san.push(if after.status() == GameStatus::Won {
            '#'
        } else {
            '+'
        });
    }

    san
}

fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

fn find_castling(
    board: &Board,
    legal: &[Move],
    kingside: bool,
    san: &str,
) -> Result<Move, SanError> {
    legal
        .iter()
        .copied()
        .find(|&mv| {
            is_castling(board, mv) && ((mv.to.file() as u8) > (mv.from.file() as u8)) == kingside
        })
        .ok_or_else(|| SanError::NoLegalMove(san.to_string()))
}

fn parse_promotion(
    chars: &mut Vec<char>,
    piece: Piece,
    san: &str,
) -> Result<Option<Piece>, SanError> {
    if piece != Piece::Pawn {
        return Ok(None);
    }
    let Some(&last) = chars.last() else {
        return Ok(None);
    };
    let Some(kind) = PieceKind::from_san_letter(last) else {
        return Ok(None);
    };
    if kind == PieceKind::King {
        return Err(SanError::InvalidPromotion(san.to_string()));
    }
    chars.pop();
    if chars.last() == Some(&'=') {
        chars.pop();
    }
    Ok(Some(Piece::from(kind)))
}

fn is_capture(board: &Board, mv: Move, piece: Piece) -> bool {
    if board.piece_on(mv.to).is_some() {
        return true;
    }
    // en passant: diagonal pawn move onto an empty square
    piece == Piece::Pawn && mv.from.file() != mv.to.file()
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let mut rivals: Vec<Square> = Vec::new();
    board.generate_moves(|mvs| {
        if mvs.piece == piece {
            for other in mvs {
                if other.to == mv.to && other.from != mv.from && !is_castling(board, other) {
                    rivals.push(other.from);
                }
            }
        }
        false
    });

    if rivals.is_empty() {
        return String::new();
    }
    let file_unique = rivals.iter().all(|sq| sq.file() != mv.from.file());
    let rank_unique = rivals.iter().all(|sq| sq.rank() != mv.from.rank());
    if file_unique {
        format_file(mv.from.file()).to_string()
    } else if rank_unique {
        format_rank(mv.from.rank()).to_string()
    } else {
        format_square(mv.from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid file: {0}")]
    InvalidFile(char),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}
