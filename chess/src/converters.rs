//! Square, file, rank and piece conversions between cozy-chess types and
//! their algebraic text forms.

use cozy_chess::{File, Piece, Rank, Square};

pub fn format_file(file: File) -> char {
    (b'a' + file as u8) as char
}

pub fn format_rank(rank: Rank) -> char {
    (b'1' + rank as u8) as char
}

/// Format a square as e.g. "e4".
pub fn format_square(sq: Square) -> String {
    let mut s = String::with_capacity(2);
    s.push(format_file(sq.file()));
    s.push(format_rank(sq.rank()));
    s
}

pub fn parse_file(c: char) -> Option<File> {
    match c {
        'a'..='h' => Some(File::index(c as usize - 'a' as usize)),
        _ => None,
    }
}

pub fn parse_rank(c: char) -> Option<Rank> {
    match c {
        '1'..='8' => Some(Rank::index(c as usize - '1' as usize)),
        _ => None,
    }
}

pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = parse_file(chars.next()?)?;
    let rank = parse_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

/// Lowercase piece letter as used in UCI promotions.
pub fn format_piece(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}
