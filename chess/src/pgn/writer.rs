use crate::game::MoveSequence;

use super::headers::PgnHeaders;
use super::san::format_san;

/// Export width used when wrapping movetext.
const LINE_WIDTH: usize = 80;

/// Serialize a game as a PGN document: tag pairs, a blank line, then the
/// movetext terminated by the `Result` tag's value (`*` when absent).
///
/// Output depends only on the inputs, so identical calls produce identical text.
pub fn write_pgn(headers: &PgnHeaders, game: &MoveSequence) -> String {
    let mut out = String::new();
    for (name, value) in headers.iter() {
        out.push('[');
        out.push_str(name);
        out.push_str(" \"");
        out.push_str(&escape_tag_value(value));
        out.push_str("\"]\n");
    }
    if !headers.is_empty() {
        out.push('\n');
    }
    out.push_str(&format_movetext(game, headers.get("Result").unwrap_or("*")));
    out.push('\n');
    out
}

/// Render the main line of `game` followed by `result`, wrapped to 80 columns.
pub fn format_movetext(game: &MoveSequence, result: &str) -> String {
    let mut tokens = Vec::with_capacity(game.len() * 2 + 1);
    let mut board = game.start_board().clone();

    for (ply, &mv) in game.moves().iter().enumerate() {
        let number = board.fullmove_number();
        match board.side_to_move() {
            cozy_chess::Color::White => tokens.push(format!("{}.", number)),
            cozy_chess::Color::Black if ply == 0 => tokens.push(format!("{}...", number)),
            cozy_chess::Color::Black => {}
        }
        tokens.push(format_san(&board, mv));
        board.play_unchecked(mv);
    }
    tokens.push(result.to_string());

    wrap(&tokens)
}

fn wrap(tokens: &[String]) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    for token in tokens {
        if line_len > 0 && line_len + 1 + token.len() > LINE_WIDTH {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(token);
        line_len += token.len();
    }
    out
}

/// Tag values must stay on one line: control characters become spaces.
fn escape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out
}
