use crate::game::{MoveSequence, SequenceError};

use super::headers::PgnHeaders;

/// A parsed PGN game (main line only)
#[derive(Debug, Clone)]
pub struct PgnGame {
    pub tags: PgnHeaders,
    pub game: MoveSequence,
    pub result: ResultToken,
}

/// Game termination marker from the movetext
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultToken {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl ResultToken {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "1-0" => Some(Self::WhiteWins),
            "0-1" => Some(Self::BlackWins),
            "1/2-1/2" => Some(Self::Draw),
            "*" => Some(Self::Ongoing),
            _ => None,
        }
    }
}

/// Parse the first game of a PGN string.
///
/// Comments, NAGs and variations are skipped. When a `FEN` tag is present
/// the moves are replayed from it.
pub fn parse_pgn(input: &str) -> Result<PgnGame, PgnError> {
    let mut tags = PgnHeaders::new();
    let mut movetext = String::new();
    let mut in_movetext = false;

    for line in input.lines() {
        let trimmed = line.trim();
        if !in_movetext && trimmed.starts_with('[') {
            let (name, value) = parse_tag(trimmed)?;
            tags.set(name, value);
        } else if !trimmed.is_empty() || in_movetext {
            in_movetext = true;
            movetext.push_str(line);
            movetext.push('\n');
        }
    }

    let mut game = match tags.get("FEN") {
        Some(fen) => MoveSequence::from_fen(fen)?,
        None => MoveSequence::new(),
    };

    let mut result = None;
    for token in tokenize(&movetext) {
        if let Some(r) = ResultToken::from_token(&token) {
            result = Some(r);
            break;
        }
        let san = strip_move_number(&token);
        if san.is_empty() {
            continue;
        }
        let ply = game.len() + 1;
        game.push_san(san)
            .map_err(|source| PgnError::Move { ply, source })?;
    }

    let result = result
        .or_else(|| tags.get("Result").and_then(ResultToken::from_token))
        .unwrap_or(ResultToken::Ongoing);

    Ok(PgnGame { tags, game, result })
}

fn parse_tag(line: &str) -> Result<(String, String), PgnError> {
    let inner = line
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .ok_or_else(|| PgnError::InvalidTag(line.to_string()))?;
    let (name, rest) = inner
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| PgnError::InvalidTag(line.to_string()))?;
    let quoted = rest
        .trim()
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .ok_or_else(|| PgnError::InvalidTag(line.to_string()))?;

    let mut value = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(escaped);
            }
        } else {
            value.push(c);
        }
    }
    Ok((name.to_string(), value))
}

/// Split movetext into move, number and result tokens, dropping comments,
/// NAGs and (nested) variations.
fn tokenize(movetext: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = movetext.chars().peekable();

    // Tokens inside a variation are discarded.
    let end_token = |current: &mut String, tokens: &mut Vec<String>, depth: usize| {
        if depth == 0 && !current.is_empty() {
            tokens.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                end_token(&mut current, &mut tokens, depth);
                for inner in chars.by_ref() {
                    if inner == '}' {
                        break;
                    }
                }
            }
            ';' => {
                end_token(&mut current, &mut tokens, depth);
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '(' => {
                end_token(&mut current, &mut tokens, depth);
                depth += 1;
            }
            ')' => {
                end_token(&mut current, &mut tokens, depth);
                depth = depth.saturating_sub(1);
            }
            '$' => {
                end_token(&mut current, &mut tokens, depth);
                while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                    chars.next();
                }
            }
            c if c.is_whitespace() => end_token(&mut current, &mut tokens, depth),
            c => current.push(c),
        }
    }
    end_token(&mut current, &mut tokens, depth);
    tokens
}

/// "12." / "12..." / "12.e4" → "" / "" / "e4"
fn strip_move_number(token: &str) -> &str {
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == token.len() || !rest.starts_with('.') {
        return token;
    }
    rest.trim_start_matches('.')
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error("Invalid move at ply {ply}: {source}")]
    Move {
        ply: usize,
        #[source]
        source: SequenceError,
    },
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}
