use cozy_chess::{Board, Color, GameStatus, Move};
use serde::{Deserialize, Serialize};

use crate::fen::{self, FenError, STANDARD_FEN};
use crate::pgn::san::{self, SanError};
use crate::uci;

/// Ordered, append-only list of legal moves played from a starting position.
///
/// Every appended move is validated against the current position, so a
/// sequence can always be replayed from its start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SequenceRecord", into = "SequenceRecord")]
pub struct MoveSequence {
    start: StartPosition,
    start_board: Board,
    position: Board,
    moves: Vec<Move>,
}

/// Starting position of the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPosition {
    Standard,
    Fen(String),
}

impl StartPosition {
    pub fn fen(&self) -> &str {
        match self {
            Self::Standard => STANDARD_FEN,
            Self::Fen(fen) => fen,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Fen(_))
    }
}

impl MoveSequence {
    /// Empty sequence from the standard starting position
    pub fn new() -> Self {
        Self {
            start: StartPosition::Standard,
            start_board: Board::default(),
            position: Board::default(),
            moves: Vec::new(),
        }
    }

    /// Empty sequence from a custom position. A FEN equal to the standard
    /// initial position is treated as a standard start.
    pub fn from_fen(fen: &str) -> Result<Self, SequenceError> {
        let board = fen::parse_fen(fen)?;
        let normalized = fen::format_fen(&board);
        let start = if normalized == STANDARD_FEN {
            StartPosition::Standard
        } else {
            StartPosition::Fen(normalized)
        };
        Ok(Self {
            start,
            start_board: board.clone(),
            position: board,
            moves: Vec::new(),
        })
    }

    pub fn start(&self) -> &StartPosition {
        &self.start
    }

    /// Board at the starting position
    pub fn start_board(&self) -> &Board {
        &self.start_board
    }

    /// Board after the last move
    pub fn position(&self) -> &Board {
        &self.position
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn status(&self) -> GameStatus {
        self.position.status()
    }

    /// FEN of the current position
    pub fn fen(&self) -> String {
        fen::format_fen(&self.position)
    }

    /// Append a move in cozy_chess notation.
    pub fn push(&mut self, mv: Move) -> Result<(), SequenceError> {
        if !self.position.is_legal(mv) {
            return Err(SequenceError::IllegalMove(uci::format_uci_move(mv)));
        }
        self.position.play_unchecked(mv);
        self.moves.push(mv);
        Ok(())
    }

    /// Append a move given in UCI notation (standard or king-to-rook castling).
    pub fn push_uci(&mut self, text: &str) -> Result<Move, SequenceError> {
        let mv = uci::parse_uci_move(&self.position, text)
            .ok_or_else(|| SequenceError::IllegalMove(text.to_string()))?;
        self.push(mv)?;
        Ok(mv)
    }

    /// Append a move given in SAN.
    pub fn push_san(&mut self, text: &str) -> Result<Move, SequenceError> {
        let mv = san::parse_san(&self.position, text)?;
        self.push(mv)?;
        Ok(mv)
    }

    /// Moves in standard UCI notation (castling as a two-square king move).
    pub fn uci_moves(&self) -> Vec<String> {
        let mut board = self.start_board.clone();
        self.moves
            .iter()
            .map(|&mv| {
                let text = uci::format_uci_move(uci::to_standard_castling(&board, mv));
                board.play_unchecked(mv);
                text
            })
            .collect()
    }

    /// Last move in standard UCI notation.
    pub fn last_move_uci(&self) -> Option<String> {
        self.uci_moves().pop()
    }
}

impl Default for MoveSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for MoveSequence {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.moves == other.moves
    }
}

impl Eq for MoveSequence {}

/// Wire form of a [`MoveSequence`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SequenceRecord {
    #[serde(default)]
    start_fen: Option<String>,
    #[serde(default)]
    moves: Vec<String>,
}

impl TryFrom<SequenceRecord> for MoveSequence {
    type Error = SequenceError;

    fn try_from(record: SequenceRecord) -> Result<Self, Self::Error> {
        let mut sequence = match record.start_fen.as_deref() {
            Some(fen) => Self::from_fen(fen)?,
            None => Self::new(),
        };
        for text in &record.moves {
            sequence.push_uci(text)?;
        }
        Ok(sequence)
    }
}

impl From<MoveSequence> for SequenceRecord {
    fn from(sequence: MoveSequence) -> Self {
        Self {
            start_fen: match &sequence.start {
                StartPosition::Standard => None,
                StartPosition::Fen(fen) => Some(fen.clone()),
            },
            moves: sequence.uci_moves(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error(transparent)]
    San(#[from] SanError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_validates_legality() {
        let mut seq = MoveSequence::new();
        seq.push_uci("e2e4").unwrap();
        assert_eq!(seq.len(), 1);
        assert!(matches!(
            seq.push_uci("e2e4"),
            Err(SequenceError::IllegalMove(_))
        ));
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.side_to_move(), Color::Black);
    }

    #[test]
    fn test_standard_fen_is_standard_start() {
        let seq = MoveSequence::from_fen(STANDARD_FEN).unwrap();
        assert_eq!(seq.start(), &StartPosition::Standard);
        assert_eq!(seq, MoveSequence::new());
    }

    #[test]
    fn test_custom_start() {
        let fen = "7k/5Q2/5K2/8/8/8/8/8 w - - 0 1";
        let mut seq = MoveSequence::from_fen(fen).unwrap();
        assert!(seq.start().is_custom());
        seq.push_san("Qg7#").unwrap();
        assert_eq!(seq.status(), GameStatus::Won);
        assert_eq!(seq.start_board().to_string(), fen);
    }

    #[test]
    fn test_serde_roundtrip_uses_standard_castling() {
        let mut seq =
            MoveSequence::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        seq.push_san("O-O").unwrap();
        let json = serde_json::to_value(&seq).unwrap();
        assert_eq!(json["moves"][0], "e1g1");

        let back: MoveSequence = serde_json::from_value(json).unwrap();
        assert_eq!(back, seq);
    }

    #[test]
    fn test_deserialize_rejects_illegal_moves() {
        let result: Result<MoveSequence, _> =
            serde_json::from_str(r#"{"moves": ["e2e4", "e2e4"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_last_move_uci() {
        let mut seq = MoveSequence::new();
        assert_eq!(seq.last_move_uci(), None);
        seq.push_san("Nf3").unwrap();
        assert_eq!(seq.last_move_uci().as_deref(), Some("g1f3"));
    }

    #[test]
    fn test_push_uci_keeps_rook_move_from_e1() {
        let mut seq = MoveSequence::from_fen("3k4/8/8/8/8/8/8/K3R3 w - - 0 1").unwrap();
        seq.push_uci("e1g1").unwrap();
        assert_eq!(seq.last_move_uci().as_deref(), Some("e1g1"));
        assert_eq!(seq.fen(), "3k4/8/8/8/8/8/8/K5R1 b - - 1 1");
    }
}
