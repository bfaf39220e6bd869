use std::collections::BTreeMap;

use chess::{MoveSequence, PieceColor};
use serde::{Deserialize, Serialize};

/// Domain events produced by the board, engine and menu collaborators.
///
/// Move-carrying variants hold the whole game so far; the move itself is the
/// sequence's last entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(clippy::large_enum_variant)]
pub enum DomainEvent {
    GameStarted {
        game: MoveSequence,
    },
    UserMove {
        game: MoveSequence,
    },
    ComputerMove {
        game: MoveSequence,
    },
    ReviewModeMove {
        game: MoveSequence,
    },
    /// The engine's opening book covers the current position.
    BookMoveHint {
        #[serde(default)]
        book_move: Option<String>,
    },
    /// The engine started thinking.
    SearchStarted,
    OptionListChanged {
        options: BTreeMap<String, String>,
    },
    SystemInfoUpdated {
        info: SystemInfo,
    },
    OpeningBookSelected {
        book: String,
    },
    ModeChanged {
        mode: GameMode,
    },
    TimeControlChanged {
        time_control: String,
    },
    LevelChanged {
        level: u8,
    },
    GameEnded {
        game: MoveSequence,
        result: GameResult,
        /// Side to move when the game ended; for mate and flag-fall this is the loser.
        color: PieceColor,
        /// Mode the game was played in, if the producer knows it.
        #[serde(default)]
        mode: Option<GameMode>,
    },
}

impl DomainEvent {
    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameStarted { .. } => "game_started",
            Self::UserMove { .. } => "user_move",
            Self::ComputerMove { .. } => "computer_move",
            Self::ReviewModeMove { .. } => "review_mode_move",
            Self::BookMoveHint { .. } => "book_move_hint",
            Self::SearchStarted => "search_started",
            Self::OptionListChanged { .. } => "option_list_changed",
            Self::SystemInfoUpdated { .. } => "system_info_updated",
            Self::OpeningBookSelected { .. } => "opening_book_selected",
            Self::ModeChanged { .. } => "mode_changed",
            Self::TimeControlChanged { .. } => "time_control_changed",
            Self::LevelChanged { .. } => "level_changed",
            Self::GameEnded { .. } => "game_ended",
        }
    }
}

/// Interaction mode of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// The user plays White against the device.
    PlayWhite,
    /// The user plays Black against the device.
    PlayBlack,
    Analysis,
    Kibitz,
    Observe,
    Remote,
}

impl GameMode {
    /// Side the user plays, for modes that are a game against the device.
    pub fn user_side(self) -> Option<PieceColor> {
        match self {
            Self::PlayWhite => Some(PieceColor::White),
            Self::PlayBlack => Some(PieceColor::Black),
            Self::Analysis | Self::Kibitz | Self::Observe | Self::Remote => None,
        }
    }

    pub fn device_side(self) -> Option<PieceColor> {
        self.user_side().map(PieceColor::opponent)
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Abort,
    Mate,
    TimeControl,
    Stalemate,
    SeventyFiveMoves,
    FivefoldRepetition,
    InsufficientMaterial,
}

/// Free-form system information reported by the device (location, version, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemInfo(pub BTreeMap<String, serde_json::Value>);

impl SystemInfo {
    pub fn location(&self) -> Option<&str> {
        self.0
            .get("location")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_side_is_opposite_of_user() {
        assert_eq!(GameMode::PlayWhite.device_side(), Some(PieceColor::Black));
        assert_eq!(GameMode::PlayBlack.device_side(), Some(PieceColor::White));
        assert_eq!(GameMode::Analysis.device_side(), None);
    }

    #[test]
    fn test_event_json_shape() {
        let json = r#"{"type":"user_move","game":{"moves":["e2e4","e7e5"]}}"#;
        let event: DomainEvent = serde_json::from_str(json).unwrap();
        match event {
            DomainEvent::UserMove { game } => assert_eq!(game.len(), 2),
            other => panic!("unexpected event {:?}", other),
        }

        let json = r#"{"type":"game_ended","game":{"moves":["f2f3","e7e5","g2g4","d8h4"]},"result":"mate","color":"white","mode":"play_black"}"#;
        let event: DomainEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), "game_ended");
    }

    #[test]
    fn test_event_with_illegal_game_is_rejected() {
        let json = r#"{"type":"computer_move","game":{"moves":["e2e5"]}}"#;
        assert!(serde_json::from_str::<DomainEvent>(json).is_err());
    }

    #[test]
    fn test_system_info_location() {
        let info: SystemInfo =
            serde_json::from_str(r#"{"location":"Berlin","version":"3.1"}"#).unwrap();
        assert_eq!(info.location(), Some("Berlin"));
        assert_eq!(SystemInfo::default().location(), None);
    }
}
