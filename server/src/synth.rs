//! PGN state synthesis: headers and movetext derived from a move sequence.
//!
//! Everything here is pure. Headers are rebuilt from scratch on every call;
//! nothing is patched incrementally.

use chess::{MoveSequence, PgnHeaders, PieceColor};
use chrono::NaiveDate;

use crate::events::{GameMode, GameResult};

pub const DEFAULT_DEVICE_LABEL: &str = "Boardcast";
pub const DEFAULT_OPPONENT_LABEL: &str = "Player";
/// Rating shown for the device when no level is known.
pub const DEFAULT_DEVICE_RATING: &str = "2900";
const UNRATED: &str = "-";
const DEFAULT_EVENT: &str = "Game";
const DEFAULT_SITE: &str = "?";
const UNKNOWN_ROUND: &str = "-";
const ONGOING: &str = "*";

/// Names written into the White/Black headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLabels {
    pub device: String,
    pub opponent: String,
}

impl PlayerLabels {
    /// The opponent is named after the local part of `email` when one is configured.
    pub fn new(device: impl Into<String>, email: Option<&str>) -> Self {
        let opponent = email
            .and_then(|e| e.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or(DEFAULT_OPPONENT_LABEL);
        Self {
            device: device.into(),
            opponent: opponent.to_string(),
        }
    }
}

impl Default for PlayerLabels {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_LABEL, None)
    }
}

/// Everything besides the moves that feeds into the headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderContext {
    pub labels: PlayerLabels,
    pub mode: Option<GameMode>,
    pub level: Option<u8>,
    pub time_control: Option<String>,
    pub site: Option<String>,
    pub date: NaiveDate,
}

impl HeaderContext {
    /// Context with nothing known except the date.
    pub fn new(labels: PlayerLabels, date: NaiveDate) -> Self {
        Self {
            labels,
            mode: None,
            level: None,
            time_control: None,
            site: None,
            date,
        }
    }

    /// Side the device plays. Without a game mode the device is assumed to play Black.
    pub fn device_side(&self) -> PieceColor {
        self.mode
            .and_then(GameMode::device_side)
            .unwrap_or(PieceColor::Black)
    }
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub result: GameResult,
    /// Side that suffered the terminal condition (mated, flagged, or to move).
    pub color: PieceColor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedGame {
    pub headers: PgnHeaders,
    pub pgn: String,
}

/// Result tag for an optional outcome.
pub fn result_tag(outcome: Option<&Outcome>) -> &'static str {
    let Some(outcome) = outcome else {
        return ONGOING;
    };
    match outcome.result {
        GameResult::Abort => ONGOING,
        GameResult::Stalemate
        | GameResult::SeventyFiveMoves
        | GameResult::FivefoldRepetition
        | GameResult::InsufficientMaterial => "1/2-1/2",
        GameResult::Mate | GameResult::TimeControl => match outcome.color {
            PieceColor::White => "0-1",
            PieceColor::Black => "1-0",
        },
    }
}

/// Build the header block for `game`.
pub fn build_headers(game: &MoveSequence, outcome: Option<&Outcome>, ctx: &HeaderContext) -> PgnHeaders {
    let device = ctx.device_side();
    let (white, black) = match device {
        PieceColor::White => (&ctx.labels.device, &ctx.labels.opponent),
        PieceColor::Black => (&ctx.labels.opponent, &ctx.labels.device),
    };
    let date = ctx.date.format("%Y.%m.%d").to_string();

    let mut headers = PgnHeaders::new();
    headers.set(
        "Event",
        match &ctx.time_control {
            Some(tc) => format!("Time {}", tc),
            None => DEFAULT_EVENT.to_string(),
        },
    );
    headers.set("Site", ctx.site.as_deref().unwrap_or(DEFAULT_SITE));
    headers.set("Date", date.clone());
    headers.set("Round", UNKNOWN_ROUND);
    headers.set("White", white.as_str());
    headers.set("Black", black.as_str());
    headers.set("Result", result_tag(outcome));

    let device_rating = match ctx.level {
        Some(level) => format!("Level {}", level),
        None => DEFAULT_DEVICE_RATING.to_string(),
    };
    for side in [PieceColor::White, PieceColor::Black] {
        let rating = if side == device {
            device_rating.clone()
        } else {
            UNRATED.to_string()
        };
        headers.set(format!("{}Elo", side.tag_prefix()), rating);
    }

    headers.set("EventDate", date);
    if let Some(tc) = &ctx.time_control {
        headers.set("TimeControl", tc.as_str());
    }
    if game.start().is_custom() {
        headers.set("SetUp", "1");
        headers.set("FEN", game.start().fen());
    }
    headers
}

/// Headers plus serialized PGN for `game`. Never fails: an empty sequence
/// gives a headers-only document and missing context falls back to defaults.
pub fn synthesize(game: &MoveSequence, outcome: Option<&Outcome>, ctx: &HeaderContext) -> SynthesizedGame {
    let headers = build_headers(game, outcome, ctx);
    let pgn = chess::write_pgn(&headers, game);
    SynthesizedGame { headers, pgn }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> HeaderContext {
        HeaderContext::new(
            PlayerLabels::new("Boardcast", Some("alice@example.org")),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        )
    }

    fn play(sans: &[&str]) -> MoveSequence {
        let mut game = MoveSequence::new();
        for san in sans {
            game.push_san(san).unwrap();
        }
        game
    }

    fn outcome(result: GameResult, color: PieceColor) -> Outcome {
        Outcome { result, color }
    }

    #[test]
    fn test_device_plays_white_scenario() {
        let mut ctx = ctx();
        ctx.mode = Some(GameMode::PlayBlack);
        let game = play(&["e4", "e5", "Nf3"]);

        let out = synthesize(&game, None, &ctx);
        assert_eq!(out.headers.get("Result"), Some("*"));
        assert_eq!(out.headers.get("White"), Some("Boardcast"));
        assert_eq!(out.headers.get("Black"), Some("alice"));
        assert_eq!(out.headers.get("WhiteElo"), Some(DEFAULT_DEVICE_RATING));
        assert_eq!(out.headers.get("BlackElo"), Some("-"));
        let movetext = out.pgn.split("\n\n").nth(1).unwrap();
        assert!(movetext.starts_with("1. e4 e5 2. Nf3"));
    }

    #[test]
    fn test_mate_maps_from_losing_color() {
        // the device plays White and got mated
        let mut ctx = ctx();
        ctx.mode = Some(GameMode::PlayBlack);
        let game = play(&["f3", "e5", "g4", "Qh4#"]);
        let out = synthesize(&game, Some(&outcome(GameResult::Mate, PieceColor::White)), &ctx);
        assert_eq!(out.headers.get("Result"), Some("0-1"));
        assert!(out.pgn.trim_end().ends_with("Qh4# 0-1"));
    }

    #[test]
    fn test_result_table() {
        let cases = [
            (GameResult::Abort, PieceColor::White, "*"),
            (GameResult::Stalemate, PieceColor::White, "1/2-1/2"),
            (GameResult::SeventyFiveMoves, PieceColor::Black, "1/2-1/2"),
            (GameResult::FivefoldRepetition, PieceColor::White, "1/2-1/2"),
            (GameResult::InsufficientMaterial, PieceColor::Black, "1/2-1/2"),
            (GameResult::Mate, PieceColor::White, "0-1"),
            (GameResult::Mate, PieceColor::Black, "1-0"),
            (GameResult::TimeControl, PieceColor::White, "0-1"),
            (GameResult::TimeControl, PieceColor::Black, "1-0"),
        ];
        for (result, color, expected) in cases {
            assert_eq!(result_tag(Some(&outcome(result, color))), expected, "{:?}/{:?}", result, color);
        }
        assert_eq!(result_tag(None), "*");
    }

    #[test]
    fn test_missing_context_uses_defaults() {
        let ctx = HeaderContext::new(PlayerLabels::default(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        let out = synthesize(&MoveSequence::new(), None, &ctx);
        assert_eq!(out.headers.get("Event"), Some("Game"));
        assert_eq!(out.headers.get("Site"), Some("?"));
        assert_eq!(out.headers.get("Date"), Some("2024.01.02"));
        // no mode: device plays Black
        assert_eq!(out.headers.get("White"), Some(DEFAULT_OPPONENT_LABEL));
        assert_eq!(out.headers.get("Black"), Some(DEFAULT_DEVICE_LABEL));
        assert!(out.pgn.ends_with("\n\n*\n"));
    }

    #[test]
    fn test_level_site_and_time_control() {
        let mut ctx = ctx();
        ctx.mode = Some(GameMode::PlayWhite);
        ctx.level = Some(12);
        ctx.site = Some("Living room".to_string());
        ctx.time_control = Some("5+3".to_string());
        let out = synthesize(&MoveSequence::new(), None, &ctx);
        assert_eq!(out.headers.get("Event"), Some("Time 5+3"));
        assert_eq!(out.headers.get("Site"), Some("Living room"));
        assert_eq!(out.headers.get("BlackElo"), Some("Level 12"));
        assert_eq!(out.headers.get("WhiteElo"), Some("-"));
        assert_eq!(out.headers.get("White"), Some("alice"));
    }

    #[test]
    fn test_custom_start_emits_fen() {
        let fen = "7k/5Q2/5K2/8/8/8/8/8 w - - 0 1";
        let mut game = MoveSequence::from_fen(fen).unwrap();
        game.push_san("Qg7#").unwrap();
        let out = synthesize(&game, None, &ctx());
        assert_eq!(out.headers.get("SetUp"), Some("1"));
        assert_eq!(out.headers.get("FEN"), Some(fen));

        let parsed = chess::parse_pgn(&out.pgn).unwrap();
        assert_eq!(parsed.game, game);
    }

    #[test]
    fn test_synthesis_is_idempotent_and_round_trips() {
        let ctx = ctx();
        let game = play(&["d4", "d5", "c4", "e6", "Nc3", "Nf6", "Bg5", "Be7"]);
        let first = synthesize(&game, None, &ctx);
        let second = synthesize(&game, None, &ctx);
        assert_eq!(first, second);

        let parsed = chess::parse_pgn(&first.pgn).unwrap();
        assert_eq!(parsed.game.moves(), game.moves());
    }

    #[test]
    fn test_opponent_label_without_email() {
        assert_eq!(PlayerLabels::new("X", None).opponent, DEFAULT_OPPONENT_LABEL);
        assert_eq!(PlayerLabels::new("X", Some("@nowhere")).opponent, DEFAULT_OPPONENT_LABEL);
        assert_eq!(PlayerLabels::new("X", Some("bob")).opponent, "bob");
    }

    #[test]
    fn test_free_form_context_keeps_record_parseable() {
        let mut ctx = HeaderContext::new(
            PlayerLabels::new("Board\nroom", Some("alice@example.org")),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        );
        ctx.site = Some("Living\nroom".to_string());
        ctx.time_control = Some("5+0\r\n[bonus]".to_string());
        let game = play(&["e4", "e5"]);

        let out = synthesize(&game, None, &ctx);
        let parsed = chess::parse_pgn(&out.pgn).unwrap();
        assert_eq!(parsed.tags.get("Site"), Some("Living room"));
        assert_eq!(parsed.tags.get("TimeControl"), Some("5+0  [bonus]"));
        assert_eq!(parsed.tags.get("Black"), Some("Board room"));
        assert_eq!(parsed.game, game);
    }

    mod round_trip {
        use super::*;
        use proptest::prelude::*;

        const STARTS: [Option<&str>; 3] = [
            None,
            Some("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"),
            Some("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1"),
        ];

        proptest! {
            /// Games fed in as UCI come back out of the synthesized PGN unchanged.
            #[test]
            fn prop_synthesized_pgn_reproduces_moves(
                start in 0usize..STARTS.len(),
                choices in prop::collection::vec(any::<u16>(), 0..60),
            ) {
                let mut game = match STARTS[start] {
                    Some(fen) => MoveSequence::from_fen(fen).unwrap(),
                    None => MoveSequence::new(),
                };
                for choice in choices {
                    let mut legal = Vec::new();
                    game.position().generate_moves(|mvs| {
                        legal.extend(mvs);
                        false
                    });
                    if legal.is_empty() {
                        break;
                    }
                    game.push(legal[choice as usize % legal.len()]).unwrap();
                }

                let wire = serde_json::to_string(&game).unwrap();
                let ingested: MoveSequence = serde_json::from_str(&wire).unwrap();
                prop_assert_eq!(&ingested, &game);

                let out = synthesize(&ingested, None, &ctx());
                let parsed = chess::parse_pgn(&out.pgn).unwrap();
                prop_assert_eq!(&parsed.game, &game);
                prop_assert_eq!(parsed.tags.get("SetUp").is_some(), game.start().is_custom());
            }
        }
    }
}
