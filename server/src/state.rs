use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::watch;

use crate::events::{GameMode, SystemInfo};
use crate::registry::PushMessage;
use crate::synth::{HeaderContext, PlayerLabels};

/// Settings the device reported for the current game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameInfo {
    pub mode: Option<GameMode>,
    pub level: Option<u8>,
    pub book: Option<String>,
    pub time_control: Option<String>,
}

/// State owned by the display dispatcher. No locks: only the dispatch task
/// (or a bridge callback running on it) mutates it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DisplayState {
    pub system_info: Option<SystemInfo>,
    pub game_info: GameInfo,
    pub engine_options: Option<BTreeMap<String, String>>,
    /// Most recent move payload, served to late joiners.
    pub last_move: Option<PushMessage>,
}

impl DisplayState {
    pub fn header_context(&self, labels: &PlayerLabels, date: NaiveDate) -> HeaderContext {
        HeaderContext {
            labels: labels.clone(),
            mode: self.game_info.mode,
            level: self.game_info.level,
            time_control: self.game_info.time_control.clone(),
            site: self
                .system_info
                .as_ref()
                .and_then(|info| info.location())
                .map(str::to_string),
            date,
        }
    }
}

/// Read-only view of the latest committed [`DisplayState`].
///
/// Readers get an immutable snapshot, never a reference into live state.
#[derive(Clone)]
pub struct StateView {
    rx: watch::Receiver<Arc<DisplayState>>,
}

impl StateView {
    pub fn current(&self) -> Arc<DisplayState> {
        self.rx.borrow().clone()
    }
}

/// Writer half, held by the dispatcher.
pub(crate) struct StatePublisher {
    tx: watch::Sender<Arc<DisplayState>>,
}

impl StatePublisher {
    pub(crate) fn new() -> (Self, StateView) {
        let (tx, rx) = watch::channel(Arc::new(DisplayState::default()));
        (Self { tx }, StateView { rx })
    }

    pub(crate) fn commit(&self, state: &DisplayState) {
        self.tx.send_replace(Arc::new(state.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_context_reads_state() {
        let mut state = DisplayState::default();
        state.game_info.level = Some(4);
        state.game_info.mode = Some(GameMode::PlayWhite);
        state.system_info = Some(
            serde_json::from_str(r#"{"location":"Club"}"#).unwrap(),
        );
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let ctx = state.header_context(&PlayerLabels::default(), date);
        assert_eq!(ctx.level, Some(4));
        assert_eq!(ctx.site.as_deref(), Some("Club"));
        assert_eq!(ctx.mode, Some(GameMode::PlayWhite));
    }

    #[test]
    fn test_snapshots_are_detached() {
        let (publisher, view) = StatePublisher::new();
        let mut state = DisplayState::default();
        state.game_info.book = Some("gm2001".to_string());
        publisher.commit(&state);

        let snapshot = view.current();
        state.game_info.book = Some("changed".to_string());
        assert_eq!(snapshot.game_info.book.as_deref(), Some("gm2001"));
    }
}
