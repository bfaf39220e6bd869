//! Display family: turns domain events into state updates and push messages.

use std::sync::Arc;

use chess::MoveSequence;
use chrono::NaiveDate;
use tracing::Instrument;

use crate::bridge::{CallbackQueue, EventLoopBridge, WORKER_COUNT};
use crate::events::DomainEvent;
use crate::queue::{self, EventQueue, EventSender};
use crate::registry::{BroadcastRegistry, PushMessage};
use crate::sink::ArchiveJob;
use crate::state::{DisplayState, StatePublisher, StateView};
use crate::synth::{self, HeaderContext, Outcome, PlayerLabels};

pub const MSG_NEW_GAME: &str = "New game";
pub const MSG_BOOK_MOVE: &str = "Book move";
pub const MSG_THINKING: &str = "Thinking..";
pub const MSG_SPECTATORS: &str = "Received position from Spectators!";
pub const BROADCAST_KIND: &str = "broadcast";

/// State and collaborators owned by the display dispatch task.
///
/// Bridge callbacks receive `&mut DisplayCore`, so they run with the same
/// exclusive access as event handlers.
pub struct DisplayCore {
    state: DisplayState,
    registry: Arc<BroadcastRegistry>,
    snapshots: StatePublisher,
    archive: Option<EventSender<ArchiveJob>>,
    labels: PlayerLabels,
}

impl DisplayCore {
    fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn header_context(&self) -> HeaderContext {
        self.state.header_context(&self.labels, Self::today())
    }

    /// Apply one event. Returns whether shared state changed and still needs
    /// committing; move events commit before they publish.
    fn handle(&mut self, event: DomainEvent) -> bool {
        match event {
            DomainEvent::GameStarted { game } => {
                self.publish_move(&game, Some(MSG_NEW_GAME.to_string()));
                false
            }
            DomainEvent::UserMove { game } => {
                let msg = game.last_move_uci().map(|mv| format!("User move: {}", mv));
                self.publish_move(&game, msg);
                false
            }
            DomainEvent::ComputerMove { game } => {
                let msg = game.last_move_uci().map(|mv| format!("Computer move: {}", mv));
                self.publish_move(&game, msg);
                false
            }
            DomainEvent::ReviewModeMove { game } => {
                self.publish_move(&game, None);
                false
            }
            DomainEvent::BookMoveHint { book_move } => {
                tracing::debug!(book_move = ?book_move, "Book move available");
                self.registry.publish(PushMessage::notice(MSG_BOOK_MOVE));
                false
            }
            DomainEvent::SearchStarted => {
                self.registry.publish(PushMessage::notice(MSG_THINKING));
                false
            }
            DomainEvent::OptionListChanged { options } => {
                self.state.engine_options = Some(options);
                true
            }
            DomainEvent::SystemInfoUpdated { info } => {
                self.state.system_info = Some(info);
                true
            }
            DomainEvent::OpeningBookSelected { book } => {
                self.state.game_info.book = Some(book);
                true
            }
            DomainEvent::ModeChanged { mode } => {
                self.state.game_info.mode = Some(mode);
                true
            }
            DomainEvent::TimeControlChanged { time_control } => {
                self.state.game_info.time_control = Some(time_control);
                true
            }
            DomainEvent::LevelChanged { level } => {
                self.state.game_info.level = Some(level);
                true
            }
            DomainEvent::GameEnded {
                game,
                result,
                color,
                mode,
            } => {
                if game.is_empty() {
                    tracing::debug!("Ignoring end of game without moves");
                    return false;
                }
                let mut context = self.header_context();
                if mode.is_some() {
                    context.mode = mode;
                }
                let job = ArchiveJob {
                    game,
                    outcome: Outcome { result, color },
                    context,
                };
                match &self.archive {
                    Some(archive) => {
                        if archive.enqueue(job).is_err() {
                            tracing::error!("Archive sink is gone, finished game dropped");
                        }
                    }
                    None => tracing::debug!("No archive sink configured"),
                }
                false
            }
        }
    }

    /// Synthesize the current game, cache the payload for late joiners and
    /// push it to every subscriber. The snapshot is committed first so pull
    /// readers never lag behind a pushed message.
    fn publish_move(&mut self, game: &MoveSequence, msg: Option<String>) {
        let synthesized = synth::synthesize(game, None, &self.header_context());
        let payload = PushMessage {
            kind: None,
            msg,
            mv: game.last_move_uci(),
            pgn: Some(synthesized.pgn),
            fen: Some(game.fen()),
        };
        self.state.last_move = Some(payload.clone());
        self.commit();
        let delivered = self.registry.publish(payload);
        tracing::debug!(plies = game.len(), delivered, "Published position");
    }

    /// Push a position submitted by a spectator. The cached payload is left alone.
    pub fn publish_spectator(&mut self, game: &MoveSequence, fen: Option<String>) {
        let synthesized = synth::synthesize(game, None, &self.header_context());
        let fen = fen
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| game.fen());
        self.registry.publish(PushMessage {
            kind: Some(BROADCAST_KIND.to_string()),
            msg: Some(MSG_SPECTATORS.to_string()),
            mv: None,
            pgn: Some(synthesized.pgn),
            fen: Some(fen),
        });
    }

    fn commit(&self) {
        self.snapshots.commit(&self.state);
    }
}

/// Replay SAN tokens from the standard start. The first illegal token stops
/// the replay; the legal prefix is kept.
pub fn replay_san<S: AsRef<str>>(tokens: &[S]) -> MoveSequence {
    let mut game = MoveSequence::new();
    for (ply, token) in tokens.iter().enumerate() {
        let token = token.as_ref();
        if let Err(e) = game.push_san(token) {
            tracing::warn!(ply, token, "Stopping replay at illegal move: {}", e);
            break;
        }
    }
    game
}

/// Parse a spectator's move list on a bridge worker, then publish the
/// result from the dispatch task.
pub fn broadcast_spectator_position(
    bridge: &EventLoopBridge<DisplayCore>,
    fen: Option<String>,
    move_stack: Vec<String>,
) -> bool {
    bridge.run_blocking(
        move || replay_san(&move_stack),
        move |core: &mut DisplayCore, game| core.publish_spectator(&game, fen),
    )
}

/// Handles returned to the rest of the process when the display family is built.
pub struct DisplayHandles {
    pub events: EventSender<DomainEvent>,
    pub bridge: EventLoopBridge<DisplayCore>,
    pub view: StateView,
}

pub struct DisplayDispatcher {
    core: DisplayCore,
    events: EventQueue<DomainEvent>,
    callbacks: CallbackQueue<DisplayCore>,
}

impl DisplayDispatcher {
    /// Build the dispatcher and its bridge. Must be called inside a tokio runtime.
    pub fn new(
        registry: Arc<BroadcastRegistry>,
        labels: PlayerLabels,
        archive: Option<EventSender<ArchiveJob>>,
    ) -> (Self, DisplayHandles) {
        let (events_tx, events) = queue::channel();
        let (bridge, callbacks) = EventLoopBridge::new(WORKER_COUNT);
        let (snapshots, view) = StatePublisher::new();
        let core = DisplayCore {
            state: DisplayState::default(),
            registry,
            snapshots,
            archive,
            labels,
        };
        (
            Self {
                core,
                events,
                callbacks,
            },
            DisplayHandles {
                events: events_tx,
                bridge,
                view,
            },
        )
    }

    /// Run until every event producer is gone.
    pub async fn run(self) {
        self.run_inner()
            .instrument(tracing::info_span!("dispatcher", family = "display"))
            .await
    }

    async fn run_inner(mut self) {
        tracing::info!("Display dispatcher started");
        let mut callbacks_open = true;

        loop {
            tokio::select! {
                callback = self.callbacks.dequeue(), if callbacks_open => match callback {
                    Some(callback) => {
                        callback(&mut self.core);
                        self.core.commit();
                    }
                    None => callbacks_open = false,
                },

                event = self.events.dequeue() => match event {
                    Some(event) => {
                        let kind = event.kind();
                        tracing::trace!(kind, "Handling event");
                        if self.core.handle(event) {
                            self.core.commit();
                        }
                    }
                    None => {
                        tracing::info!("Event queue closed, display dispatcher exiting");
                        break;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chess::PieceColor;

    use crate::events::{GameMode, GameResult};
    use crate::registry::Subscription;

    fn play(sans: &[&str]) -> MoveSequence {
        replay_san(sans)
    }

    struct Harness {
        events: EventSender<DomainEvent>,
        bridge: EventLoopBridge<DisplayCore>,
        view: StateView,
        sub: Subscription,
        archive: EventQueue<ArchiveJob>,
    }

    fn start() -> Harness {
        let registry = BroadcastRegistry::new();
        let sub = registry.subscribe();
        let (archive_tx, archive) = queue::channel();
        let (dispatcher, handles) = DisplayDispatcher::new(
            registry,
            PlayerLabels::new("Boardcast", Some("bob@example.org")),
            Some(archive_tx),
        );
        tokio::spawn(dispatcher.run());
        Harness {
            events: handles.events,
            bridge: handles.bridge,
            view: handles.view,
            sub,
            archive,
        }
    }

    #[tokio::test]
    async fn test_move_events_publish_in_order() {
        let mut h = start();
        h.events
            .enqueue(DomainEvent::GameStarted { game: MoveSequence::new() })
            .unwrap();
        h.events
            .enqueue(DomainEvent::UserMove { game: play(&["e4"]) })
            .unwrap();
        h.events
            .enqueue(DomainEvent::ComputerMove { game: play(&["e4", "e5"]) })
            .unwrap();
        h.events
            .enqueue(DomainEvent::ReviewModeMove { game: play(&["e4", "e5", "Nf3"]) })
            .unwrap();

        let first = h.sub.recv().await.unwrap();
        assert_eq!(first.msg.as_deref(), Some(MSG_NEW_GAME));
        assert_eq!(first.mv, None);

        let second = h.sub.recv().await.unwrap();
        assert_eq!(second.msg.as_deref(), Some("User move: e2e4"));
        assert_eq!(second.mv.as_deref(), Some("e2e4"));

        let third = h.sub.recv().await.unwrap();
        assert_eq!(third.msg.as_deref(), Some("Computer move: e7e5"));

        let fourth = h.sub.recv().await.unwrap();
        assert_eq!(fourth.msg, None);
        assert!(fourth.pgn.as_deref().unwrap().contains("1. e4 e5 2. Nf3 *"));

        let cached = h.view.current().last_move.clone().unwrap();
        assert_eq!(cached.mv.as_deref(), Some("g1f3"));
    }

    #[tokio::test]
    async fn test_state_events_feed_headers() {
        let mut h = start();
        h.events.enqueue(DomainEvent::LevelChanged { level: 4 }).unwrap();
        h.events
            .enqueue(DomainEvent::ModeChanged { mode: GameMode::PlayWhite })
            .unwrap();
        h.events
            .enqueue(DomainEvent::TimeControlChanged { time_control: "5+0".into() })
            .unwrap();
        h.events
            .enqueue(DomainEvent::OpeningBookSelected { book: "gm2001".into() })
            .unwrap();
        let mut options = BTreeMap::new();
        options.insert("Hash".to_string(), "64".to_string());
        h.events
            .enqueue(DomainEvent::OptionListChanged { options })
            .unwrap();
        h.events
            .enqueue(DomainEvent::UserMove { game: play(&["d4"]) })
            .unwrap();

        let msg = h.sub.recv().await.unwrap();
        let pgn = msg.pgn.as_deref().unwrap();
        assert!(pgn.contains("[White \"bob\"]"));
        assert!(pgn.contains("[Black \"Boardcast\"]"));
        assert!(pgn.contains("[BlackElo \"Level 4\"]"));
        assert!(pgn.contains("[Event \"Time 5+0\"]"));

        let snapshot = h.view.current();
        assert_eq!(snapshot.game_info.book.as_deref(), Some("gm2001"));
        assert_eq!(snapshot.game_info.level, Some(4));
        assert_eq!(
            snapshot.engine_options.as_ref().unwrap().get("Hash").map(String::as_str),
            Some("64")
        );
    }

    #[tokio::test]
    async fn test_notices_do_not_touch_cache() {
        let mut h = start();
        h.events
            .enqueue(DomainEvent::BookMoveHint { book_move: Some("e2e4".into()) })
            .unwrap();
        h.events.enqueue(DomainEvent::SearchStarted).unwrap();

        assert_eq!(h.sub.recv().await.unwrap().msg.as_deref(), Some(MSG_BOOK_MOVE));
        assert_eq!(h.sub.recv().await.unwrap().msg.as_deref(), Some(MSG_THINKING));
        assert!(h.view.current().last_move.is_none());
    }

    #[tokio::test]
    async fn test_game_end_is_handed_to_archive() {
        let mut h = start();
        h.events.enqueue(DomainEvent::LevelChanged { level: 2 }).unwrap();
        h.events
            .enqueue(DomainEvent::GameEnded {
                game: MoveSequence::new(),
                result: GameResult::Abort,
                color: PieceColor::White,
                mode: None,
            })
            .unwrap();
        h.events
            .enqueue(DomainEvent::GameEnded {
                game: play(&["f3", "e5", "g4", "Qh4#"]),
                result: GameResult::Mate,
                color: PieceColor::White,
                mode: Some(GameMode::PlayWhite),
            })
            .unwrap();

        let job = h.archive.dequeue().await.unwrap();
        assert_eq!(job.game.len(), 4);
        assert_eq!(job.outcome.result, GameResult::Mate);
        assert_eq!(job.context.level, Some(2));
        assert_eq!(job.context.mode, Some(GameMode::PlayWhite));
    }

    #[tokio::test]
    async fn test_spectator_position_is_broadcast() {
        let mut h = start();
        let tokens = vec!["e4".to_string(), "e5".to_string(), "Ke3".to_string(), "Nf3".to_string()];
        assert!(broadcast_spectator_position(&h.bridge, None, tokens));

        let msg = h.sub.recv().await.unwrap();
        assert_eq!(msg.kind.as_deref(), Some(BROADCAST_KIND));
        assert_eq!(msg.msg.as_deref(), Some(MSG_SPECTATORS));
        let pgn = msg.pgn.as_deref().unwrap();
        assert!(pgn.contains("1. e4 e5 *"));
        assert!(!pgn.contains("Nf3"));
        assert!(h.view.current().last_move.is_none());
    }

    #[test]
    fn test_replay_keeps_legal_prefix() {
        let game = replay_san(&["d4", "d5", "Qxh7", "c4"]);
        assert_eq!(game.len(), 2);
        assert!(replay_san::<&str>(&[]).is_empty());
    }
}
