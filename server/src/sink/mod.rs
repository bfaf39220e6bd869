//! Persistence family: archives finished games and notifies the player.
//!
//! The store append always happens first; delivery is best effort and its
//! failure never loses the game.

pub mod notify;
pub mod store;

use chess::MoveSequence;
use tracing::Instrument;

pub use notify::{build_transport, NotifyError, NotifyTransport, RelayApiTransport, SmtpTransport};
pub use store::{PgnStore, StoreError};

use crate::queue::EventQueue;
use crate::synth::{self, HeaderContext, Outcome};

/// A finished game handed over by the display dispatcher.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    pub game: MoveSequence,
    pub outcome: Outcome,
    /// Header context captured when the game ended.
    pub context: HeaderContext,
}

/// What happened to one archive job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveReport {
    pub stored: bool,
    pub notified: bool,
}

pub struct ArchiveSink {
    store: PgnStore,
    notifier: Option<Box<dyn NotifyTransport>>,
}

impl ArchiveSink {
    pub fn new(store: PgnStore, notifier: Option<Box<dyn NotifyTransport>>) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &PgnStore {
        &self.store
    }

    /// Synthesize the final PGN, append it, then try to deliver it.
    /// Errors are logged, never returned.
    pub async fn archive(&self, job: ArchiveJob) -> ArchiveReport {
        let synthesized = synth::synthesize(&job.game, Some(&job.outcome), &job.context);
        let result = synthesized.headers.get("Result").unwrap_or("*").to_string();

        let store = self.store.clone();
        let pgn = synthesized.pgn.clone();
        let stored = match tokio::task::spawn_blocking(move || store.append(&pgn)).await {
            Ok(Ok(())) => {
                tracing::info!(plies = job.game.len(), result = %result, "Game archived");
                true
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to archive game: {}", e);
                false
            }
            Err(e) => {
                tracing::error!("Archive task panicked: {}", e);
                false
            }
        };

        let notified = match &self.notifier {
            Some(transport) => match transport.deliver(&synthesized.pgn).await {
                Ok(()) => {
                    tracing::info!(transport = transport.name(), "Game mailed");
                    true
                }
                Err(e) => {
                    tracing::warn!(transport = transport.name(), "Mail delivery failed: {}", e);
                    false
                }
            },
            None => false,
        };

        ArchiveReport { stored, notified }
    }
}

/// Consume archive jobs until every producer is gone.
pub async fn run_archive_sink(sink: ArchiveSink, mut jobs: EventQueue<ArchiveJob>) {
    async move {
        tracing::info!(store = %sink.store().path().display(), "Archive sink started");
        while let Some(job) = jobs.dequeue().await {
            sink.archive(job).await;
        }
        tracing::info!("Archive queue closed, sink exiting");
    }
    .instrument(tracing::info_span!("dispatcher", family = "archive"))
    .await
}
