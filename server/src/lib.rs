//! Boardcast: fans chess-board events out to live viewers and archives
//! finished games as PGN.

pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod events;
pub mod feed;
pub mod queue;
pub mod registry;
pub mod sink;
pub mod state;
pub mod synth;
pub mod web;

pub use bridge::{EventLoopBridge, WORKER_COUNT};
pub use config::{Config, ConfigError, NotifyConfig};
pub use dispatcher::{DisplayDispatcher, DisplayHandles};
pub use events::{DomainEvent, GameMode, GameResult, SystemInfo};
pub use queue::{EventQueue, EventSender};
pub use registry::{BroadcastRegistry, PushMessage, Subscription};
pub use sink::{run_archive_sink, ArchiveJob, ArchiveSink, PgnStore};
pub use state::{DisplayState, StateView};
pub use synth::{synthesize, HeaderContext, Outcome, PlayerLabels};
