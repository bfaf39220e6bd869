//! Newline-delimited JSON event feed, used to drive the dispatcher from
//! an external producer (the binary wires it to stdin).

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::events::DomainEvent;
use crate::queue::EventSender;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub accepted: usize,
    pub skipped: usize,
}

/// Read events until EOF or until the dispatcher is gone. Blank lines are
/// ignored and malformed lines are logged and skipped.
pub async fn feed_json_lines<R>(reader: R, events: &EventSender<DomainEvent>) -> std::io::Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = FeedStats::default();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<DomainEvent>(line) {
            Ok(event) => {
                tracing::debug!(line = line_no, kind = event.kind(), "Event received");
                if events.enqueue(event).is_err() {
                    tracing::warn!("Dispatcher has shut down, stopping event feed");
                    break;
                }
                stats.accepted += 1;
            }
            Err(e) => {
                tracing::warn!(line = line_no, "Skipping malformed event: {}", e);
                stats.skipped += 1;
            }
        }
    }
    Ok(stats)
}
