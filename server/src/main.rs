use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use boardcast::sink::{build_transport, ArchiveSink, PgnStore};
use boardcast::web::{build_router, AppState};
use boardcast::{feed, queue, run_archive_sink, BroadcastRegistry, Config, DisplayDispatcher, PlayerLabels};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "boardcast-server", version, about = "Broadcast live chess-board events to browsers")]
struct Cli {
    /// Address for the HTTP and WebSocket listener (overrides BOARDCAST_HTTP_ADDR)
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// PGN archive file (overrides BOARDCAST_PGN_FILE)
    #[arg(long)]
    pgn_file: Option<PathBuf>,

    /// Do not read JSON-lines events from stdin
    #[arg(long)]
    no_stdin: bool,
}

/// Console logging, plus a daily-rotated file when a log directory is configured.
/// The returned guard must live as long as the process.
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "boardcast.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(addr) = cli.addr {
        config.http_addr = addr;
    }
    if let Some(pgn_file) = cli.pgn_file {
        config.pgn_file = pgn_file;
    }

    let _log_guard = init_tracing(config.log_dir.as_ref());
    tracing::info!("Starting Boardcast server");
    tracing::info!("Archiving games to {}", config.pgn_file.display());

    let notifier = match &config.notify {
        Some(notify) => match build_transport(notify) {
            Ok(transport) => {
                tracing::info!(transport = transport.name(), "Mail delivery enabled");
                Some(transport)
            }
            Err(e) => {
                tracing::warn!("Mail delivery disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let (archive_tx, archive_rx) = queue::channel();
    let sink = ArchiveSink::new(PgnStore::new(config.pgn_file.clone()), notifier);
    tokio::spawn(run_archive_sink(sink, archive_rx));

    let registry = BroadcastRegistry::new();
    let labels = PlayerLabels::new(config.device_label.clone(), config.email.as_deref());
    let (dispatcher, handles) = DisplayDispatcher::new(Arc::clone(&registry), labels, Some(archive_tx));
    tokio::spawn(dispatcher.run());

    if !cli.no_stdin {
        let events = handles.events.clone();
        tokio::spawn(async move {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            match feed::feed_json_lines(stdin, &events).await {
                Ok(stats) => tracing::info!(accepted = stats.accepted, skipped = stats.skipped, "Event feed ended"),
                Err(e) => tracing::error!("Event feed failed: {}", e),
            }
        });
    }

    let app = build_router(Arc::new(AppState {
        registry,
        view: handles.view,
        bridge: handles.bridge,
    }));

    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    tracing::info!("Server listening on {}", config.http_addr);

    // Keeps the display queue open after stdin closes.
    let _events = handles.events;
    axum::serve(listener, app).await?;

    Ok(())
}
