//! Main entry point for the matchmaker service
//!
//! Reads join requests as JSON lines from stdin, e.g.
//! `{"id":"42","level":3,"country_code":"FI"}`, and writes every found match
//! (immediate or forced) as a JSON line to stdout. Runs until stdin closes or
//! a shutdown signal arrives.

use anyhow::Result;
use clap::Parser;
use matchmaker::competition::{CompetitionBridge, CompetitionStorage, InMemoryCompetitionStorage};
use matchmaker::config::AppConfig;
use matchmaker::{
    MatchListener, MatchmakingError, MatchmakingResult, MatchmakingService, PlayerData,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{debug, error, info, warn};

/// Matchmaker - level-based matchmaking queue for competitions
#[derive(Parser)]
#[command(
    name = "matchmaker",
    version,
    about = "Level-based matchmaking queue that forms competitions with a bounded wait time",
    long_about = "Reads join requests as JSON lines from stdin and prints each match as a JSON \
                 line. Full matches are formed as soon as enough players of similar level are \
                 queued; players waiting past the entry timeout are matched with whoever is \
                 available."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Players per match override
    #[arg(long, value_name = "N")]
    max_players: Option<usize>,

    /// Maximum level difference override
    #[arg(long, value_name = "N")]
    max_level_diff: Option<u32>,

    /// Scheduler interval override in milliseconds
    #[arg(long, value_name = "MS")]
    match_interval_ms: Option<u64>,

    /// Entry timeout override in milliseconds
    #[arg(long, value_name = "MS")]
    entry_timeout_ms: Option<u64>,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level.
///
/// Logs go to stderr so stdout only carries match results.
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load configuration from file or environment, then apply CLI overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if let Some(max_players) = args.max_players {
        config.matchmaking.max_players_in_match = max_players;
    }
    if let Some(max_level_diff) = args.max_level_diff {
        config.matchmaking.max_level_diff = max_level_diff;
    }
    if let Some(interval) = args.match_interval_ms {
        config.matchmaking.match_interval_ms = interval;
    }
    if let Some(timeout) = args.entry_timeout_ms {
        config.matchmaking.entry_timeout_ms = timeout;
    }

    matchmaker::config::validate_config(&config)?;
    Ok(config)
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Matchmaker service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   Players per match: {}",
        config.matchmaking.max_players_in_match
    );
    info!("   Max level diff: {}", config.matchmaking.max_level_diff);
    info!(
        "   Match interval: {}ms, entry timeout: {}ms",
        config.matchmaking.match_interval_ms, config.matchmaking.entry_timeout_ms
    );
    info!(
        "   Competition duration: {}s",
        config.competition.duration_seconds
    );
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Print a match as one JSON line and hand it to the competition bridge
#[derive(Clone)]
struct MatchPrinter {
    bridge: CompetitionBridge,
}

impl MatchListener for MatchPrinter {
    fn on_match_found(&self, result: MatchmakingResult) {
        match serde_json::to_string(&result) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize match result: {}", e),
        }
        self.bridge.on_match_found(result);
    }
}

/// Feed JSON join requests from stdin into the service until EOF
async fn read_join_requests(service: MatchmakingService, printer: MatchPrinter) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let player: PlayerData = match serde_json::from_str(line) {
            Ok(player) => player,
            Err(e) => {
                warn!("Ignoring malformed join request: {}", e);
                continue;
            }
        };

        match service.join(player) {
            Ok(result) if result.match_found => printer.on_match_found(result),
            Ok(_) => {}
            Err(MatchmakingError::AlreadyInMatchmaking { player_id }) => {
                warn!("Player '{}' is already in matchmaking", player_id);
            }
            Err(e) => error!("Join failed: {}", e),
        }
    }

    info!("Input closed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    let service = MatchmakingService::new(config.matchmaking_options())?;
    let storage: Arc<dyn CompetitionStorage> = Arc::new(InMemoryCompetitionStorage::new(
        config.competition.max_competitions,
    ));
    let (bridge, competition_worker) =
        CompetitionBridge::spawn(storage, config.competition_duration());
    let printer = MatchPrinter { bridge };

    let scheduler = service.start(printer.clone())?;
    info!("Matchmaker is running, reading join requests from stdin");

    let interrupted = tokio::select! {
        result = read_join_requests(service.clone(), printer.clone()) => {
            if let Err(e) = result {
                error!("Failed to read join requests: {}", e);
            }
            false
        }
        _ = wait_for_shutdown_signal() => {
            info!("Shutdown signal received, beginning graceful shutdown...");
            true
        }
    };

    let shutdown = async {
        scheduler.stop().await;
        drop(printer);
        if let Err(e) = competition_worker.await {
            warn!("Competition worker ended abnormally: {}", e);
        }
    };
    if tokio::time::timeout(config.shutdown_timeout(), shutdown)
        .await
        .is_err()
    {
        warn!("Shutdown timeout exceeded, forcing exit");
    }

    let stats = service.stats()?;
    info!(
        "Final statistics - waiting: {}, queued: {}, immediate matches: {}, forced matches: {}",
        stats.players_waiting, stats.players_queued, stats.immediate_matches, stats.forced_matches
    );
    match service.metrics().gather_text() {
        Ok(text) => debug!("Final metrics:\n{}", text),
        Err(e) => warn!("Failed to render metrics: {}", e),
    }

    info!("Matchmaker stopped");
    if interrupted {
        // The blocking stdin read cannot be cancelled and would hold the runtime open
        std::process::exit(0);
    }
    Ok(())
}
