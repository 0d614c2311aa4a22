//! Queue Simulator CLI Tool
//!
//! Drives an in-process matchmaking service with synthetic players and
//! reports how matches were formed.
//!
//! Usage:
//!   cargo run --bin queue-simulator -- --help
//!   cargo run --bin queue-simulator burst --players 100 --levels 10
//!   cargo run --bin queue-simulator steady --players 50 --rate 20 --entry-timeout-ms 2000
//!   cargo run --bin queue-simulator scenario --name clusters

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use matchmaker::{MatchmakingOptions, MatchmakingResult, MatchmakingService, PlayerData};

#[derive(Parser)]
#[command(name = "queue-simulator")]
#[command(about = "Simulate player traffic against an in-process matchmaking queue")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    queue: QueueArgs,
}

#[derive(Args)]
struct QueueArgs {
    /// Players per match
    #[arg(long, default_value = "10", global = true)]
    max_players: usize,

    /// Maximum level difference within a match
    #[arg(long, default_value = "2", global = true)]
    max_level_diff: u32,

    /// Scheduler interval in milliseconds
    #[arg(long, default_value = "100", global = true)]
    match_interval_ms: u64,

    /// Entry timeout in milliseconds
    #[arg(long, default_value = "1000", global = true)]
    entry_timeout_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Join all players at once, then wait for the queue to drain
    Burst {
        /// Number of players
        #[arg(short, long, default_value = "100")]
        players: usize,
        /// Number of distinct levels players are spread over
        #[arg(short, long, default_value = "10")]
        levels: i64,
    },
    /// Join players at a fixed rate
    Steady {
        /// Number of players
        #[arg(short, long, default_value = "50")]
        players: usize,
        /// Joins per second
        #[arg(short, long, default_value = "10")]
        rate: u64,
        /// Number of distinct levels players are spread over
        #[arg(short, long, default_value = "10")]
        levels: i64,
    },
    /// Run a predefined scenario (every-third, clusters, partial, duplicate)
    Scenario {
        /// Scenario name
        #[arg(short, long)]
        name: String,
    },
}

impl QueueArgs {
    fn options(&self) -> MatchmakingOptions {
        MatchmakingOptions::new(
            self.max_players,
            Duration::from_millis(self.match_interval_ms),
            Duration::from_millis(self.entry_timeout_ms),
            self.max_level_diff,
        )
    }
}

/// Collects every match the scheduler hands out
#[derive(Clone, Default)]
struct MatchLog {
    forced: Arc<Mutex<Vec<MatchmakingResult>>>,
}

impl MatchLog {
    fn listener(&self) -> impl Fn(MatchmakingResult) + Send + Sync + 'static {
        let forced = self.forced.clone();
        move |result: MatchmakingResult| {
            if let Ok(mut forced) = forced.lock() {
                forced.push(result);
            }
        }
    }

    fn forced(&self) -> Vec<MatchmakingResult> {
        self.forced
            .lock()
            .map(|forced| forced.clone())
            .unwrap_or_default()
    }
}

/// Deterministic level spread so runs are reproducible
fn synthetic_player(index: usize, levels: i64) -> PlayerData {
    let level = ((index as i64).wrapping_mul(7919)).rem_euclid(levels.max(1));
    PlayerData::new(format!("player-{}", index), level, "US")
}

fn print_match(source: &str, result: &MatchmakingResult) {
    let levels: Vec<i64> = result.players.iter().map(|p| p.level).collect();
    println!(
        "  {:<9} {:>2} players  ids={:?} levels={:?}",
        source,
        result.players.len(),
        result.player_ids(),
        levels
    );
}

async fn wait_for_drain(service: &MatchmakingService, options: &MatchmakingOptions) -> Result<()> {
    let deadline = options.max_wait() + options.match_interval * 2;
    let started = tokio::time::Instant::now();

    while service.size()? > 0 && started.elapsed() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

fn report(
    service: &MatchmakingService,
    immediate: &[MatchmakingResult],
    log: &MatchLog,
) -> Result<()> {
    println!("\nImmediate matches: {}", immediate.len());
    for result in immediate {
        print_match("immediate", result);
    }

    let forced = log.forced();
    println!("Forced matches: {}", forced.len());
    for result in &forced {
        print_match("forced", result);
    }

    let stats = service.stats()?;
    println!("\nQueue statistics");
    println!("  still waiting:   {}", stats.players_waiting);
    println!("  players queued:  {}", stats.players_queued);
    println!("  players matched: {}", stats.players_matched);
    println!("  duplicate joins: {}", stats.duplicate_joins);
    if let Some(oldest) = stats.oldest_wait {
        println!("  oldest wait:     {:?}", oldest);
    }

    println!("\nMetrics");
    println!("{}", service.metrics().gather_text()?);
    Ok(())
}

async fn run_players(
    options: MatchmakingOptions,
    players: Vec<PlayerData>,
    pause: Option<Duration>,
) -> Result<()> {
    let service = MatchmakingService::new(options.clone())?;
    let log = MatchLog::default();
    let scheduler = service.start(log.listener())?;

    let mut immediate = Vec::new();
    for player in players {
        match service.join(player) {
            Ok(result) if result.match_found => immediate.push(result),
            Ok(_) => {}
            Err(e) => println!("  join rejected: {}", e),
        }
        if let Some(pause) = pause {
            tokio::time::sleep(pause).await;
        }
    }

    wait_for_drain(&service, &options).await?;
    scheduler.stop().await;

    report(&service, &immediate, &log)
}

async fn run_scenario(name: &str, queue: &QueueArgs) -> Result<()> {
    let base = queue.options();
    let (options, players): (MatchmakingOptions, Vec<PlayerData>) = match name {
        "every-third" => (
            MatchmakingOptions { max_players_in_match: 3, max_level_diff: 0, ..base },
            (1..=6).map(|i| PlayerData::new(i.to_string(), 1, "US")).collect(),
        ),
        "clusters" => (
            MatchmakingOptions { max_players_in_match: 3, max_level_diff: 1, ..base },
            [1, 1, 3, 1, 4, 4]
                .iter()
                .enumerate()
                .map(|(i, level)| PlayerData::new((i + 1).to_string(), *level, "US"))
                .collect(),
        ),
        "partial" => (
            MatchmakingOptions { max_players_in_match: 3, max_level_diff: 0, ..base },
            (1..=2).map(|i| PlayerData::new(i.to_string(), 1, "US")).collect(),
        ),
        "duplicate" => (
            MatchmakingOptions { max_players_in_match: 3, max_level_diff: 0, ..base },
            vec![
                PlayerData::new("1", 1, "US"),
                PlayerData::new("1", 1, "US"),
            ],
        ),
        _ => {
            return Err(anyhow::anyhow!(
                "Unknown scenario. Use every-third, clusters, partial or duplicate"
            ))
        }
    };

    println!("Running scenario '{}'", name);
    run_players(options, players, None).await
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = cli.queue.options();
    options.validate()?;

    println!(
        "Queue simulator - {} players per match, level diff {}, timeout {:?}",
        options.max_players_in_match, options.max_level_diff, options.entry_timeout
    );

    match cli.command {
        Commands::Burst { players, levels } => {
            let players = (0..players).map(|i| synthetic_player(i, levels)).collect();
            run_players(options, players, None).await
        }
        Commands::Steady {
            players,
            rate,
            levels,
        } => {
            let pause = Duration::from_millis(1000 / rate.max(1));
            let players = (0..players).map(|i| synthetic_player(i, levels)).collect();
            run_players(options, players, Some(pause)).await
        }
        Commands::Scenario { name } => run_scenario(&name, &cli.queue).await,
    }
}
