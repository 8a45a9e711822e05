//! Phase Follower - Main Entry Point
//!
//! Offline driver for the engine: classify a snapshot, walk an acquisition
//! plan batch by batch, or evaluate protection for an open position.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phase_follower::config::{Config, LoggingConfig};
use phase_follower::execution::{
    InMemoryPlanRepository, PlanRepository, PositionBuilder, RandomSource, SeededRandom,
    ThreadRandom,
};
use phase_follower::persistence::SqlitePlanRepository;
use phase_follower::phase::{MarketSnapshot, PhaseDetector};
use phase_follower::risk::{AlertLog, ChannelCoordinator, PositionProtector};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Phase Follower CLI
#[derive(Parser)]
#[command(name = "phase-follower")]
#[command(version, about = "Phase-adaptive position building and protection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the market phase of a snapshot
    Detect {
        /// Snapshot as inline JSON or a path to a JSON file
        #[arg(short, long)]
        snapshot: String,
    },

    /// Build an acquisition plan and walk it batch by batch
    Plan {
        /// Trading symbol
        #[arg(long)]
        symbol: String,

        /// Target position size
        #[arg(short, long)]
        target: Decimal,

        /// Size already held
        #[arg(short, long, default_value = "0")]
        current: Decimal,

        /// Snapshot as inline JSON or a path to a JSON file
        #[arg(short, long)]
        snapshot: String,

        /// Split every batch into randomized child orders
        #[arg(long)]
        stealth: bool,

        /// Seed for reproducible child order splitting
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Evaluate protection for an open position
    Protect {
        /// Trading symbol
        #[arg(long)]
        symbol: String,

        /// Current position size
        #[arg(short, long)]
        position: Decimal,

        /// Snapshot as inline JSON or a path to a JSON file
        #[arg(short, long)]
        snapshot: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Detect { snapshot } => run_detect(&snapshot),
        Commands::Plan {
            symbol,
            target,
            current,
            snapshot,
            stealth,
            seed,
        } => {
            let snapshot = parse_snapshot(&snapshot)?;
            match (config.persistence.plan_db_path.as_deref(), seed) {
                (Some(path), Some(seed)) => run_plan(
                    PositionBuilder::with_parts(
                        SqlitePlanRepository::new(path)?,
                        SeededRandom::new(seed),
                        config.stealth.clone(),
                    ),
                    &symbol,
                    target,
                    current,
                    &snapshot,
                    stealth,
                ),
                (Some(path), None) => run_plan(
                    PositionBuilder::with_parts(
                        SqlitePlanRepository::new(path)?,
                        ThreadRandom,
                        config.stealth.clone(),
                    ),
                    &symbol,
                    target,
                    current,
                    &snapshot,
                    stealth,
                ),
                (None, Some(seed)) => run_plan(
                    PositionBuilder::with_parts(
                        InMemoryPlanRepository::new(),
                        SeededRandom::new(seed),
                        config.stealth.clone(),
                    ),
                    &symbol,
                    target,
                    current,
                    &snapshot,
                    stealth,
                ),
                (None, None) => run_plan(
                    PositionBuilder::new(config.stealth.clone()),
                    &symbol,
                    target,
                    current,
                    &snapshot,
                    stealth,
                ),
            }
        }
        Commands::Protect {
            symbol,
            position,
            snapshot,
        } => run_protect(&config, &symbol, position, &snapshot).await,
    }
}

/// Initialize logging to stderr, plus an hourly rolling file when configured.
fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    let filter = EnvFilter::from_default_env()
        .add_directive("phase_follower=debug".parse()?)
        .add_directive(Level::INFO.into());

    let Some(log_dir) = config.log_dir.as_deref() else {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true);
        if config.json {
            builder.json().init();
        } else {
            builder.init();
        }
        return Ok(());
    };

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {log_dir}"))?;

    let file_appender = tracing_appender::rolling::hourly(log_dir, "phase-follower.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer guard alive for the program duration
    Box::leak(Box::new(guard));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr.and(file_writer))
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    if config.json {
        builder.json().init();
    } else {
        builder.with_ansi(false).init();
    }

    Ok(())
}

/// Parse a snapshot given either inline or as a file path.
fn parse_snapshot(input: &str) -> Result<MarketSnapshot> {
    let trimmed = input.trim_start();
    let json = if trimmed.starts_with('{') {
        input.to_string()
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read snapshot file {input}"))?
    };

    serde_json::from_str(&json).context("Invalid market snapshot")
}

fn run_detect(snapshot: &str) -> Result<()> {
    let snapshot = parse_snapshot(snapshot)?;
    let signal = PhaseDetector::default().detect(&snapshot);

    println!("{}", serde_json::to_string_pretty(&signal)?);
    Ok(())
}

fn run_plan<R: PlanRepository, G: RandomSource>(
    engine: PositionBuilder<R, G>,
    symbol: &str,
    target: Decimal,
    current: Decimal,
    snapshot: &MarketSnapshot,
    stealth: bool,
) -> Result<()> {
    let signal = PhaseDetector::default().detect(snapshot);

    let Some(plan) = engine.build_plan(symbol, target, current, &signal)? else {
        warn!(
            %symbol,
            phase = %signal.phase(),
            %target,
            %current,
            "No acquisition plan built"
        );
        return Ok(());
    };

    println!("{}", serde_json::to_string_pretty(&plan)?);

    while let Some(batch) = engine.next_batch(symbol, stealth)? {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        engine.mark_executed(symbol, &batch)?;
    }

    // One more call flips an exhausted plan to completed.
    engine.next_batch(symbol, stealth)?;

    if let Some(plan) = engine.get_plan(symbol)? {
        info!(
            %symbol,
            status = ?plan.status,
            current_size = %plan.current_size,
            progress = %plan.progress(),
            "Plan walk finished"
        );
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }

    Ok(())
}

async fn run_protect(
    config: &Config,
    symbol: &str,
    position: Decimal,
    snapshot: &str,
) -> Result<()> {
    let snapshot = parse_snapshot(snapshot)?;

    let (coordinator, mut requests) =
        ChannelCoordinator::new(config.protection.coordinator_channel_capacity);
    let alerts = Arc::new(AlertLog::new(config.protection.alert_log_capacity));
    let protector = PositionProtector::new(PhaseDetector::default(), Arc::clone(&alerts))
        .with_coordinator(Arc::new(coordinator));

    let outcome = protector.protect(symbol, position, &snapshot);
    println!("{}", serde_json::to_string_pretty(&outcome.decision)?);
    if let Some(exit_plan) = &outcome.exit_plan {
        println!("{}", serde_json::to_string_pretty(exit_plan)?);
    }

    // Dropping the protector closes the channel so the drain below ends.
    drop(protector);
    while let Some(request) = requests.recv().await {
        info!(
            symbol = %request.symbol,
            urgency = request.urgency.as_str(),
            reduce_ratio = %request.reduce_ratio,
            "Exit mode requested"
        );
    }

    info!(alerts = alerts.len(), "Protection check finished");
    Ok(())
}
