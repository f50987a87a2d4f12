//! Vigil CLI - vigil command

use anyhow::Result;
use clap::{Parser, Subcommand};

use vigil_cli::{cmd, util};

/// Vigil - File activity monitoring with risk scoring
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Vigil monitoring in the current directory
    Init,
    /// Start the daemon
    Start {
        /// Run in foreground (for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop,
    /// Show daemon and activity status
    Status,
    /// List recorded events
    Events {
        /// Number of events to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Only this event type (create, modify, delete, create_dir, delete_dir, other)
        #[arg(long)]
        event_type: Option<String>,
        /// Only this risk band (low, medium, high)
        #[arg(long)]
        risk: Option<String>,
        /// Substring match on file name or path
        #[arg(long)]
        search: Option<String>,
        /// Only events from the last N hours
        #[arg(long)]
        hours: Option<i64>,
        /// Skip this many matching events
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    /// Show one event in full
    Event {
        /// Event ID
        id: u64,
    },
    /// List risk alerts
    Alerts {
        /// Only alerts not yet resolved
        #[arg(long)]
        unresolved: bool,
        /// Number of alerts to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Mark an alert as handled
    Resolve {
        /// Alert ID
        id: u64,
    },
    /// Run an anomaly detection pass now
    Anomalies,
    /// Show the current behavioral baseline
    Baseline,
    /// Aggregate statistics for recorded activity
    Stats,
    /// Hourly activity timeline
    Timeline {
        /// Window size in hours
        #[arg(long, default_value = "24")]
        hours: i64,
    },
    /// Manage monitor configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Get a single value
    Get {
        /// Key such as alerts.threshold
        key: String,
    },
    /// Set a single value
    Set {
        /// Key such as alerts.threshold
        key: String,
        /// New value
        value: String,
    },
    /// Show the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The foreground daemon writes structured logs into .vigil/logs;
    // everything else logs to stderr
    let _guard = init_tracing(&cli.command);

    match cli.command {
        Commands::Init => cmd::init::run().await,
        Commands::Start { foreground } => cmd::start::run(foreground).await,
        Commands::Stop => cmd::stop::run().await,
        Commands::Status => cmd::status::run().await,
        Commands::Events {
            limit,
            event_type,
            risk,
            search,
            hours,
            offset,
        } => cmd::events::run(limit, event_type, risk, search, hours, offset).await,
        Commands::Event { id } => cmd::events::run_show(id).await,
        Commands::Alerts { unresolved, limit } => cmd::alerts::run(unresolved, limit).await,
        Commands::Resolve { id } => cmd::alerts::run_resolve(id).await,
        Commands::Anomalies => cmd::anomalies::run().await,
        Commands::Baseline => cmd::baseline::run().await,
        Commands::Stats => cmd::stats::run().await,
        Commands::Timeline { hours } => cmd::timeline::run(hours).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path => cmd::config::run_path().await,
        },
    }
}

fn init_tracing(command: &Commands) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    if matches!(command, Commands::Start { foreground: true }) {
        if let Ok(data_dir) = util::find_data_dir() {
            let log_dir = data_dir.join("logs");
            if std::fs::create_dir_all(&log_dir).is_ok() {
                let appender = tracing_appender::rolling::never(log_dir, "daemon.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                tracing_subscriber::fmt()
                    .with_writer(writer)
                    .with_ansi(false)
                    .init();
                return Some(guard);
            }
        }
    }

    tracing_subscriber::fmt::init();
    None
}
