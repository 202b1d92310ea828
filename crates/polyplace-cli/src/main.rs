use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{OutputFormat, WorkloadArgs};

#[derive(Parser)]
#[command(
    name = "polyplace",
    about = "polyplace — place workloads across heterogeneous compute providers",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to the polyplace config file
    #[arg(short, long, global = true, default_value = "polyplace.toml")]
    config: PathBuf,

    /// Output format: text or json
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered providers with health and status
    Providers,
    /// Rank every provider for a workload without placing it
    Recommend {
        #[command(flatten)]
        workload: WorkloadArgs,
    },
    /// Place a workload on the best provider.
    ///
    /// Prints the chosen provider, region, and machine type, plus up to
    /// `max_alternatives` runner-up placements.
    Schedule {
        /// Workload identifier
        #[arg(long)]
        id: String,
        #[command(flatten)]
        workload: WorkloadArgs,
    },
    /// Write a scaffold polyplace.toml
    Init {
        /// Directory to write into (default: current directory)
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,polyplace=debug"));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Providers => commands::providers::list(&cli.config, cli.format).await,
        Commands::Recommend { workload } => {
            commands::recommend::recommend(&cli.config, &workload, cli.format).await
        }
        Commands::Schedule { id, workload } => {
            commands::schedule::schedule(&cli.config, &id, &workload, cli.format).await
        }
        Commands::Init { path, force } => commands::init::init(&path, force),
    }
}
