//! flora: harvest botanical species records and load them into PostgreSQL.
//!
//! `fetch` maps provider records into a JSON interchange file; `load`
//! inserts a file's records into the `species` table without duplicating
//! rows already present.

mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use flora_core::Provider;

#[derive(Parser)]
#[command(name = "flora")]
#[command(author, version, about = "Botanical species ingester")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the species table
    Migrate,

    /// Fetch and map species from a provider into an interchange file
    Fetch {
        /// Provider to query (trefle, permapeople)
        #[arg(short, long)]
        provider: Provider,

        /// Output file (default: <provider>_data.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Scientific names to look up (default: built-in list)
        keys: Vec<String>,
    },

    /// Insert the records of an interchange file, skipping known ids
    Load {
        /// Interchange file written by `fetch`
        file: PathBuf,
    },

    /// Read back stored species by scientific name
    Probe {
        /// Scientific names to look up (default: built-in list)
        names: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = logging::LogSettings::from_env();
    let _log_guard = logging::init(&settings);
    info!(
        log_format = if settings.json { "json" } else { "text" },
        log_file = settings.file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(subsystem = "cli", error = %e, "Run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Migrate => commands::cmd_migrate().await,
        Commands::Fetch {
            provider,
            output,
            keys,
        } => commands::cmd_fetch(provider, output, keys).await,
        Commands::Load { file } => commands::cmd_load(&file).await,
        Commands::Probe { names } => commands::cmd_probe(names).await,
    }
}
