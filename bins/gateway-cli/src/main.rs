mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Judge Gateway CLI - Submit code to the judge and check its health", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one source file and wait for the result
    Submit {
        /// Source file to execute
        #[arg(short, long)]
        file: PathBuf,

        /// Judge language id (e.g., 71 for Python 3)
        #[arg(short, long)]
        language_id: u32,

        /// File whose contents are passed as stdin
        #[arg(short, long)]
        stdin: Option<PathBuf>,

        /// File holding the expected output
        #[arg(short, long)]
        expected: Option<PathBuf>,
    },

    /// Run several source files as one batch
    Batch {
        /// Source files to execute, in order
        #[arg(short, long, required = true, num_args = 1..)]
        file: Vec<PathBuf>,

        /// Judge language id shared by all files
        #[arg(short, long)]
        language_id: u32,
    },

    /// Check whether the judge is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            file,
            language_id,
            stdin,
            expected,
        } => {
            commands::submit(&file, language_id, stdin.as_deref(), expected.as_deref()).await?;
        }
        Commands::Batch { file, language_id } => {
            commands::batch(&file, language_id).await?;
        }
        Commands::Health => {
            commands::health().await?;
        }
    }

    Ok(())
}
