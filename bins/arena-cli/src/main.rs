mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arena-cli")]
#[command(about = "Arena CLI - Run two code snippets side by side on a remote execution service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute two source files concurrently and compare the results
    Run {
        /// Source file for slot 1
        #[arg(long)]
        first: PathBuf,

        /// Language of slot 1 (defaults to the file extension)
        #[arg(long)]
        first_lang: Option<String>,

        /// Source file for slot 2
        #[arg(long)]
        second: PathBuf,

        /// Language of slot 2 (defaults to the file extension)
        #[arg(long)]
        second_lang: Option<String>,

        /// Execution service base URL (overrides ARENA_SERVICE_URL)
        #[arg(short, long)]
        url: Option<String>,

        /// Transport timeout per request, in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Print the final report as JSON
        #[arg(long, default_value = "false")]
        json: bool,

        /// Exit with an error if either slot failed
        #[arg(long, default_value = "false")]
        fail_on_error: bool,
    },

    /// List supported languages
    Languages,
}

fn init_tracing() {
    // Quiet by default so logs don't interleave with results
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            first,
            first_lang,
            second,
            second_lang,
            url,
            timeout,
            json,
            fail_on_error,
        } => {
            commands::run_comparison(commands::RunOptions {
                first: &first,
                first_lang: first_lang.as_deref(),
                second: &second,
                second_lang: second_lang.as_deref(),
                url: url.as_deref(),
                timeout_secs: timeout,
                json,
                fail_on_error,
            })
            .await?;
        }
        Commands::Languages => {
            commands::list_languages();
        }
    }

    Ok(())
}
