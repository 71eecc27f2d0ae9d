use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use mrfcheck::config::Settings;

mod commands;

use commands::{RunArgs, run_command, update_command, versions_command};

#[derive(Parser)]
#[command(
    name = "mrfcheck",
    about = "Validates price-transparency machine-readable files against the published schemas",
    version,
    author,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    settings: Settings,

    /// Enable verbose output (use -vv for debug output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a local file and the files it references
    Validate {
        /// Path to the file to validate
        data_file: String,

        #[command(flatten)]
        args: RunArgs,
    },

    /// Download a file, then validate it and the files it references
    FromUrl {
        url: String,

        #[command(flatten)]
        args: RunArgs,
    },

    /// Fetch newly published schema versions
    Update,

    /// List the schema versions known to the repository, oldest first
    Versions,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(commands::EXIT_ABORTED)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Validate { data_file, args } => run_command(&data_file, args, &cli.settings).await,
        Commands::FromUrl { url, args } => run_command(&url, args, &cli.settings).await,
        Commands::Update => {
            update_command(&cli.settings).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Versions => {
            versions_command(&cli.settings).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::new("mrfcheck=warn"),
        1 => EnvFilter::new("mrfcheck=info"),
        _ => EnvFilter::new("mrfcheck=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
