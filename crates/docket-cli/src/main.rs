//! CLI application for shipping document compliance checks.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, extract, sync, validate};

/// Shipping document compliance - extract, validate and sync shipment data
#[derive(Parser)]
#[command(name = "docket")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from a single document text file
    Extract(extract::ExtractArgs),

    /// Extract fields from many document files
    Batch(batch::BatchArgs),

    /// Validate a shipment and its documents
    Validate(validate::ValidateArgs),

    /// Preview or apply a document-to-shipment sync
    Sync(sync::SyncArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Validate(args) => validate::run(args, config_path).await,
        Commands::Sync(args) => sync::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
