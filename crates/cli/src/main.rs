//! NetVerify CLI - Main Entry Point

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use netverify_cli::commands::{catalog, run, tests};
use netverify_cli::config::Config;
use netverify_cli::output;

/// NetVerify - declarative test catalogs for network devices
#[derive(Parser)]
#[command(name = "netverify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, env = "NETVERIFY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a test catalog
    Check(catalog::CheckArgs),

    /// List the definitions of a test catalog
    List(catalog::ListArgs),

    /// List registered tests
    Tests,

    /// Run a test catalog against an inventory
    Run(run::RunArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(netverify_common::default_config_path);
    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Check(args) => catalog::execute_check(args, &config, cli.format)?,
        Commands::List(args) => catalog::execute_list(args, &config, cli.format)?,
        Commands::Tests => tests::execute(cli.format)?,
        Commands::Run(args) => {
            let passed = run::execute(args, &config, cli.format).await?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("NetVerify CLI v{}", netverify_common::VERSION);
        }
    }

    Ok(())
}
