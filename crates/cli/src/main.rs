use clap::{Parser, Subcommand};

mod commands;

use commands::HedgeArgs;

#[derive(Parser)]
#[command(name = "algo-trade")]
#[command(about = "Pair-cost hedging agent for Polymarket binary markets", long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one hedged trading session on a binary UP/DOWN market
    Hedge(HedgeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Hedge(args) => {
            commands::hedge::run(args).await?;
        }
    }

    Ok(())
}
