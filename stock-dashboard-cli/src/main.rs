use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod config;
mod context;
mod output;

use cli::{Cli, Commands};
use context::Context;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "stock_dashboard=debug,stock_dashboard_sdk=debug,stock_dashboard_core=debug"
    } else {
        "warn"
    };

    // Logs go to stderr so structured output on stdout stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(&cli)?;
    tracing::debug!(config_dir = %ctx.config_dir.display(), "Context loaded");

    match cli.command {
        Commands::Auth(cmd) => commands::auth::execute(&ctx, cmd).await,
        Commands::Stocks(cmd) => commands::stocks::execute(&ctx, cmd).await,
        Commands::Tasks(cmd) => commands::tasks::execute(&ctx, cmd).await,
        Commands::Ma(cmd) => commands::ma::execute(&ctx, cmd).await,
        Commands::TradingDays(cmd) => commands::trading_days::execute(&ctx, cmd).await,
        Commands::Crawler(cmd) => commands::crawler::execute(&ctx, cmd).await,
        Commands::Menu(cmd) => commands::menu::execute(&ctx, cmd).await,
        Commands::Config(cmd) => commands::config::execute(&ctx, cmd).await,
    }
}
