//! Command-line argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{
    auth::AuthCommands, config::ConfigCommands, crawler::CrawlerCommands, ma::MaCommands,
    menu::MenuCommands, stocks::StocksCommands, tasks::TasksCommands,
    trading_days::TradingDaysCommands,
};
use crate::output::OutputFormat;

/// Stock Dashboard command-line client
#[derive(Debug, Parser)]
#[command(name = "stock-dashboard", version, about, long_about = None)]
pub struct Cli {
    /// Configuration profile to use
    #[arg(short, long, global = true, env = "STOCK_DASHBOARD_PROFILE")]
    pub profile: Option<String>,

    /// Primary API base URL, including /api/v1. Takes precedence over the
    /// profile and over STOCK_DASHBOARD_ENV.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Crawler service base URL
    #[arg(long, global = true, env = "STOCK_DASHBOARD_CRAWLER_URL")]
    pub crawler_url: Option<String>,

    /// Directory holding config.toml and the saved session
    #[arg(long, global = true, env = "STOCK_DASHBOARD_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose logging, including request and response bodies
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in, register and manage users
    Auth(AuthCommands),

    /// Stock list, history and updates
    Stocks(StocksCommands),

    /// Manual crawl tasks
    Tasks(TasksCommands),

    /// Moving average calculations
    Ma(MaCommands),

    /// Missing trading day analysis and repair
    TradingDays(TradingDaysCommands),

    /// Crawler service
    Crawler(CrawlerCommands),

    /// Sidebar menu and layout settings
    Menu(MenuCommands),

    /// CLI configuration and profiles
    Config(ConfigCommands),
}
