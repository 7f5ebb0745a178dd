//! Stock commands

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use stock_dashboard_sdk::{HistoryParams, StockListParams, StockWithData};

use crate::context::Context;
use crate::output::{finish, print_field, print_section, split_list, TableDisplay};

/// Stock list, history and update commands
#[derive(Debug, Args)]
pub struct StocksCommands {
    #[command(subcommand)]
    pub command: StocksSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum StocksSubcommand {
    /// Number of stocks in the stock list
    Count,

    /// Sync the stock list from the exchange
    Sync,

    /// Crawl the stock list
    Crawl,

    /// Check that a stock symbol exists
    Validate {
        symbol: String,
    },

    /// List stocks
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(short, long)]
        limit: Option<u32>,

        /// Filter by code or name
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by market
        #[arg(short, long)]
        market: Option<String>,
    },

    /// Daily price history of one stock
    History {
        symbol: String,

        /// First date, YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,

        /// Last date, YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(short, long)]
        limit: Option<u32>,

        #[arg(long)]
        sort_by: Option<String>,

        /// asc or desc
        #[arg(long)]
        sort_order: Option<String>,
    },

    /// Statistics of one stock's stored history
    Stats {
        symbol: String,
    },

    /// Latest stored trade date of one stock
    LatestDate {
        symbol: String,
    },

    /// Statistics over all stored history
    Overview,

    /// Refresh daily data of one stock, or of every stock with --all
    Update {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        symbol: Option<String>,

        #[arg(long)]
        all: bool,
    },

    /// Every stock with stored history, all pages
    WithData {
        #[arg(long)]
        sort_by: Option<String>,

        /// asc or desc
        #[arg(long)]
        sort_order: Option<String>,
    },

    /// Refresh daily data of several stocks
    BatchDaily {
        /// Comma-separated symbols
        symbols: String,
    },
}

/// Execute stock commands
pub async fn execute(ctx: &Context, cmd: StocksCommands) -> Result<()> {
    let client = ctx.create_client()?;
    let stocks = client.stocks();

    let spinner = ctx.output.spinner("Contacting API...");
    let result = match cmd.command {
        StocksSubcommand::Count => stocks.get_stock_count().await,
        StocksSubcommand::Sync => stocks.sync_stock_list().await,
        StocksSubcommand::Crawl => stocks.crawl_stock_list().await,
        StocksSubcommand::Validate { symbol } => stocks.validate_symbol(&symbol).await,
        StocksSubcommand::List {
            page,
            limit,
            search,
            market,
        } => {
            let params = StockListParams {
                page,
                limit,
                search,
                market,
            };
            stocks.get_stock_list(&params).await
        }
        StocksSubcommand::History {
            symbol,
            start,
            end,
            page,
            limit,
            sort_by,
            sort_order,
        } => {
            let params = HistoryParams {
                start_date: start,
                end_date: end,
                page,
                limit,
                sort_by,
                sort_order,
            };
            stocks.get_stock_history(&symbol, &params).await
        }
        StocksSubcommand::Stats { symbol } => stocks.get_stock_stats(&symbol).await,
        StocksSubcommand::LatestDate { symbol } => stocks.get_latest_trade_date(&symbol).await,
        StocksSubcommand::Overview => stocks.get_overall_stats().await,
        StocksSubcommand::Update { symbol, all } => match symbol {
            Some(symbol) if !all => stocks.update_stock_data(&symbol).await,
            _ => stocks.update_all_stock_data().await,
        },
        StocksSubcommand::WithData {
            sort_by,
            sort_order,
        } => {
            let result = stocks
                .get_all_stocks_with_data(sort_by.as_deref(), sort_order.as_deref())
                .await;
            finish(spinner);
            let list = result?;
            return ctx.output.write_list(
                &list,
                &["Code", "Name", "Records", "From", "To", "Avg close", "Days"],
            );
        }
        StocksSubcommand::BatchDaily { symbols } => {
            let symbols = split_list(&symbols);
            if symbols.is_empty() {
                finish(spinner);
                anyhow::bail!("No symbols given");
            }
            stocks.batch_update_daily(&symbols).await
        }
    };
    finish(spinner);

    ctx.output.write_value(&result?)
}

impl TableDisplay for StockWithData {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.stock_code),
            Cell::new(self.stock_name.as_deref().unwrap_or("-")),
            Cell::new(self.record_count),
            Cell::new(self.earliest_date.as_deref().unwrap_or("-")),
            Cell::new(self.latest_date.as_deref().unwrap_or("-")),
            Cell::new(
                self.avg_close_price
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(
                self.data_period_days
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]
    }

    fn display_single(&self) {
        print_section(&self.stock_code);
        print_field("Name", self.stock_name.as_deref().unwrap_or("-"));
        print_field("Records", &self.record_count.to_string());
        print_field("From", self.earliest_date.as_deref().unwrap_or("-"));
        print_field("To", self.latest_date.as_deref().unwrap_or("-"));
    }

    fn display_compact(&self) {
        println!(
            "{}\t{}\t{}",
            self.stock_code,
            self.record_count,
            self.latest_date.as_deref().unwrap_or("-")
        );
    }
}
