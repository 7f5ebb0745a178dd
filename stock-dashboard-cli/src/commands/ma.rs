//! Moving average commands

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use stock_dashboard_sdk::{AsyncCalculation, MaQueryParams};

use crate::context::Context;
use crate::output::{finish, split_list};

/// Moving average calculation commands
#[derive(Debug, Args)]
pub struct MaCommands {
    #[command(subcommand)]
    pub command: MaSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum MaSubcommand {
    /// Coverage statistics of stored moving averages
    Statistics,

    /// Calculate moving averages and wait for the result
    Calculate {
        /// Comma-separated stock codes
        codes: String,

        /// Comma-separated periods, default 5,10,24,72,120,240
        #[arg(long)]
        periods: Option<String>,

        /// Recalculate values that already exist
        #[arg(short, long)]
        force: bool,
    },

    /// Stored moving averages of one stock
    Query {
        code: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        /// Comma-separated periods
        #[arg(long)]
        periods: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Check stored values for consistency
    Validate,

    /// Delete all stored moving averages
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Start a background calculation
    Start {
        /// Comma-separated stock codes; every stock when omitted
        #[arg(short, long)]
        codes: Option<String>,

        /// Comma-separated periods
        #[arg(long)]
        periods: Option<String>,

        /// Recalculate values that already exist
        #[arg(short, long)]
        force: bool,

        /// Stocks per batch
        #[arg(long)]
        batch_size: Option<u32>,
    },

    /// Status of a background calculation
    Status {
        task_id: String,
    },

    /// Cancel a background calculation
    Cancel {
        task_id: String,
    },
}

/// Execute moving average commands
pub async fn execute(ctx: &Context, cmd: MaCommands) -> Result<()> {
    if let MaSubcommand::Clear { force: false } = cmd.command {
        let confirm = dialoguer::Confirm::new()
            .with_prompt("Delete all stored moving averages?")
            .default(false)
            .interact()
            .context("Failed to get confirmation")?;

        if !confirm {
            ctx.output.info("Cancelled");
            return Ok(());
        }
    }

    let client = ctx.create_client()?;
    let ma = client.moving_averages();

    let spinner = ctx.output.spinner("Contacting API...");
    let result = match cmd.command {
        MaSubcommand::Statistics => ma.statistics().await,
        MaSubcommand::Calculate {
            codes,
            periods,
            force,
        } => {
            let periods = parse_periods(periods.as_deref())?;
            ma.calculate(&split_list(&codes), &periods, force).await
        }
        MaSubcommand::Query {
            code,
            start,
            end,
            periods,
            page,
            limit,
        } => {
            let params = MaQueryParams {
                start_date: start,
                end_date: end,
                periods,
                page,
                limit,
            };
            ma.query(&code, &params).await
        }
        MaSubcommand::Validate => ma.validate().await,
        MaSubcommand::Clear { .. } => ma.clear().await,
        MaSubcommand::Start {
            codes,
            periods,
            force,
            batch_size,
        } => {
            let mut request = AsyncCalculation {
                stock_codes: codes.map(|c| split_list(&c)),
                force_recalculate: force,
                ..Default::default()
            };
            let periods = parse_periods(periods.as_deref())?;
            if !periods.is_empty() {
                request.periods = periods;
            }
            if let Some(size) = batch_size {
                request.batch_size = size;
            }
            ma.start_async_calculation(&request).await
        }
        MaSubcommand::Status { task_id } => ma.task_status(&task_id).await,
        MaSubcommand::Cancel { task_id } => ma.cancel_task(&task_id).await,
    };
    finish(spinner);

    ctx.output.write_value(&result?)
}

/// Empty input yields an empty list, which the client treats as the defaults.
fn parse_periods(raw: Option<&str>) -> Result<Vec<u32>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    split_list(raw)
        .iter()
        .map(|p| {
            p.parse::<u32>()
                .with_context(|| format!("Invalid period: {}", p))
        })
        .collect()
}
