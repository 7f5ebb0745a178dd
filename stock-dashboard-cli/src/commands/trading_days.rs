//! Missing trading day commands

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::Cell;
use indicatif::ProgressBar;
use serde_json::Value;
use std::time::Duration;
use stock_dashboard_sdk::{
    BatchProgress, BatchUpdateSummary, DateUpdateResult, SmartApiCall, DEFAULT_BATCH_DELAY,
    DEFAULT_DAYS_BACK, SMART_BATCH_DELAY,
};

use crate::context::Context;
use crate::output::{
    finish, print_field, print_optional_field, print_section, split_list, OutputFormat,
    TableDisplay,
};

/// Missing trading day analysis and repair commands
#[derive(Debug, Args)]
pub struct TradingDaysCommands {
    #[command(subcommand)]
    pub command: TradingDaysSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum TradingDaysSubcommand {
    /// Summary of trading days missing from stored data
    Missing {
        /// How many days back to check
        #[arg(short, long, default_value_t = DEFAULT_DAYS_BACK)]
        days: u32,
    },

    /// Server-side analysis of gaps
    Smart,

    /// Data completeness of one stock, or of all stocks
    Completeness {
        #[arg(short, long)]
        code: Option<String>,

        #[arg(short, long, default_value_t = DEFAULT_DAYS_BACK)]
        days: u32,
    },

    /// Suggested fixes for missing dates
    Suggestions {
        /// Comma-separated dates, YYYY-MM-DD
        dates: String,
    },

    /// Fetch and store exchange data for missing dates
    UpdateDate {
        /// Comma-separated dates, YYYY-MM-DD
        dates: String,

        /// Fetch without saving (single date only)
        #[arg(long)]
        no_save: bool,

        /// Pause between dates in milliseconds
        #[arg(long, default_value_t = DEFAULT_BATCH_DELAY.as_millis() as u64)]
        delay_ms: u64,
    },

    /// Trading day service information
    Info,

    /// Plan the exchange calls needed to fill gaps, and optionally run them
    SmartBatch {
        #[arg(short, long, default_value_t = DEFAULT_DAYS_BACK)]
        days: u32,

        /// Plan calls even when nothing is missing
        #[arg(long)]
        force_refresh: bool,

        /// Run the planned calls
        #[arg(long)]
        execute: bool,

        /// Pause between calls in milliseconds
        #[arg(long, default_value_t = SMART_BATCH_DELAY.as_millis() as u64)]
        delay_ms: u64,
    },
}

/// Execute trading day commands
pub async fn execute(ctx: &Context, cmd: TradingDaysCommands) -> Result<()> {
    let client = ctx.create_client()?;
    let trading_days = client.trading_days();

    match cmd.command {
        TradingDaysSubcommand::Missing { days } => {
            let spinner = ctx.output.spinner("Analysing trading days...");
            let result = trading_days.missing_summary(days).await;
            finish(spinner);
            ctx.output.write_value(&result?)
        }
        TradingDaysSubcommand::Smart => {
            let spinner = ctx.output.spinner("Analysing trading days...");
            let result = trading_days.smart_analysis().await;
            finish(spinner);
            ctx.output.write_value(&result?)
        }
        TradingDaysSubcommand::Completeness { code, days } => {
            let result = trading_days.stock_completeness(code.as_deref(), days).await?;
            ctx.output.write_value(&result)
        }
        TradingDaysSubcommand::Suggestions { dates } => {
            let result = trading_days.fix_suggestions(&split_list(&dates)).await?;
            ctx.output.write_value(&result)
        }
        TradingDaysSubcommand::UpdateDate {
            dates,
            no_save,
            delay_ms,
        } => {
            let dates = split_list(&dates);
            match dates.as_slice() {
                [] => anyhow::bail!("No dates given"),
                [date] => {
                    let result = trading_days.update_missing_date(date, !no_save).await?;
                    ctx.output.success(&format!("Updated {}", date));
                    ctx.output.write_value(&result)
                }
                _ => {
                    if no_save {
                        anyhow::bail!("--no-save applies to a single date only");
                    }
                    let pb = ctx.output.progress_bar(dates.len() as u64, "Updating dates");
                    let summary = trading_days
                        .batch_update_missing_dates(
                            &dates,
                            Duration::from_millis(delay_ms),
                            progress_reporter(pb.as_ref()),
                        )
                        .await;
                    finish(pb);
                    write_summary(ctx, &summary?)
                }
            }
        }
        TradingDaysSubcommand::Info => {
            let result = trading_days.service_info().await?;
            ctx.output.write_value(&result)
        }
        TradingDaysSubcommand::SmartBatch {
            days,
            force_refresh,
            execute,
            delay_ms,
        } => {
            let spinner = ctx.output.spinner("Planning exchange calls...");
            let analysis = trading_days
                .smart_batch_update_analysis(days, force_refresh)
                .await;
            finish(spinner);
            let analysis = analysis?;

            if !execute {
                return ctx.output.write_value(&analysis);
            }

            let calls = planned_calls(&analysis)?;
            if calls.is_empty() {
                ctx.output.info("Nothing to update");
                return Ok(());
            }

            let pb = ctx.output.progress_bar(calls.len() as u64, "Running calls");
            let summary = trading_days
                .execute_smart_batch_update(
                    &calls,
                    Duration::from_millis(delay_ms),
                    progress_reporter(pb.as_ref()),
                )
                .await;
            finish(pb);
            write_summary(ctx, &summary?)
        }
    }
}

/// Reads the `api_calls` list out of a smart batch analysis.
fn planned_calls(analysis: &Value) -> Result<Vec<SmartApiCall>> {
    match analysis.get("api_calls") {
        Some(calls) => serde_json::from_value(calls.clone())
            .context("Unexpected api_calls format in analysis"),
        None => Ok(Vec::new()),
    }
}

fn progress_reporter(pb: Option<&ProgressBar>) -> impl FnMut(&BatchProgress) + '_ {
    move |progress: &BatchProgress| match pb {
        Some(pb) => {
            pb.set_position(progress.current.saturating_sub(1) as u64);
            pb.set_message(
                progress
                    .current_action
                    .clone()
                    .unwrap_or_else(|| progress.date.clone()),
            );
        }
        None => tracing::info!(
            current = progress.current,
            total = progress.total,
            percentage = progress.percentage,
            date = %progress.date,
            "Batch progress"
        ),
    }
}

fn write_summary(ctx: &Context, summary: &BatchUpdateSummary) -> Result<()> {
    if ctx.output.format() != OutputFormat::Table {
        return ctx.output.write_value(&serde_json::to_value(summary)?);
    }

    ctx.output
        .write_list(&summary.results, &["Date", "Result", "Error"])?;
    let line = format!(
        "{} succeeded, {} failed of {}",
        summary.successful, summary.failed, summary.total
    );
    if summary.failed == 0 {
        ctx.output.success(&line);
    } else {
        ctx.output.warning(&line);
    }
    Ok(())
}

impl TableDisplay for DateUpdateResult {
    fn to_row(&self) -> Vec<Cell> {
        let outcome = if self.success {
            "ok".green().to_string()
        } else {
            "failed".red().to_string()
        };
        vec![
            Cell::new(&self.date),
            Cell::new(outcome),
            Cell::new(self.error.as_deref().unwrap_or("")),
        ]
    }

    fn display_single(&self) {
        print_section(&self.date);
        print_field("Success", &self.success.to_string());
        print_optional_field("Error", self.error.as_deref());
    }

    fn display_compact(&self) {
        println!(
            "{}\t{}\t{}",
            self.date,
            if self.success { "ok" } else { "failed" },
            self.error.as_deref().unwrap_or("")
        );
    }
}
