//! Crawler service commands

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::Cell;
use serde::Serialize;
use stock_dashboard_sdk::{MetricFamilies, PerformanceComparison, ServiceTiming};

use crate::context::Context;
use crate::output::{
    finish, print_field, print_optional_field, print_section, split_list, OutputFormat,
    TableDisplay,
};

/// Crawler service commands
#[derive(Debug, Args)]
pub struct CrawlerCommands {
    #[command(subcommand)]
    pub command: CrawlerSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum CrawlerSubcommand {
    /// Health report of the crawler service
    Health,

    /// Exit with status 1 unless the crawler reports ok
    Online,

    /// Fetch one stock's daily data through the crawler
    Daily {
        symbol: String,

        /// Broker to fetch from
        #[arg(short, long)]
        broker: Option<String>,
    },

    /// Update several stocks through the crawler
    Batch {
        /// Comma-separated symbols
        symbols: String,
    },

    /// Price history through the crawler
    History {
        symbol: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },

    /// Crawler Prometheus metrics
    Metrics {
        /// Only metrics whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Time the crawler against the primary API for one stock
    Compare {
        symbol: String,
    },
}

/// Execute crawler commands
pub async fn execute(ctx: &Context, cmd: CrawlerCommands) -> Result<()> {
    let client = ctx.create_client()?;
    let crawler = client.crawler();

    match cmd.command {
        CrawlerSubcommand::Health => {
            let health = crawler.health().await?;
            ctx.output.write_value(&health)
        }
        CrawlerSubcommand::Online => {
            if crawler.is_service_online().await {
                ctx.output
                    .success(&format!("Crawler at {} is online", client.crawler_url()));
                Ok(())
            } else {
                anyhow::bail!("Crawler at {} is offline", client.crawler_url())
            }
        }
        CrawlerSubcommand::Daily { symbol, broker } => {
            let spinner = ctx.output.spinner(&format!("Fetching {}...", symbol));
            let fetch = crawler.fetch_stock_daily(&symbol, broker.as_deref()).await;
            finish(spinner);
            let fetch = fetch?;

            ctx.output.info(&format!(
                "{} record(s) in {} ms",
                fetch.record_count,
                fetch.duration.as_millis()
            ));
            ctx.output.write_value(&fetch.data)
        }
        CrawlerSubcommand::Batch { symbols } => {
            let symbols = split_list(&symbols);
            if symbols.is_empty() {
                anyhow::bail!("No symbols given");
            }

            let spinner = ctx
                .output
                .spinner(&format!("Updating {} stock(s)...", symbols.len()));
            let update = crawler.batch_update_stocks(&symbols).await;
            finish(spinner);
            let update = update?;

            ctx.output.success(&format!(
                "Updated {} symbol(s) in {} ms",
                update.total_symbols,
                update.duration.as_millis()
            ));
            ctx.output.write_value(&update.data)
        }
        CrawlerSubcommand::History { symbol, start, end } => {
            let history = crawler
                .fetch_stock_history(&symbol, start.as_deref(), end.as_deref())
                .await?;
            ctx.output.write_value(&history)
        }
        CrawlerSubcommand::Metrics { filter } => {
            let families = crawler.prometheus_metrics().await?;
            let rows = metric_rows(&families, filter.as_deref());
            ctx.output.write_list(&rows, &["Metric", "Labels", "Value"])
        }
        CrawlerSubcommand::Compare { symbol } => {
            let spinner = ctx.output.spinner("Timing both services...");
            let comparison = crawler.compare_performance(&symbol, client.stocks()).await;
            finish(spinner);
            write_comparison(ctx, &comparison?)
        }
    }
}

#[derive(Debug, Serialize)]
struct MetricRow {
    name: String,
    labels: String,
    value: String,
}

fn metric_rows(families: &MetricFamilies, filter: Option<&str>) -> Vec<MetricRow> {
    families
        .iter()
        .filter(|(name, _)| filter.map_or(true, |f| name.contains(f)))
        .flat_map(|(name, samples)| {
            samples.iter().map(move |sample| MetricRow {
                name: name.clone(),
                labels: sample.labels.clone(),
                value: sample.value.to_string(),
            })
        })
        .collect()
}

impl TableDisplay for MetricRow {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.name),
            Cell::new(&self.labels),
            Cell::new(&self.value),
        ]
    }

    fn display_single(&self) {
        print_field(&self.name, &self.value);
    }

    fn display_compact(&self) {
        if self.labels.is_empty() {
            println!("{} {}", self.name, self.value);
        } else {
            println!("{}{{{}}} {}", self.name, self.labels, self.value);
        }
    }
}

fn print_timing(title: &str, timing: &ServiceTiming) {
    print_section(title);
    let outcome = if timing.success {
        "ok".green().to_string()
    } else {
        "failed".red().to_string()
    };
    print_field("Result", &outcome);
    print_field("Duration", &format!("{} ms", timing.duration_ms));
    print_field("Records", &timing.record_count.to_string());
    print_optional_field("Error", timing.error.as_deref());
}

fn write_comparison(ctx: &Context, comparison: &PerformanceComparison) -> Result<()> {
    if ctx.output.format() != OutputFormat::Table {
        return ctx.output.write_value(&serde_json::to_value(comparison)?);
    }

    print_timing("Crawler", &comparison.crawler);
    print_timing("Primary API", &comparison.api);
    println!();
    match comparison.speedup {
        Some(ratio) => ctx
            .output
            .info(&format!("Crawler was {:.2}x the speed of the API", ratio)),
        None => ctx
            .output
            .warning("No speed ratio, one of the services failed"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stock_dashboard_sdk::parse_prometheus;

    #[test]
    fn test_metric_rows_filter() {
        let families = parse_prometheus(
            "crawler_requests_total{broker=\"fubon\"} 12\nprocess_cpu_seconds_total 3.5\n",
        );

        let all = metric_rows(&families, None);
        assert_eq!(all.len(), 2);

        let filtered = metric_rows(&families, Some("crawler"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].labels, "broker=\"fubon\"");
        assert_eq!(filtered[0].value, "12");
    }
}
