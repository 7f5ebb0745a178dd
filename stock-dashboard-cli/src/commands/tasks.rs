//! Manual task commands

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::Cell;
use stock_dashboard_core::{TaskHistoryEntry, TaskId, TaskRecord, TaskSnapshot};
use stock_dashboard_sdk::{OptimizedCrawlOptions, SequentialCrawlOptions};

use crate::context::Context;
use crate::output::{
    finish, print_field, print_list_field, print_optional_field, print_section, split_list,
    status_badge, OutputFormat, TableDisplay,
};

/// Manual crawl task commands
#[derive(Debug, Args)]
pub struct TasksCommands {
    #[command(subcommand)]
    pub command: TasksSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum TasksSubcommand {
    /// Running tasks and recent history
    List,

    /// Full record of one task
    Details {
        /// Task ID
        id: i64,
    },

    /// Cancel a running task
    Cancel {
        /// Task ID
        id: i64,
    },

    /// Remove finished tasks from the history
    Clear,

    /// Start a stock crawl task
    Crawl {
        /// Comma-separated symbols; every stock when omitted
        #[arg(short, long)]
        symbols: Option<String>,

        /// Parallel crawl with skip and batching optimisations
        #[arg(long, conflicts_with = "sequential")]
        optimized: bool,

        /// One stock at a time, pausing under load
        #[arg(long)]
        sequential: bool,

        /// Worker count for --optimized
        #[arg(long)]
        max_workers: Option<u32>,

        /// Batch size for --optimized or --sequential
        #[arg(long)]
        batch_size: Option<u32>,
    },

    /// Follow running tasks until they finish (Ctrl-C to stop)
    Watch,
}

/// Execute task commands
pub async fn execute(ctx: &Context, cmd: TasksCommands) -> Result<()> {
    match cmd.command {
        TasksSubcommand::List => list(ctx).await,
        TasksSubcommand::Details { id } => details(ctx, TaskId(id)).await,
        TasksSubcommand::Cancel { id } => cancel(ctx, TaskId(id)).await,
        TasksSubcommand::Clear => clear(ctx).await,
        TasksSubcommand::Crawl {
            symbols,
            optimized,
            sequential,
            max_workers,
            batch_size,
        } => {
            let symbols = symbols.map(|s| split_list(&s));
            let mode = if optimized {
                CrawlMode::Optimized
            } else if sequential {
                CrawlMode::Sequential
            } else {
                CrawlMode::Standard
            };
            crawl(ctx, mode, symbols, max_workers, batch_size).await
        }
        TasksSubcommand::Watch => watch(ctx).await,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrawlMode {
    Standard,
    Optimized,
    Sequential,
}

impl TableDisplay for TaskRecord {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.id),
            Cell::new(&self.name),
            Cell::new(status_badge(&self.status.to_string())),
            Cell::new(format!(
                "{}/{} ({:.0}%)",
                self.progress.current, self.progress.total, self.progress.percent
            )),
            Cell::new(&self.start_time),
            Cell::new(&self.execution_time),
            Cell::new(&self.estimated_remaining),
        ]
    }

    fn display_single(&self) {
        print_section(&format!("Task {}", self.id));
        print_field("Name", &self.name);
        print_field("Description", &self.description);
        print_field("Status", &status_badge(&self.status.to_string()));
        print_field("Step", &self.current_step);
        print_field(
            "Progress",
            &format!(
                "{}/{} ({:.1}%)",
                self.progress.current, self.progress.total, self.progress.percent
            ),
        );
        print_field("Started", &self.start_time);
        print_field("Elapsed", &self.execution_time);
        print_field("Remaining", &self.estimated_remaining);
        print_list_field("Recent items", &self.recent_items);
    }

    fn display_compact(&self) {
        println!(
            "{}\t{}\t{}\t{:.0}%",
            self.id, self.name, self.status, self.progress.percent
        );
    }
}

impl TableDisplay for TaskHistoryEntry {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.id),
            Cell::new(&self.name),
            Cell::new(&self.task_type),
            Cell::new(status_badge(&self.status.to_string())),
            Cell::new(&self.start_time),
            Cell::new(&self.execution_time),
            Cell::new(format!(
                "{}/{}/{}",
                self.processed_count, self.success_count, self.failure_count
            )),
        ]
    }

    fn display_single(&self) {
        print_section(&format!("Task {}", self.id));
        print_field("Name", &self.name);
        print_field("Type", &self.task_type);
        print_field("Status", &status_badge(&self.status.to_string()));
        print_field("Started", &self.start_time);
        print_field("Duration", &self.execution_time);
        print_field("Processed", &self.processed_count.to_string());
        print_field("Succeeded", &self.success_count.to_string());
        print_field("Failed", &self.failure_count.to_string());
        print_optional_field("Error", self.error_message.as_deref());
    }

    fn display_compact(&self) {
        println!(
            "{}\t{}\t{}\t{}",
            self.id, self.name, self.status, self.execution_time
        );
    }
}

const RUNNING_HEADERS: &[&str] = &[
    "ID", "Name", "Status", "Progress", "Started", "Elapsed", "Remaining",
];
const HISTORY_HEADERS: &[&str] = &[
    "ID", "Name", "Type", "Status", "Started", "Duration", "Done/OK/Failed",
];

fn write_snapshot(ctx: &Context, snapshot: &TaskSnapshot) -> Result<()> {
    if ctx.output.format() != OutputFormat::Table {
        return ctx.output.write_value(&serde_json::to_value(snapshot)?);
    }

    print_section("Running");
    ctx.output.write_list(&snapshot.running_tasks, RUNNING_HEADERS)?;
    print_section("Recent");
    ctx.output.write_list(&snapshot.task_history, HISTORY_HEADERS)
}

async fn list(ctx: &Context) -> Result<()> {
    let client = ctx.create_client()?;

    let spinner = ctx.output.spinner("Fetching tasks...");
    let result = client.tasks().get_manual_tasks().await;
    finish(spinner);

    write_snapshot(ctx, &result?)
}

async fn details(ctx: &Context, id: TaskId) -> Result<()> {
    let client = ctx.create_client()?;
    let task = client.tasks().get_task_details(id).await?;
    ctx.output.write_value(&serde_json::to_value(&task)?)
}

async fn cancel(ctx: &Context, id: TaskId) -> Result<()> {
    let client = ctx.create_client()?;
    client.tasks().cancel_task(id).await?;
    ctx.output.success(&format!("Cancelled task {}", id));
    Ok(())
}

async fn clear(ctx: &Context) -> Result<()> {
    let client = ctx.create_client()?;
    let result = client.tasks().clear_completed_tasks().await?;
    ctx.output.success("Cleared completed tasks");
    ctx.output.write_value(&result)
}

async fn crawl(
    ctx: &Context,
    mode: CrawlMode,
    symbols: Option<Vec<String>>,
    max_workers: Option<u32>,
    batch_size: Option<u32>,
) -> Result<()> {
    let client = ctx.create_client()?;
    let tasks = client.tasks();

    let result = match mode {
        CrawlMode::Standard => tasks.create_stock_crawl_task(symbols.as_deref()).await?,
        CrawlMode::Optimized => {
            let mut options = OptimizedCrawlOptions {
                symbols,
                ..Default::default()
            };
            if let Some(workers) = max_workers {
                options.max_workers = workers;
            }
            if let Some(size) = batch_size {
                options.batch_size = size;
            }
            tasks.create_optimized_stock_crawl_task(&options).await?
        }
        CrawlMode::Sequential => {
            let mut options = SequentialCrawlOptions {
                symbols,
                ..Default::default()
            };
            if let Some(size) = batch_size {
                options.batch_size = size;
            }
            tasks.create_sequential_stock_crawl_task(&options).await?
        }
    };

    ctx.output.success("Crawl task started");
    ctx.output.write_value(&result)?;

    let running = tasks.running_tasks().await;
    if !running.is_empty() && ctx.output.format() == OutputFormat::Table {
        print_section("Running");
        ctx.output.write_list(&running, RUNNING_HEADERS)?;
    }
    Ok(())
}

async fn watch(ctx: &Context) -> Result<()> {
    let client = ctx.create_client()?;
    let tasks = client.tasks();

    let snapshot = tasks.get_manual_tasks().await?;
    if snapshot.running_tasks.is_empty() {
        ctx.output.info("No running tasks");
        return Ok(());
    }
    write_snapshot(ctx, &snapshot)?;
    ctx.output.info(&format!(
        "Watching {} task(s), checking every {}s. Press Ctrl-C to stop.",
        snapshot.running_tasks.len(),
        ctx.config.settings.poll_interval_secs
    ));

    let handle = tasks.start_task_polling(|completed| {
        for id in completed {
            println!("{} Task {} finished", "✓".green(), id);
        }
    });

    let token = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    handle.wait().await;
    interrupt.abort();

    write_snapshot(ctx, &tasks.snapshot().await)
}
