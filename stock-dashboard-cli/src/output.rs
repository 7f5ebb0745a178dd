//! Output formatting for CLI

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Compact format (single line per item)
    Compact,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// Output writer that handles different formats
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write a single item
    pub fn write<T: Serialize + TableDisplay>(&self, item: &T) -> Result<()> {
        match self.format {
            OutputFormat::Table => item.display_single(),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(item)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(item)?),
            OutputFormat::Compact => item.display_compact(),
        }
        Ok(())
    }

    /// Write a list of items
    pub fn write_list<T: Serialize + TableDisplay>(
        &self,
        items: &[T],
        headers: &[&str],
    ) -> Result<()> {
        match self.format {
            OutputFormat::Table => {
                if items.is_empty() {
                    println!("{}", "No items found.".dimmed());
                    return Ok(());
                }

                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.apply_modifier(UTF8_ROUND_CORNERS);

                let header_cells: Vec<Cell> = headers
                    .iter()
                    .map(|h| Cell::new(h).fg(Color::Cyan))
                    .collect();
                table.set_header(header_cells);

                for item in items {
                    table.add_row(item.to_row());
                }

                println!("{table}");
                println!(
                    "\n{} {} item(s)",
                    "Total:".bold(),
                    items.len().to_string().green()
                );
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(items)?),
            OutputFormat::Compact => {
                for item in items {
                    item.display_compact();
                }
            }
        }
        Ok(())
    }

    /// Write a raw API payload. Objects become a field listing in table mode.
    pub fn write_value(&self, value: &Value) -> Result<()> {
        match self.format {
            OutputFormat::Table => print_value(value, 1),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
            OutputFormat::Compact => println!("{}", serde_json::to_string(value)?),
        }
        Ok(())
    }

    /// Write a success message
    pub fn success(&self, message: &str) {
        if self.format == OutputFormat::Table {
            println!("{} {}", "✓".green(), message);
        } else {
            eprintln!("{}", message);
        }
    }

    /// Write a warning message
    pub fn warning(&self, message: &str) {
        if self.format == OutputFormat::Table {
            println!("{} {}", "⚠".yellow(), message);
        } else {
            eprintln!("Warning: {}", message);
        }
    }

    /// Write an info message
    pub fn info(&self, message: &str) {
        if self.format == OutputFormat::Table {
            println!("{} {}", "ℹ".blue(), message);
        } else {
            eprintln!("{}", message);
        }
    }

    /// Start a spinner for long operations
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if self.format != OutputFormat::Table {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    }

    /// Create a progress bar
    pub fn progress_bar(&self, total: u64, message: &str) -> Option<ProgressBar> {
        if self.format != OutputFormat::Table {
            return None;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
        pb.set_message(message.to_string());
        Some(pb)
    }
}

/// Stops a spinner started with [`OutputWriter::spinner`].
pub fn finish(spinner: Option<ProgressBar>) {
    if let Some(s) = spinner {
        s.finish_and_clear();
    }
}

/// Trait for displaying items in a table
pub trait TableDisplay {
    /// Convert item to a table row
    fn to_row(&self) -> Vec<Cell>;

    /// Display a single item in detail
    fn display_single(&self);

    /// Display in compact format
    fn display_compact(&self);
}

/// Print a key-value pair in detail format
pub fn print_field(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Print an optional key-value pair
pub fn print_optional_field(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        print_field(key, v);
    }
}

/// Print a list field
pub fn print_list_field(key: &str, values: &[String]) {
    if values.is_empty() {
        println!("  {}: {}", key.cyan(), "-".dimmed());
    } else {
        println!("  {}:", key.cyan());
        for v in values {
            println!("    - {}", v);
        }
    }
}

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", title.bold().underline());
}

fn print_value(value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) if map.is_empty() => println!("{}{}", indent, "{}".dimmed()),
        Value::Object(map) => {
            for (key, v) in map {
                if is_scalar(v) {
                    println!("{}{}: {}", indent, key.cyan(), scalar_text(v));
                } else {
                    println!("{}{}:", indent, key.cyan());
                    print_value(v, depth + 1);
                }
            }
        }
        Value::Array(items) if items.is_empty() => println!("{}{}", indent, "[]".dimmed()),
        Value::Array(items) => {
            for item in items {
                if is_scalar(item) {
                    println!("{}- {}", indent, scalar_text(item));
                } else {
                    println!("{}- {}", indent, compact_json(item));
                }
            }
        }
        scalar => println!("{}{}", indent, scalar_text(scalar)),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "-".dimmed().to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compact_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Format a timestamp for display
pub fn format_timestamp(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Format a relative time
pub fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let diff = now.signed_duration_since(*dt);

    if diff.num_seconds() < 60 {
        "just now".to_string()
    } else if diff.num_minutes() < 60 {
        format!("{} minute(s) ago", diff.num_minutes())
    } else if diff.num_hours() < 24 {
        format!("{} hour(s) ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{} day(s) ago", diff.num_days())
    } else {
        format_timestamp(dt)
    }
}

/// Status badge with color
pub fn status_badge(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "running" | "active" | "in_progress" => status.blue().to_string(),
        "completed" | "success" | "ok" | "healthy" => status.green().to_string(),
        "failed" | "error" | "offline" => status.red().to_string(),
        "pending" | "degraded" => status.yellow().to_string(),
        "cancelled" | "inactive" | "unknown" => status.dimmed().to_string(),
        _ => status.to_string(),
    }
}

/// Split a comma-separated argument into trimmed, non-empty parts.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
