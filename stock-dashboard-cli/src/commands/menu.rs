//! Sidebar menu and layout commands

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde_json::json;
use stock_dashboard_core::MenuItem;

use crate::context::Context;
use crate::output::{print_field, print_section, OutputFormat, TableDisplay};

/// Sidebar menu and layout settings
#[derive(Debug, Args)]
pub struct MenuCommands {
    #[command(subcommand)]
    pub command: MenuSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum MenuSubcommand {
    /// Sidebar sections and their links
    List,

    /// Show or hide the layout footer
    ToggleFootbar,

    /// Section and link that route to a path
    Find {
        /// Route, e.g. /dashboard/overview
        href: String,
    },
}

/// Execute menu commands
pub async fn execute(ctx: &Context, cmd: MenuCommands) -> Result<()> {
    match cmd.command {
        MenuSubcommand::List => {
            let settings = ctx.settings_store();
            ctx.output.write_list(settings.menu_items(), &["Section", "Icon", "Links"])?;
            if ctx.output.format() == OutputFormat::Table {
                let shown = if settings.show_footbar() { "shown" } else { "hidden" };
                ctx.output.info(&format!("Footer is {}", shown));
            }
            Ok(())
        }
        MenuSubcommand::ToggleFootbar => {
            let mut settings = ctx.settings_store();
            let shown = settings.toggle_footbar();

            let mut config = ctx.config.clone();
            config.settings.show_footbar = shown;
            ctx.save_config(&config)
                .context("Failed to save configuration")?;

            ctx.output.success(if shown {
                "Footer shown"
            } else {
                "Footer hidden"
            });
            Ok(())
        }
        MenuSubcommand::Find { href } => {
            let settings = ctx.settings_store();
            let (section, link) = settings
                .find_by_href(&href)
                .with_context(|| format!("No menu entry routes to {}", href))?;

            if ctx.output.format() == OutputFormat::Table {
                print_field("Section", &section.name);
                print_field("Link", &link.name);
                print_field("Route", &link.href);
                Ok(())
            } else {
                ctx.output.write_value(&json!({
                    "section": section.name,
                    "name": link.name,
                    "href": link.href,
                }))
            }
        }
    }
}

impl TableDisplay for MenuItem {
    fn to_row(&self) -> Vec<Cell> {
        let links: Vec<String> = self
            .children
            .iter()
            .map(|link| format!("{} ({})", link.name, link.href))
            .collect();
        vec![
            Cell::new(&self.name),
            Cell::new(&self.icon),
            Cell::new(links.join("\n")),
        ]
    }

    fn display_single(&self) {
        print_section(&self.name);
        for link in &self.children {
            print_field(&link.name, &link.href);
        }
    }

    fn display_compact(&self) {
        for link in &self.children {
            println!("{}\t{}\t{}", self.name, link.name, link.href);
        }
    }
}
