//! Configuration commands

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use stock_dashboard_sdk::ApiEnvironment;

use crate::config::{CliConfig, Profile, CONFIG_FILE};
use crate::context::Context;
use crate::output::OutputFormat;

/// Configuration management commands
#[derive(Debug, Args)]
pub struct ConfigCommands {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration
    Show {
        /// Profile to show, the active one when omitted
        name: Option<String>,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., settings.timeout_secs, profile.local.api_url)
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// List all profiles
    Profiles,

    /// Set the default profile
    UseProfile {
        /// Profile name to use as default
        name: String,
    },

    /// Create a new profile
    CreateProfile {
        /// Profile name
        name: String,

        /// Primary API URL for this profile
        #[arg(long)]
        api_url: Option<String>,

        /// Crawler URL for this profile
        #[arg(long)]
        crawler_url: Option<String>,

        /// development or production
        #[arg(long)]
        environment: Option<String>,

        /// Copy settings from another profile
        #[arg(long)]
        from: Option<String>,
    },

    /// Delete a profile
    DeleteProfile {
        /// Profile name to delete
        name: String,

        /// Force deletion without confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file paths
    Path,

    /// Reset configuration to defaults
    Reset {
        /// Force reset without confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Execute configuration commands
pub async fn execute(ctx: &Context, cmd: ConfigCommands) -> Result<()> {
    match cmd.command {
        ConfigSubcommand::Show { name } => show(ctx, name.as_deref()),
        ConfigSubcommand::Set { key, value } => set(ctx, &key, &value),
        ConfigSubcommand::Get { key } => get(ctx, &key),
        ConfigSubcommand::Profiles => list_profiles(ctx),
        ConfigSubcommand::UseProfile { name } => use_profile(ctx, &name),
        ConfigSubcommand::CreateProfile {
            name,
            api_url,
            crawler_url,
            environment,
            from,
        } => create_profile(ctx, &name, api_url, crawler_url, environment, from.as_deref()),
        ConfigSubcommand::DeleteProfile { name, force } => delete_profile(ctx, &name, force),
        ConfigSubcommand::Path => show_paths(ctx),
        ConfigSubcommand::Reset { force } => reset(ctx, force),
    }
}

fn show(ctx: &Context, profile: Option<&str>) -> Result<()> {
    if ctx.output.format() != OutputFormat::Table {
        return ctx.output.write_value(&serde_json::to_value(&ctx.config)?);
    }

    println!("{}", "Configuration".bold().underline());
    println!();

    let settings = &ctx.config.settings;
    println!("{}", "Settings:".cyan());
    println!("  output_format: {}", settings.output_format);
    println!("  color: {}", settings.color);
    println!("  timeout_secs: {}", settings.timeout_secs);
    println!("  poll_interval_secs: {}", settings.poll_interval_secs);
    println!("  show_footbar: {}", settings.show_footbar);

    println!();
    println!("{}", "Effective endpoints:".cyan());
    println!("  api_url: {}", ctx.api_url()?);
    println!("  crawler_url: {}", ctx.crawler_url()?);

    if let Some(default) = &ctx.config.default_profile {
        println!();
        println!("{}: {}", "Default profile".cyan(), default);
    }
    if let Some(active) = &ctx.profile_name {
        println!("{}: {}", "Active profile".cyan(), active);
    }

    println!();
    println!("{}", "Profiles:".cyan());

    if ctx.config.profiles.is_empty() {
        println!("  No profiles configured");
        return Ok(());
    }

    let names: Vec<&str> = match profile {
        Some(name) => vec![name],
        None => ctx.config.list_profiles(),
    };
    for name in names {
        let Some(p) = ctx.config.profiles.get(name) else {
            println!("  Profile '{}' not found", name);
            continue;
        };
        let default_marker = if ctx.config.default_profile.as_deref() == Some(name) {
            " (default)".green().to_string()
        } else {
            String::new()
        };
        println!("  [{}]{}", name, default_marker);
        print_profile(p);
    }

    Ok(())
}

fn print_profile(p: &Profile) {
    let unset = || "-".dimmed().to_string();
    println!("    api_url: {}", p.api_url.clone().unwrap_or_else(unset));
    println!("    crawler_url: {}", p.crawler_url.clone().unwrap_or_else(unset));
    println!("    environment: {}", p.environment.clone().unwrap_or_else(unset));
    if !p.headers.is_empty() {
        println!("    headers:");
        for (k, v) in &p.headers {
            println!("      {}: {}", k, v);
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    value.parse().context("Invalid boolean value")
}

/// Endpoints must be absolute http(s) URLs.
fn parse_endpoint(value: &str) -> Result<String> {
    let url = url::Url::parse(value).with_context(|| format!("Invalid URL: {}", value))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("Unsupported URL scheme: {}", url.scheme());
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn set_profile_field(profile: &mut Profile, field: &str, value: &str) -> Result<()> {
    match field {
        "api_url" => profile.api_url = Some(parse_endpoint(value)?),
        "crawler_url" => profile.crawler_url = Some(parse_endpoint(value)?),
        "environment" => {
            let env: ApiEnvironment = value.parse()?;
            profile.environment = Some(env.to_string());
        }
        _ => anyhow::bail!("Unknown profile field: {}", field),
    }
    Ok(())
}

/// Applies `key = value` to a copy of `config`.
fn apply_setting(config: &CliConfig, key: &str, value: &str) -> Result<CliConfig> {
    let mut config = config.clone();
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["settings", setting] => match *setting {
            "output_format" => {
                <OutputFormat as clap::ValueEnum>::from_str(value, true)
                    .map_err(|e| anyhow::anyhow!("Invalid output format: {}", e))?;
                config.settings.output_format = value.to_lowercase();
            }
            "color" => config.settings.color = parse_bool(value)?,
            "show_footbar" => config.settings.show_footbar = parse_bool(value)?,
            "timeout_secs" => {
                config.settings.timeout_secs = value.parse().context("Invalid number")?
            }
            "poll_interval_secs" => {
                config.settings.poll_interval_secs = value.parse().context("Invalid number")?
            }
            _ => anyhow::bail!("Unknown setting: {}", setting),
        },
        ["profile", name, field] => {
            set_profile_field(config.get_or_create_profile(name), field, value)?;
        }
        ["profile", name, "headers", header] => {
            config
                .get_or_create_profile(name)
                .headers
                .insert(header.to_string(), value.to_string());
        }
        ["default_profile"] => config.set_default_profile(value),
        _ => anyhow::bail!("Unknown configuration key: {}", key),
    }

    Ok(config)
}

fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let config = apply_setting(&ctx.config, key, value)?;
    ctx.save_config(&config)
        .context("Failed to save configuration")?;
    ctx.output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn get(ctx: &Context, key: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let settings = &ctx.config.settings;

    let value = match parts.as_slice() {
        ["settings", setting] => match *setting {
            "output_format" => settings.output_format.clone(),
            "color" => settings.color.to_string(),
            "show_footbar" => settings.show_footbar.to_string(),
            "timeout_secs" => settings.timeout_secs.to_string(),
            "poll_interval_secs" => settings.poll_interval_secs.to_string(),
            _ => anyhow::bail!("Unknown setting: {}", setting),
        },
        ["profile", name, field] => {
            let p = ctx
                .config
                .profiles
                .get(*name)
                .with_context(|| format!("Profile '{}' not found", name))?;
            let value = match *field {
                "api_url" => p.api_url.clone(),
                "crawler_url" => p.crawler_url.clone(),
                "environment" => p.environment.clone(),
                _ => anyhow::bail!("Unknown profile field: {}", field),
            };
            value.unwrap_or_else(|| "not set".to_string())
        }
        ["default_profile"] => ctx
            .config
            .default_profile
            .clone()
            .unwrap_or_else(|| "not set".to_string()),
        ["api_url"] => ctx.api_url()?,
        ["crawler_url"] => ctx.crawler_url()?,
        _ => anyhow::bail!("Unknown configuration key: {}", key),
    };

    println!("{}", value);
    Ok(())
}

fn list_profiles(ctx: &Context) -> Result<()> {
    if ctx.config.profiles.is_empty() {
        ctx.output
            .info("No profiles configured. Run 'stock-dashboard config create-profile' to add one.");
        return Ok(());
    }

    println!("{}", "Configured profiles:".bold());
    println!();

    for name in ctx.config.list_profiles() {
        if ctx.config.default_profile.as_deref() == Some(name) {
            println!("  {} {}", "→".green(), name.green().bold());
        } else {
            println!("    {}", name);
        }
    }

    Ok(())
}

fn use_profile(ctx: &Context, name: &str) -> Result<()> {
    let mut config = ctx.config.clone();

    if !config.profiles.contains_key(name) {
        anyhow::bail!(
            "Profile '{}' not found. Run 'stock-dashboard config profiles' to list available profiles.",
            name
        );
    }

    config.set_default_profile(name);
    ctx.save_config(&config)
        .context("Failed to save configuration")?;

    ctx.output.success(&format!("Now using profile '{}'", name));
    Ok(())
}

fn create_profile(
    ctx: &Context,
    name: &str,
    api_url: Option<String>,
    crawler_url: Option<String>,
    environment: Option<String>,
    from: Option<&str>,
) -> Result<()> {
    let mut config = ctx.config.clone();

    if config.profiles.contains_key(name) {
        anyhow::bail!("Profile '{}' already exists", name);
    }

    let mut profile = match from {
        Some(source) => config
            .profiles
            .get(source)
            .cloned()
            .with_context(|| format!("Source profile '{}' not found", source))?,
        None => Profile::default(),
    };

    if let Some(url) = api_url {
        set_profile_field(&mut profile, "api_url", &url)?;
    }
    if let Some(url) = crawler_url {
        set_profile_field(&mut profile, "crawler_url", &url)?;
    }
    if let Some(env) = environment {
        set_profile_field(&mut profile, "environment", &env)?;
    }

    config.profiles.insert(name.to_string(), profile);
    ctx.save_config(&config)
        .context("Failed to save configuration")?;

    ctx.output.success(&format!("Created profile '{}'", name));
    if let Some(source) = from {
        ctx.output.info(&format!("Copied settings from '{}'", source));
    }

    Ok(())
}

fn delete_profile(ctx: &Context, name: &str, force: bool) -> Result<()> {
    let mut config = ctx.config.clone();

    if !config.profiles.contains_key(name) {
        anyhow::bail!("Profile '{}' not found", name);
    }

    if !force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!("Delete profile '{}'?", name))
            .default(false)
            .interact()
            .context("Failed to get confirmation")?;

        if !confirm {
            ctx.output.info("Cancelled");
            return Ok(());
        }
    }

    config.remove_profile(name);
    ctx.save_config(&config)
        .context("Failed to save configuration")?;

    ctx.output.success(&format!("Deleted profile '{}'", name));
    Ok(())
}

fn show_paths(ctx: &Context) -> Result<()> {
    println!("{}", "Configuration paths:".bold());
    println!();

    let path = ctx.config_dir.join(CONFIG_FILE);
    let status = if path.exists() { "✓".green() } else { "✗".red() };
    println!("  Config:  {} {}", status, path.display());

    let session = ctx.auth_session_path();
    let status = if session.exists() { "✓".green() } else { "✗".red() };
    println!("  Session: {} {}", status, session.display());

    Ok(())
}

fn reset(ctx: &Context, force: bool) -> Result<()> {
    if !force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt("Reset all configuration to defaults? This cannot be undone.")
            .default(false)
            .interact()
            .context("Failed to get confirmation")?;

        if !confirm {
            ctx.output.info("Cancelled");
            return Ok(());
        }
    }

    ctx.save_config(&CliConfig::default())
        .context("Failed to save configuration")?;

    ctx.output.success("Configuration reset to defaults");
    Ok(())
}
