//! CLI configuration management
//!
//! `config.toml` lives in the platform config directory unless
//! `--config-dir` points elsewhere. Values can be overridden from the
//! environment with the `STOCK_DASHBOARD_` prefix and `__` as the nesting
//! separator, e.g. `STOCK_DASHBOARD_SETTINGS__TIMEOUT_SECS=5`.

use anyhow::{Context as _, Result};
use config::{Config as ConfigLoader, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use stock_dashboard_sdk::ApiEnvironment;

pub const CONFIG_FILE: &str = "config.toml";

const ENV_PREFIX: &str = "STOCK_DASHBOARD";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CliConfig {
    /// Default profile to use
    #[serde(default)]
    pub default_profile: Option<String>,

    /// Named profiles
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

impl CliConfig {
    /// Load from `dir`, layering environment overrides on top.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);

        let loader = ConfigLoader::builder()
            .add_source(File::from(path.as_path()).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        loader
            .try_deserialize()
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Save to `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory {:?}", dir))?;
        let path = dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(())
    }

    /// Platform config directory, used when no override is given.
    pub fn default_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "stock-dashboard", "stock-dashboard-cli")
            .context("Could not determine config directory")?;
        Ok(dirs.config_dir().to_path_buf())
    }

    /// Get a profile by name, falling back to the default profile
    pub fn get_profile(&self, name: Option<&str>) -> Option<&Profile> {
        let profile_name = name.or(self.default_profile.as_deref())?;
        self.profiles.get(profile_name)
    }

    /// Get or create a profile
    pub fn get_or_create_profile(&mut self, name: &str) -> &mut Profile {
        self.profiles.entry(name.to_string()).or_default()
    }

    /// Set the default profile
    pub fn set_default_profile(&mut self, name: &str) {
        self.default_profile = Some(name.to_string());
    }

    /// Remove a profile, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profile names, sorted
    pub fn list_profiles(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// A configuration profile
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Profile {
    /// Primary API base URL
    #[serde(default)]
    pub api_url: Option<String>,

    /// Crawler service base URL
    #[serde(default)]
    pub crawler_url: Option<String>,

    /// `development` or `production`; picks the API URL when none is set
    #[serde(default)]
    pub environment: Option<String>,

    /// Additional headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Profile {
    pub fn environment(&self) -> Result<ApiEnvironment> {
        match &self.environment {
            Some(env) => env
                .parse()
                .with_context(|| format!("Invalid environment in profile: {}", env)),
            None => Ok(ApiEnvironment::default()),
        }
    }
}

/// Global settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Default output format
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Seconds between task status checks in `tasks watch`
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Whether the layout footer is shown
    #[serde(default = "default_true")]
    pub show_footbar: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_format: default_output_format(),
            color: true,
            timeout_secs: default_timeout(),
            poll_interval_secs: default_poll_interval(),
            show_footbar: true,
        }
    }
}

fn default_output_format() -> String {
    "table".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    3
}
