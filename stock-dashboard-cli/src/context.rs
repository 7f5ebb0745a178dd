//! CLI execution context

use anyhow::{Context as _, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;
use stock_dashboard_core::{
    AuthStore, FileSessionStorage, InMemoryUserDirectory, SessionUser, SettingsStore,
};
use stock_dashboard_sdk::config::ENV_API_URL;
use stock_dashboard_sdk::{SdkConfig, StockDashboardClient};

use crate::cli::Cli;
use crate::config::{CliConfig, Profile};
use crate::output::{OutputFormat, OutputWriter};

pub type CliAuthStore = AuthStore<InMemoryUserDirectory, FileSessionStorage>;

/// Execution context for CLI commands
pub struct Context {
    /// CLI configuration
    pub config: CliConfig,

    /// Directory holding the config file and the saved session
    pub config_dir: PathBuf,

    /// Active profile name
    pub profile_name: Option<String>,

    /// Active profile
    pub profile: Profile,

    /// Output writer
    pub output: OutputWriter,

    /// Verbose mode
    pub verbose: bool,

    /// API URL override
    pub api_url_override: Option<String>,

    /// Crawler URL override
    pub crawler_url_override: Option<String>,
}

impl Context {
    /// Create a new context from CLI arguments
    pub fn new(cli: &Cli) -> Result<Self> {
        let config_dir = match &cli.config_dir {
            Some(dir) => dir.clone(),
            None => CliConfig::default_dir()?,
        };
        let config = CliConfig::load(&config_dir)?;

        let profile_name = cli.profile.clone().or_else(|| config.default_profile.clone());
        let profile = config
            .get_profile(profile_name.as_deref())
            .cloned()
            .unwrap_or_default();

        let output_format = match cli.output {
            Some(format) => format,
            None => OutputFormat::from_str(&config.settings.output_format, true)
                .map_err(|e| anyhow::anyhow!("Invalid output_format in config: {}", e))?,
        };
        let no_color = cli.no_color || !config.settings.color;
        let output = OutputWriter::new(output_format, no_color);

        Ok(Self {
            config,
            config_dir,
            profile_name,
            profile,
            output,
            verbose: cli.verbose,
            api_url_override: cli.api_url.clone(),
            crawler_url_override: cli.crawler_url.clone(),
        })
    }

    /// SDK configuration after applying the profile and command-line overrides.
    ///
    /// Without a profile environment, `STOCK_DASHBOARD_ENV` decides which
    /// default API base is used. `STOCK_DASHBOARD_API_URL` only ever names
    /// the production public URL.
    pub fn sdk_config(&self) -> Result<SdkConfig> {
        let mut config = match self.profile.environment {
            Some(_) => {
                let public_url = std::env::var(ENV_API_URL).ok();
                SdkConfig::from_environment(self.profile.environment()?, public_url.as_deref())
            }
            None => SdkConfig::from_env().context("Invalid environment settings")?,
        };

        if let Some(url) = self
            .api_url_override
            .as_ref()
            .or(self.profile.api_url.as_ref())
        {
            config.base_url = url.clone();
        }
        if let Some(url) = self
            .crawler_url_override
            .as_ref()
            .or(self.profile.crawler_url.as_ref())
        {
            config.crawler_url = url.clone();
        }

        let settings = &self.config.settings;
        let mut config = config
            .with_timeout(Duration::from_secs(settings.timeout_secs))
            .with_poll_interval(Duration::from_secs(settings.poll_interval_secs))
            .with_logging(self.verbose);

        for (name, value) in &self.profile.headers {
            config = config.with_header(name.clone(), value.clone());
        }

        Ok(config)
    }

    /// Get the effective API URL
    pub fn api_url(&self) -> Result<String> {
        Ok(self.sdk_config()?.base_url)
    }

    /// Get the effective crawler URL
    pub fn crawler_url(&self) -> Result<String> {
        Ok(self.sdk_config()?.crawler_url)
    }

    /// Create an SDK client
    pub fn create_client(&self) -> Result<StockDashboardClient> {
        StockDashboardClient::new(self.sdk_config()?).context("Failed to create API client")
    }

    /// Auth store over the demo directory, with the session saved in the config directory.
    /// The saved session is restored before returning.
    pub async fn auth_store(&self) -> Result<CliAuthStore> {
        let store = AuthStore::new(
            InMemoryUserDirectory::seeded(),
            FileSessionStorage::new(&self.config_dir),
        );
        store.initialize().await.context("Failed to restore session")?;
        Ok(store)
    }

    /// File the login session is saved to
    pub fn auth_session_path(&self) -> PathBuf {
        FileSessionStorage::new(&self.config_dir).path().to_path_buf()
    }

    /// Fails unless a session exists.
    pub async fn require_login(&self) -> Result<(CliAuthStore, SessionUser)> {
        let store = self.auth_store().await?;
        let user = store
            .current_user()
            .await
            .context("Not logged in. Run 'stock-dashboard auth login' first.")?;
        Ok((store, user))
    }

    /// Layout settings with the persisted footer flag applied.
    pub fn settings_store(&self) -> SettingsStore {
        let mut store = SettingsStore::new();
        if store.show_footbar() != self.config.settings.show_footbar {
            store.toggle_footbar();
        }
        store
    }

    /// Save a configuration to the active config directory
    pub fn save_config(&self, config: &CliConfig) -> Result<()> {
        config.save(&self.config_dir)
    }
}
