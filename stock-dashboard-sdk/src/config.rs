//! SDK configuration
//!
//! Base URLs for the two backends, HTTP timeouts, and the cadence used by
//! the task poller and the pagination helper.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{SdkError, SdkResult};

/// Primary API base used outside production.
pub const DEVELOPMENT_API_URL: &str = "http://localhost:9121/api/v1";

/// Primary API base used in production when no public URL is configured.
pub const DEFAULT_PRODUCTION_API_URL: &str = "http://localhost:9127/api/v1";

/// Crawler service base.
pub const DEFAULT_CRAWLER_URL: &str = "http://localhost:8082";

pub const ENV_ENVIRONMENT: &str = "STOCK_DASHBOARD_ENV";
pub const ENV_API_URL: &str = "STOCK_DASHBOARD_API_URL";
pub const ENV_CRAWLER_URL: &str = "STOCK_DASHBOARD_CRAWLER_URL";

/// Deployment flavour that selects the primary API base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiEnvironment {
    #[default]
    Development,
    Production,
}

impl fmt::Display for ApiEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiEnvironment::Development => write!(f, "development"),
            ApiEnvironment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for ApiEnvironment {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(ApiEnvironment::Development),
            "production" | "prod" => Ok(ApiEnvironment::Production),
            other => Err(SdkError::ConfigurationError(format!(
                "Unknown environment: {}",
                other
            ))),
        }
    }
}

/// Configuration for the SDK client
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Base URL for the primary data/task API, including `/api/v1`
    pub base_url: String,

    /// Base URL for the crawler service
    pub crawler_url: String,

    /// Environment the base URL was chosen for
    pub environment: ApiEnvironment,

    /// Request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Enable request/response logging
    pub enable_logging: bool,

    /// Custom headers to add to all requests
    pub custom_headers: Vec<(String, String)>,

    /// Interval between task poller ticks
    pub poll_interval: Duration,

    /// Page size used when walking paginated endpoints
    pub page_size: u32,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            base_url: DEVELOPMENT_API_URL.to_string(),
            crawler_url: DEFAULT_CRAWLER_URL.to_string(),
            environment: ApiEnvironment::Development,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("stock-dashboard-sdk/{}", env!("CARGO_PKG_VERSION")),
            enable_logging: false,
            custom_headers: Vec::new(),
            poll_interval: Duration::from_secs(3),
            page_size: 1000,
        }
    }
}

impl SdkConfig {
    /// Create a new configuration with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Create a new builder with the given base URL
    pub fn builder(base_url: impl Into<String>) -> SdkConfigBuilder {
        SdkConfigBuilder {
            config: Self::new(base_url),
        }
    }

    /// Picks the primary API base for `environment`. Production uses
    /// `public_url` when given.
    pub fn from_environment(environment: ApiEnvironment, public_url: Option<&str>) -> Self {
        let base_url = match environment {
            ApiEnvironment::Development => DEVELOPMENT_API_URL.to_string(),
            ApiEnvironment::Production => public_url
                .filter(|u| !u.is_empty())
                .unwrap_or(DEFAULT_PRODUCTION_API_URL)
                .to_string(),
        };

        Self {
            base_url,
            environment,
            ..Default::default()
        }
    }

    /// Reads `STOCK_DASHBOARD_ENV`, `STOCK_DASHBOARD_API_URL` and
    /// `STOCK_DASHBOARD_CRAWLER_URL`.
    pub fn from_env() -> SdkResult<Self> {
        let environment = match std::env::var(ENV_ENVIRONMENT) {
            Ok(value) => value.parse()?,
            Err(_) => ApiEnvironment::default(),
        };
        let public_url = std::env::var(ENV_API_URL).ok();

        let mut config = Self::from_environment(environment, public_url.as_deref());
        if let Ok(crawler_url) = std::env::var(ENV_CRAWLER_URL) {
            config.crawler_url = crawler_url;
        }
        Ok(config)
    }

    /// Set the crawler service base URL
    pub fn with_crawler_url(mut self, url: impl Into<String>) -> Self {
        self.crawler_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable request/response logging
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    /// Add a custom header to all requests
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> SdkResult<()> {
        if self.base_url.is_empty() {
            return Err(SdkError::ConfigurationError(
                "Base URL cannot be empty".to_string(),
            ));
        }
        if self.crawler_url.is_empty() {
            return Err(SdkError::ConfigurationError(
                "Crawler URL cannot be empty".to_string(),
            ));
        }

        url::Url::parse(&self.base_url)?;
        url::Url::parse(&self.crawler_url)?;

        if self.timeout.is_zero() {
            return Err(SdkError::ConfigurationError(
                "Timeout cannot be zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(SdkError::ConfigurationError(
                "Poll interval cannot be zero".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(SdkError::ConfigurationError(
                "Page size cannot be zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for SDK configuration
#[derive(Debug, Default)]
pub struct SdkConfigBuilder {
    config: SdkConfig,
}

impl SdkConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the crawler URL
    pub fn crawler_url(mut self, url: impl Into<String>) -> Self {
        self.config.crawler_url = url.into();
        self
    }

    pub fn environment(mut self, environment: ApiEnvironment) -> Self {
        self.config.environment = environment;
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Enable logging
    pub fn logging(mut self, enable: bool) -> Self {
        self.config.enable_logging = enable;
        self
    }

    /// Add a custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.custom_headers.push((name.into(), value.into()));
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Build the configuration
    pub fn build(self) -> SdkConfig {
        self.config
    }
}
