//! Stock Dashboard SDK
//!
//! Async clients for the stock dashboard's primary data/task API and its
//! crawler service.
//!
//! # Features
//!
//! - **Uniform results**: every HTTP call is normalized into an [`Envelope`]
//!   and surfaced as [`SdkResult`]
//! - **Per-client state**: each resource client reports whether a call is in
//!   flight and the last error it saw
//! - **Pagination**: [`paginate`] walks page-numbered endpoints to the end
//! - **Task polling**: [`TasksClient::start_task_polling`] reports tasks that
//!   stopped running
//! - **Metrics**: the crawler's Prometheus text is parsed into
//!   [`MetricFamilies`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stock_dashboard_sdk::{SdkConfig, StockDashboardClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = StockDashboardClient::new(SdkConfig::from_env()?)?;
//!
//!     let count = client.stocks().get_stock_count().await?;
//!     println!("Stocks: {}", count);
//!
//!     let snapshot = client.tasks().get_manual_tasks().await?;
//!     println!("{} tasks running", snapshot.running_tasks.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! ```rust,no_run
//! use stock_dashboard_sdk::{SdkError, StockDashboardClient};
//!
//! async fn handle_errors(client: &StockDashboardClient) {
//!     match client.trading_days().missing_summary(30).await {
//!         Ok(summary) => println!("{}", summary),
//!         Err(SdkError::Business { message }) => eprintln!("Rejected: {}", message),
//!         Err(SdkError::Api { status, message }) => eprintln!("HTTP {}: {}", status, message),
//!         Err(e) => eprintln!("Other error: {}", e),
//!     }
//! }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod polling;
pub mod resources;
pub mod state;

// Re-export main types for convenience
pub use client::{paginate, HttpClient, PageParams, Service};
pub use config::{ApiEnvironment, SdkConfig, SdkConfigBuilder};
pub use envelope::Envelope;
pub use error::{SdkError, SdkResult};
pub use metrics::{parse_prometheus, MetricFamilies, MetricSample, MetricValue};
pub use polling::{start_polling, PollHandle, PollState, TaskSource};
pub use state::{BusyFlag, BusyGuard, OperationState};

// Re-export resource clients
pub use resources::crawler::{
    BatchUpdate, CrawlerClient, DailyFetch, PerformanceComparison, ServiceTiming,
};
pub use resources::moving_averages::{
    AsyncCalculation, MaQueryParams, MovingAveragesClient, DEFAULT_PERIODS,
};
pub use resources::stocks::{HistoryParams, StockListParams, StockWithData, StocksClient};
pub use resources::tasks::{OptimizedCrawlOptions, SequentialCrawlOptions, TasksClient};
pub use resources::trading_days::{
    BatchProgress, BatchUpdateSummary, DateUpdateResult, SmartApiCall, TradingDaysClient,
    DEFAULT_BATCH_DELAY, DEFAULT_DAYS_BACK, SMART_BATCH_DELAY,
};

use std::sync::Arc;

/// Entry point bundling one client per backend area over a shared
/// [`HttpClient`].
///
/// ```rust,no_run
/// use stock_dashboard_sdk::StockDashboardClient;
/// use std::time::Duration;
///
/// let client = StockDashboardClient::builder("http://localhost:9121/api/v1")
///     .with_crawler_url("http://localhost:8082")
///     .with_timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok::<(), stock_dashboard_sdk::SdkError>(())
/// ```
#[derive(Debug, Clone)]
pub struct StockDashboardClient {
    http_client: Arc<HttpClient>,
    stocks: StocksClient,
    moving_averages: MovingAveragesClient,
    trading_days: TradingDaysClient,
    tasks: TasksClient,
    crawler: CrawlerClient,
}

impl StockDashboardClient {
    /// Create a new client with the given configuration.
    ///
    /// Fails when the configuration does not validate.
    pub fn new(config: SdkConfig) -> SdkResult<Self> {
        let http_client = Arc::new(HttpClient::new(config)?);

        Ok(Self {
            stocks: StocksClient::new(Arc::clone(&http_client)),
            moving_averages: MovingAveragesClient::new(Arc::clone(&http_client)),
            trading_days: TradingDaysClient::new(Arc::clone(&http_client)),
            tasks: TasksClient::new(Arc::clone(&http_client)),
            crawler: CrawlerClient::new(Arc::clone(&http_client)),
            http_client,
        })
    }

    /// Create a new client using a builder pattern.
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    pub fn stocks(&self) -> &StocksClient {
        &self.stocks
    }

    pub fn moving_averages(&self) -> &MovingAveragesClient {
        &self.moving_averages
    }

    pub fn trading_days(&self) -> &TradingDaysClient {
        &self.trading_days
    }

    pub fn tasks(&self) -> &TasksClient {
        &self.tasks
    }

    pub fn crawler(&self) -> &CrawlerClient {
        &self.crawler
    }

    /// Get a reference to the underlying HTTP client.
    ///
    /// This is useful for making custom requests not covered by the resource clients.
    pub fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Get the base URL of the primary API.
    pub fn base_url(&self) -> &str {
        &self.http_client.config().base_url
    }

    pub fn crawler_url(&self) -> &str {
        &self.http_client.config().crawler_url
    }
}

/// Builder for creating a [`StockDashboardClient`] with fluent configuration.
#[derive(Debug)]
pub struct ClientBuilder {
    config_builder: SdkConfigBuilder,
}

impl ClientBuilder {
    /// Create a new client builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config_builder: SdkConfig::builder(base_url),
        }
    }

    pub fn with_crawler_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.crawler_url(url);
        self
    }

    pub fn with_environment(mut self, environment: ApiEnvironment) -> Self {
        self.config_builder = self.config_builder.environment(environment);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.connect_timeout(timeout);
        self
    }

    pub fn with_poll_interval(mut self, interval: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.poll_interval(interval);
        self
    }

    /// Enable or disable request/response logging.
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.config_builder = self.config_builder.logging(enable);
        self
    }

    /// Add a custom header to all requests.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.header(name, value);
        self
    }

    /// Build the client.
    pub fn build(self) -> SdkResult<StockDashboardClient> {
        StockDashboardClient::new(self.config_builder.build())
    }
}
