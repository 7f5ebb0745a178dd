//! Crawler service client
//!
//! Talks to the standalone crawler, not the primary API. Health and metrics
//! results are cached on the client for later reads.

use crate::client::{HttpClient, Service};
use crate::error::{SdkError, SdkResult};
use crate::metrics::{parse_prometheus, MetricFamilies};
use crate::resources::stocks::StocksClient;
use crate::state::OperationState;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;
use urlencoding::encode;

/// Client for the crawler service
#[derive(Debug, Clone)]
pub struct CrawlerClient {
    client: Arc<HttpClient>,
    state: Arc<OperationState>,
    health: Arc<RwLock<Option<Value>>>,
    metrics: Arc<RwLock<Option<MetricFamilies>>>,
}

impl CrawlerClient {
    /// Create a new crawler client
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            state: Arc::new(OperationState::new()),
            health: Arc::new(RwLock::new(None)),
            metrics: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.last_error()
    }

    pub async fn last_health(&self) -> Option<Value> {
        self.health.read().await.clone()
    }

    pub async fn last_metrics(&self) -> Option<MetricFamilies> {
        self.metrics.read().await.clone()
    }

    pub async fn health(&self) -> SdkResult<Value> {
        self.state
            .track(async {
                let body = self
                    .client
                    .get_from(Service::Crawler, "/health")
                    .await
                    .into_result()?;
                let data = unwrap_response(body, "Health check failed")?;
                *self.health.write().await = Some(data.clone());
                Ok(data)
            })
            .await
    }

    /// Daily quotes for one symbol, optionally from a specific broker.
    pub async fn fetch_stock_daily(&self, symbol: &str, broker: Option<&str>) -> SdkResult<DailyFetch> {
        let path = format!("/api/v1/stocks/{}/daily", encode(symbol));

        self.state
            .track(async {
                let started = Instant::now();
                let envelope = match broker.filter(|b| !b.is_empty()) {
                    Some(broker) => {
                        self.client
                            .get_from_with_query(Service::Crawler, &path, &[("broker", broker)])
                            .await
                    }
                    None => self.client.get_from(Service::Crawler, &path).await,
                };
                let data = unwrap_response(envelope.into_result()?, "Daily fetch failed")?;
                let duration = started.elapsed();

                let record_count = data
                    .get("records")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                debug!(symbol, record_count, ?duration, "Crawler daily fetch finished");

                Ok(DailyFetch {
                    data,
                    duration,
                    record_count,
                })
            })
            .await
    }

    pub async fn batch_update_stocks(&self, symbols: &[String]) -> SdkResult<BatchUpdate> {
        self.state
            .track(async {
                let started = Instant::now();
                let body = self
                    .client
                    .post_to(
                        Service::Crawler,
                        "/api/v1/stocks/batch-update",
                        Some(&json!({ "symbols": symbols })),
                    )
                    .await
                    .into_result()?;
                let data = unwrap_response(body, "Batch update failed")?;

                Ok(BatchUpdate {
                    data,
                    duration: started.elapsed(),
                    total_symbols: symbols.len(),
                })
            })
            .await
    }

    pub async fn fetch_stock_history(
        &self,
        symbol: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> SdkResult<Value> {
        let query = HistoryRange { start, end };
        let path = format!("/api/v1/stocks/{}/history", encode(symbol));

        self.state
            .track(async {
                let body = self
                    .client
                    .get_from_with_query(Service::Crawler, &path, &query)
                    .await
                    .into_result()?;
                unwrap_response(body, "History fetch failed")
            })
            .await
    }

    /// Scrapes `/metrics` and parses the exposition text.
    pub async fn prometheus_metrics(&self) -> SdkResult<MetricFamilies> {
        self.state
            .track(async {
                let text = self.client.get_text(Service::Crawler, "/metrics").await?;
                let families = parse_prometheus(&text);
                *self.metrics.write().await = Some(families.clone());
                Ok(families)
            })
            .await
    }

    /// Times the crawler's daily fetch against the primary API's update of
    /// the same symbol. Failures of either side are reported in the
    /// comparison instead of failing the call.
    pub async fn compare_performance(
        &self,
        symbol: &str,
        stocks: &StocksClient,
    ) -> SdkResult<PerformanceComparison> {
        let started = Instant::now();
        let crawler_result = self.fetch_stock_daily(symbol, None).await;
        let crawler_elapsed = started.elapsed();

        let started = Instant::now();
        let api_result = stocks.update_stock_data(symbol).await;
        let api_elapsed = started.elapsed();

        let crawler = match &crawler_result {
            Ok(fetch) => ServiceTiming::succeeded(crawler_elapsed, fetch.record_count),
            Err(e) => ServiceTiming::failed(crawler_elapsed, e.to_string()),
        };
        let api = match &api_result {
            Ok(data) => ServiceTiming::succeeded(
                api_elapsed,
                data.get("count").and_then(Value::as_u64).unwrap_or(0) as usize,
            ),
            Err(e) => ServiceTiming::failed(api_elapsed, e.to_string()),
        };

        let speedup = if crawler.success && api.success && !crawler_elapsed.is_zero() {
            Some(api_elapsed.as_secs_f64() / crawler_elapsed.as_secs_f64())
        } else {
            None
        };

        Ok(PerformanceComparison {
            crawler,
            api,
            speedup,
        })
    }

    /// True when the health check succeeds and reports `status: "ok"`.
    pub async fn is_service_online(&self) -> bool {
        match self.health().await {
            Ok(data) => data.get("status").and_then(Value::as_str) == Some("ok"),
            Err(_) => false,
        }
    }
}

/// Opens the crawler's `{success, data, error: {code, message}}` wrapper.
/// Bodies without a boolean `success` field are returned unchanged.
fn unwrap_response(body: Value, fallback: &str) -> SdkResult<Value> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(body.get("data").cloned().unwrap_or(Value::Null)),
        Some(false) => {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(fallback);
            Err(SdkError::business(message))
        }
        None => Ok(body),
    }
}

#[derive(Debug, Serialize)]
struct HistoryRange<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyFetch {
    pub data: Value,
    pub duration: Duration,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchUpdate {
    pub data: Value,
    pub duration: Duration,
    pub total_symbols: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceTiming {
    pub duration_ms: u64,
    pub success: bool,
    pub record_count: usize,
    pub error: Option<String>,
}

impl ServiceTiming {
    fn succeeded(elapsed: Duration, record_count: usize) -> Self {
        Self {
            duration_ms: elapsed.as_millis() as u64,
            success: true,
            record_count,
            error: None,
        }
    }

    fn failed(elapsed: Duration, error: String) -> Self {
        Self {
            duration_ms: elapsed.as_millis() as u64,
            success: false,
            record_count: 0,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceComparison {
    pub crawler: ServiceTiming,
    pub api: ServiceTiming,
    /// API duration divided by crawler duration, only when both succeeded
    pub speedup: Option<f64>,
}
