//! Trading days resource client
//!
//! Several of these endpoints wrap their payload a second time as
//! `{status: "success" | ..., data, message}` inside the HTTP body. Those are
//! unwrapped here, and a non-success `status` becomes [`SdkError::Business`].
//!
//! The batch helpers run strictly one request at a time with a pause in
//! between, reporting progress before each request.

use crate::client::HttpClient;
use crate::error::{SdkError, SdkResult};
use crate::state::OperationState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use urlencoding::encode;

/// Pause between requests of [`TradingDaysClient::batch_update_missing_dates`].
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(1000);

/// Pause between requests of [`TradingDaysClient::execute_smart_batch_update`].
pub const SMART_BATCH_DELAY: Duration = Duration::from_millis(1500);

pub const DEFAULT_DAYS_BACK: u32 = 30;

const API_PREFIX: &str = "/api/v1";

/// Client for trading day analysis
#[derive(Debug, Clone)]
pub struct TradingDaysClient {
    client: Arc<HttpClient>,
    state: Arc<OperationState>,
}

impl TradingDaysClient {
    /// Create a new trading days client
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            state: Arc::new(OperationState::new()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.last_error()
    }

    /// Trading days without stored data over the last `days_back` days.
    pub async fn missing_summary(&self, days_back: u32) -> SdkResult<Value> {
        self.state
            .track(async {
                let body = self
                    .client
                    .get_with_query("/trading-days/missing-summary", &[("days_back", days_back)])
                    .await
                    .into_result()?;
                unwrap_status(body, "Failed to fetch missing trading day summary")
            })
            .await
    }

    /// Same as [`missing_summary`](Self::missing_summary) with the look-back
    /// range chosen by the server.
    pub async fn smart_analysis(&self) -> SdkResult<Value> {
        self.state
            .track(async {
                let body = self
                    .client
                    .get("/trading-days/smart-analysis")
                    .await
                    .into_result()?;
                let data = unwrap_status(body, "Smart analysis failed")?;
                let missing = data
                    .pointer("/statistics/total_missing_days")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                info!(missing, "Smart trading day analysis finished");
                Ok(data)
            })
            .await
    }

    pub async fn stock_completeness(
        &self,
        stock_code: Option<&str>,
        days_back: u32,
    ) -> SdkResult<Value> {
        let query = CompletenessQuery {
            days_back,
            stock_code: stock_code.filter(|c| !c.is_empty()),
        };

        self.state
            .track(async {
                self.client
                    .get_with_query("/trading-days/stock-completeness", &query)
                    .await
                    .into_result()
            })
            .await
    }

    /// Repair suggestions for `YYYY-MM-DD` dates; the body is a bare JSON array.
    pub async fn fix_suggestions(&self, missing_dates: &[String]) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .post("/trading-days/fix-suggestions", Some(missing_dates))
                    .await
                    .into_result()
            })
            .await
    }

    /// Pulls one day of exchange-wide data. Accepts `YYYY-MM-DD` or `YYYYMMDD`.
    pub async fn update_missing_date(&self, date: &str, save_to_db: bool) -> SdkResult<Value> {
        let path = format!("/twse/historical-all/{}", encode(&compact_date(date)));

        self.state
            .track(async {
                self.client
                    .get_with_query(&path, &[("save_to_db", save_to_db)])
                    .await
                    .into_result()
            })
            .await
    }

    /// Updates each date in turn, sleeping `delay` between requests. A failed
    /// date is recorded in the summary and does not stop the batch.
    pub async fn batch_update_missing_dates<F>(
        &self,
        dates: &[String],
        delay: Duration,
        mut on_progress: F,
    ) -> SdkResult<BatchUpdateSummary>
    where
        F: FnMut(&BatchProgress),
    {
        let total = dates.len();
        let mut results = Vec::with_capacity(total);

        for (i, date) in dates.iter().enumerate() {
            on_progress(&BatchProgress::new(i + 1, total, date, None));

            let outcome = self.update_missing_date(date, true).await;
            results.push(DateUpdateResult::from_outcome(date, outcome));

            if i + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(BatchUpdateSummary::from_results(results))
    }

    pub async fn service_info(&self) -> SdkResult<Value> {
        self.client.get("/trading-days/info").await.into_result()
    }

    /// Analysis that yields the list of exchange calls needed to fill gaps.
    /// With `force_refresh` the list is produced even when nothing is missing.
    pub async fn smart_batch_update_analysis(
        &self,
        days_back: u32,
        force_refresh: bool,
    ) -> SdkResult<Value> {
        let query = SmartBatchQuery {
            days_back,
            force_refresh,
        };

        self.state
            .track(async {
                self.client
                    .get_with_query("/trading-days/smart-batch-update-analysis", &query)
                    .await
                    .into_result()
            })
            .await
    }

    /// Runs the calls produced by
    /// [`smart_batch_update_analysis`](Self::smart_batch_update_analysis).
    pub async fn execute_smart_batch_update<F>(
        &self,
        api_calls: &[SmartApiCall],
        delay: Duration,
        mut on_progress: F,
    ) -> SdkResult<BatchUpdateSummary>
    where
        F: FnMut(&BatchProgress),
    {
        let total = api_calls.len();
        let mut results = Vec::with_capacity(total);

        for (i, call) in api_calls.iter().enumerate() {
            on_progress(&BatchProgress::new(
                i + 1,
                total,
                &call.date,
                Some(format!("Processing {}", call.date)),
            ));

            let path = relative_endpoint(&call.api_endpoint);
            let outcome = self.client.get(&path).await.into_result();
            match &outcome {
                Ok(_) => info!(date = %call.date, "Batch update finished"),
                Err(e) => warn!(date = %call.date, error = %e, "Batch update failed"),
            }
            results.push(DateUpdateResult::from_outcome(&call.date, outcome));

            if i + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(BatchUpdateSummary::from_results(results))
    }
}

fn unwrap_status(body: Value, fallback: &str) -> SdkResult<Value> {
    if body.get("status").and_then(Value::as_str) == Some("success") {
        return Ok(body.get("data").cloned().unwrap_or(Value::Null));
    }

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(fallback);
    Err(SdkError::business(message))
}

fn compact_date(date: &str) -> String {
    date.replace('-', "")
}

/// Turns an absolute API endpoint into one relative to the API base,
/// keeping its query string.
fn relative_endpoint(endpoint: &str) -> String {
    let (path, query) = match endpoint.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (endpoint, None),
    };
    let path = path.replacen(API_PREFIX, "", 1);

    match query {
        Some(q) => format!("{}?{}", path, q),
        None => path,
    }
}

#[derive(Debug, Serialize)]
struct CompletenessQuery<'a> {
    days_back: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stock_code: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SmartBatchQuery {
    days_back: u32,
    force_refresh: bool,
}

/// One exchange call suggested by the smart batch analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmartApiCall {
    pub date: String,
    pub api_endpoint: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchProgress {
    /// 1-based position of the item about to be processed
    pub current: usize,
    pub total: usize,
    pub date: String,
    pub percentage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
}

impl BatchProgress {
    fn new(current: usize, total: usize, date: &str, current_action: Option<String>) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (current as f64 / total as f64 * 100.0).round() as u32
        };

        Self {
            current,
            total,
            date: date.to_string(),
            percentage,
            current_action,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DateUpdateResult {
    pub date: String,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl DateUpdateResult {
    fn from_outcome(date: &str, outcome: SdkResult<Value>) -> Self {
        match outcome {
            Ok(result) => Self {
                date: date.to_string(),
                success: true,
                result: Some(result),
                error: None,
            },
            Err(e) => Self {
                date: date.to_string(),
                success: false,
                result: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchUpdateSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<DateUpdateResult>,
}

impl BatchUpdateSummary {
    fn from_results(results: Vec<DateUpdateResult>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_status() {
        let ok = unwrap_status(json!({"status": "success", "data": {"n": 1}}), "x").unwrap();
        assert_eq!(ok, json!({"n": 1}));

        let err = unwrap_status(json!({"status": "error", "message": "no calendar"}), "x")
            .unwrap_err();
        assert_eq!(err.to_string(), "no calendar");

        let err = unwrap_status(json!({"status": "error"}), "fallback").unwrap_err();
        assert_eq!(err.to_string(), "fallback");
    }

    #[test]
    fn test_relative_endpoint() {
        assert_eq!(
            relative_endpoint("/api/v1/twse/historical-all/20240105?save_to_db=true"),
            "/twse/historical-all/20240105?save_to_db=true"
        );
        assert_eq!(
            relative_endpoint("/twse/historical-all/20240105"),
            "/twse/historical-all/20240105"
        );
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(BatchProgress::new(1, 3, "2024-01-02", None).percentage, 33);
        assert_eq!(BatchProgress::new(2, 3, "2024-01-03", None).percentage, 67);
        assert_eq!(BatchProgress::new(3, 3, "2024-01-04", None).percentage, 100);
    }

    #[test]
    fn test_compact_date() {
        assert_eq!(compact_date("2024-01-05"), "20240105");
        assert_eq!(compact_date("20240105"), "20240105");
    }
}
