//! Moving averages resource client

use crate::client::HttpClient;
use crate::error::SdkResult;
use crate::state::OperationState;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use urlencoding::encode;

/// Periods calculated when the caller does not pick any.
pub const DEFAULT_PERIODS: [u32; 6] = [5, 10, 24, 72, 120, 240];

/// Stocks per batch for background calculations.
pub const DEFAULT_BATCH_SIZE: u32 = 50;

/// Client for moving average operations
#[derive(Debug, Clone)]
pub struct MovingAveragesClient {
    client: Arc<HttpClient>,
    state: Arc<OperationState>,
}

impl MovingAveragesClient {
    /// Create a new moving averages client
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

    pub async fn statistics(&self) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .get("/moving-averages/statistics")
                    .await
                    .into_result()
            })
            .await
    }

    /// Calculates synchronously. An empty `periods` slice means
    /// [`DEFAULT_PERIODS`].
    pub async fn calculate(
        &self,
        stock_codes: &[String],
        periods: &[u32],
        force_recalculate: bool,
    ) -> SdkResult<Value> {
        let request = json!({
            "stock_codes": stock_codes,
            "periods": periods_or_default(periods),
            "force_recalculate": force_recalculate,
        });

        self.state
            .track(async {
                self.client
                    .post("/moving-averages/calculate", Some(&request))
                    .await
                    .into_result()
            })
            .await
    }

    pub async fn query(&self, stock_code: &str, params: &MaQueryParams) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .get_with_query(&format!("/moving-averages/query/{}", encode(stock_code)), params)
                    .await
                    .into_result()
            })
            .await
    }

    pub async fn validate(&self) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .get("/moving-averages/validate")
                    .await
                    .into_result()
            })
            .await
    }

    /// Removes every stored moving average.
    pub async fn clear(&self) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .post("/moving-averages/clear", Some(&json!({})))
                    .await
                    .into_result()
            })
            .await
    }

    /// Queues a background calculation and returns the server's task info.
    pub async fn start_async_calculation(&self, request: &AsyncCalculation) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .post("/moving-averages/calculate-async", Some(request))
                    .await
                    .into_result()
            })
            .await
    }

    pub async fn start_single_stock_async_calculation(
        &self,
        stock_code: &str,
        periods: &[u32],
        force_recalculate: bool,
    ) -> SdkResult<Value> {
        let request = AsyncCalculation {
            stock_codes: Some(vec![stock_code.to_string()]),
            periods: periods_or_default(periods),
            force_recalculate,
            ..Default::default()
        };
        self.start_async_calculation(&request).await
    }

    pub async fn task_status(&self, task_id: &str) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .get(&format!("/moving-averages/task-status/{}", encode(task_id)))
                    .await
                    .into_result()
            })
            .await
    }

    pub async fn cancel_task(&self, task_id: &str) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .delete(&format!("/moving-averages/task/{}", encode(task_id)))
                    .await
                    .into_result()
            })
            .await
    }
}

fn periods_or_default(periods: &[u32]) -> Vec<u32> {
    if periods.is_empty() {
        DEFAULT_PERIODS.to_vec()
    } else {
        periods.to_vec()
    }
}

/// Body of `POST /moving-averages/calculate-async`. `stock_codes: None` is
/// sent as `null` and means every stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AsyncCalculation {
    pub stock_codes: Option<Vec<String>>,
    pub periods: Vec<u32>,
    pub force_recalculate: bool,
    pub batch_size: u32,
}

impl Default for AsyncCalculation {
    fn default() -> Self {
        Self {
            stock_codes: None,
            periods: DEFAULT_PERIODS.to_vec(),
            force_recalculate: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct MaQueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Comma separated period list, e.g. `5,10,24`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_request_defaults() {
        let body = serde_json::to_value(AsyncCalculation::default()).unwrap();
        assert_eq!(
            body,
            json!({
                "stock_codes": null,
                "periods": [5, 10, 24, 72, 120, 240],
                "force_recalculate": false,
                "batch_size": 50
            })
        );
    }

    #[test]
    fn test_empty_periods_fall_back() {
        assert_eq!(periods_or_default(&[]), DEFAULT_PERIODS.to_vec());
        assert_eq!(periods_or_default(&[5]), vec![5]);
    }
}
