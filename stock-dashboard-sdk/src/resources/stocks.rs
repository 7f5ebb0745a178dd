//! Stocks resource client
//!
//! Stock list synchronisation, per-symbol history and update triggers.

use crate::client::{paginate, HttpClient, PageParams};
use crate::error::SdkResult;
use crate::state::OperationState;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use urlencoding::encode;

/// Client for stock operations
#[derive(Debug, Clone)]
pub struct StocksClient {
    client: Arc<HttpClient>,
    state: Arc<OperationState>,
    stocks: Arc<RwLock<Vec<Value>>>,
}

impl StocksClient {
    /// Create a new stocks client
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            state: Arc::new(OperationState::new()),
            stocks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.last_error()
    }

    /// Stock list cached by the last successful [`get_stock_list`](Self::get_stock_list).
    pub async fn stocks(&self) -> Vec<Value> {
        self.stocks.read().await.clone()
    }

    pub async fn get_stock_count(&self) -> SdkResult<Value> {
        self.state
            .track(async { self.client.get("/sync/stocks/count").await.into_result() })
            .await
    }

    /// Syncs the stock list from the exchange.
    pub async fn sync_stock_list(&self) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .post::<Value>("/sync/stocks", None)
                    .await
                    .into_result()
            })
            .await
    }

    /// Crawls the exchange listing and syncs it.
    pub async fn crawl_stock_list(&self) -> SdkResult<Value> {
        self.state
            .track(async { self.client.get("/sync/stocks/crawl").await.into_result() })
            .await
    }

    pub async fn validate_symbol(&self, symbol: &str) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .get(&format!("/sync/stocks/validate/{}", encode(symbol)))
                    .await
                    .into_result()
            })
            .await
    }

    pub async fn get_stock_list(&self, params: &StockListParams) -> SdkResult<Value> {
        self.state
            .track(async {
                let data = self
                    .client
                    .get_with_query("/data/stocks", params)
                    .await
                    .into_result()?;

                let list = match data.get("stocks") {
                    Some(Value::Array(items)) => items.clone(),
                    _ => match &data {
                        Value::Array(items) => items.clone(),
                        _ => Vec::new(),
                    },
                };
                *self.stocks.write().await = list;

                Ok(data)
            })
            .await
    }

    pub async fn get_stock_history(
        &self,
        symbol: &str,
        params: &HistoryParams,
    ) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .get_with_query(&format!("/data/history/{}", encode(symbol)), params)
                    .await
                    .into_result()
            })
            .await
    }

    pub async fn get_stock_stats(&self, symbol: &str) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .get(&format!("/data/history/{}/stats", encode(symbol)))
                    .await
                    .into_result()
            })
            .await
    }

    pub async fn get_latest_trade_date(&self, symbol: &str) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .get(&format!("/data/history/{}/latest-date", encode(symbol)))
                    .await
                    .into_result()
            })
            .await
    }

    pub async fn get_overall_stats(&self) -> SdkResult<Value> {
        self.state
            .track(async { self.client.get("/data/history/overview").await.into_result() })
            .await
    }

    /// Queues a background data update for one symbol.
    pub async fn update_stock_data(&self, symbol: &str) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .post::<Value>(&format!("/stocks/{}/update", encode(symbol)), None)
                    .await
                    .into_result()
            })
            .await
    }

    pub async fn update_all_stock_data(&self) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .post::<Value>("/stocks/update-all", None)
                    .await
                    .into_result()
            })
            .await
    }

    pub async fn batch_update_daily(&self, symbols: &[String]) -> SdkResult<Value> {
        self.state
            .track(async {
                self.client
                    .post("/data/daily/batch-update", Some(&json!({ "symbols": symbols })))
                    .await
                    .into_result()
            })
            .await
    }

    /// Every stock that has stored history, walking all pages.
    pub async fn get_all_stocks_with_data(
        &self,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
    ) -> SdkResult<Vec<StockWithData>> {
        let page_size = self.client.config().page_size;

        self.state
            .track(paginate(page_size, |page| {
                let params = PageParams::new(page, page_size).with_sort(
                    sort_by.map(str::to_string),
                    sort_order.map(str::to_string),
                );
                async move {
                    let data = self
                        .client
                        .get_with_query("/data/history/stocks-with-data", &params)
                        .await
                        .into_result()?;
                    let stocks = data.get("stocks").cloned().unwrap_or(Value::Array(Vec::new()));
                    Ok(serde_json::from_value::<Vec<StockWithData>>(stocks)?)
                }
            }))
            .await
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct StockListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct HistoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

impl HistoryParams {
    pub fn between(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: Some(start_date.into()),
            end_date: Some(end_date.into()),
            ..Default::default()
        }
    }
}

/// Summary of one stock that has stored daily history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockWithData {
    pub stock_code: String,
    #[serde(default)]
    pub stock_name: Option<String>,
    #[serde(default)]
    pub record_count: u64,
    #[serde(default)]
    pub earliest_date: Option<String>,
    #[serde(default)]
    pub latest_date: Option<String>,
    #[serde(default)]
    pub avg_close_price: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub data_period_days: Option<i64>,
}
