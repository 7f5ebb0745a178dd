//! Manual task execution client
//!
//! Keeps a [`TaskSnapshot`] of the running and recent tasks. Every call that
//! changes server-side task state refreshes it afterwards, and the client
//! doubles as the [`TaskSource`] for the completion poller.

use crate::client::HttpClient;
use crate::error::SdkResult;
use crate::polling::{start_polling, PollHandle, TaskSource};
use crate::state::OperationState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use stock_dashboard_core::{RawTask, TaskDetails, TaskHistoryEntry, TaskId, TaskRecord, TaskSnapshot};
use tokio::sync::RwLock;
use tracing::warn;

/// Size of the recent-history window requested on each refresh.
pub const RECENT_TASK_LIMIT: u32 = 50;

const CANCEL_REASON: &str = "cancelled by user";

/// Client for manual task operations
#[derive(Debug, Clone)]
pub struct TasksClient {
    client: Arc<HttpClient>,
    state: Arc<OperationState>,
    snapshot: Arc<RwLock<TaskSnapshot>>,
}

impl TasksClient {
    /// Create a new tasks client
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            state: Arc::new(OperationState::new()),
            snapshot: Arc::new(RwLock::new(TaskSnapshot::default())),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.last_error()
    }

    pub async fn running_tasks(&self) -> Vec<TaskRecord> {
        self.snapshot.read().await.running_tasks.clone()
    }

    pub async fn task_history(&self) -> Vec<TaskHistoryEntry> {
        self.snapshot.read().await.task_history.clone()
    }

    pub async fn snapshot(&self) -> TaskSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Fetches running and recent tasks and replaces the snapshot. If either
    /// list fails to load the error is returned and the snapshot is untouched.
    pub async fn get_manual_tasks(&self) -> SdkResult<TaskSnapshot> {
        self.state.track(self.load_snapshot()).await
    }

    /// Starts a stock crawl, for `symbols` or for every stock when `None`.
    pub async fn create_stock_crawl_task(&self, symbols: Option<&[String]>) -> SdkResult<Value> {
        let payload = match symbols {
            Some(symbols) => json!({ "symbols": symbols }),
            None => json!({}),
        };
        self.mutate("/tasks/manual/stock-crawl", Some(&payload)).await
    }

    pub async fn create_optimized_stock_crawl_task(
        &self,
        options: &OptimizedCrawlOptions,
    ) -> SdkResult<Value> {
        self.mutate("/tasks/manual/optimized-stock-crawl", Some(options))
            .await
    }

    pub async fn create_sequential_stock_crawl_task(
        &self,
        options: &SequentialCrawlOptions,
    ) -> SdkResult<Value> {
        self.mutate("/tasks/manual/sequential-stock-crawl", Some(options))
            .await
    }

    pub async fn cancel_task(&self, task_id: TaskId) -> SdkResult<Value> {
        self.mutate(
            &format!("/task-execution/cancel/{}", task_id),
            Some(&json!({ "reason": CANCEL_REASON })),
        )
        .await
    }

    pub async fn get_task_details(&self, task_id: TaskId) -> SdkResult<TaskDetails> {
        self.state
            .track(async {
                let data = self
                    .client
                    .get(&format!("/task-execution/status/{}", task_id))
                    .await
                    .into_result()?;
                let task = match data.get("task") {
                    Some(task) => task.clone(),
                    None => data,
                };
                let raw: RawTask = serde_json::from_value(task)?;
                Ok(raw.to_details())
            })
            .await
    }

    pub async fn clear_completed_tasks(&self) -> SdkResult<Value> {
        self.mutate::<Value>("/tasks/manual/clear-completed", None)
            .await
    }

    /// Polls every `poll_interval` and calls `on_completed` with the ids of
    /// tasks that stopped running.
    pub fn start_task_polling<F>(&self, on_completed: F) -> PollHandle
    where
        F: FnMut(Vec<TaskId>) + Send + 'static,
    {
        start_polling(
            Arc::new(self.clone()),
            self.client.config().poll_interval,
            on_completed,
        )
    }

    /// POSTs and, on success, refreshes the snapshot before returning.
    async fn mutate<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> SdkResult<Value> {
        self.state
            .track(async {
                let data = self.client.post(path, body).await.into_result()?;
                self.load_snapshot().await?;
                Ok(data)
            })
            .await
    }

    async fn load_snapshot(&self) -> SdkResult<TaskSnapshot> {
        let running = self
            .fetch_list("/task-execution/running", None, "running_tasks")
            .await?;
        let recent = self
            .fetch_list("/task-execution/recent", Some(RECENT_TASK_LIMIT), "tasks")
            .await?;

        let snapshot = TaskSnapshot::from_raw(&running, &recent);
        *self.snapshot.write().await = snapshot.clone();
        Ok(snapshot)
    }

    async fn fetch_list(&self, path: &str, limit: Option<u32>, field: &str) -> SdkResult<Vec<RawTask>> {
        let envelope = match limit {
            Some(limit) => self.client.get_with_query(path, &[("limit", limit)]).await,
            None => self.client.get(path).await,
        };

        let data = envelope.into_result().map_err(|e| {
            warn!(path, error = %e, "Task list unavailable, keeping previous snapshot");
            e
        })?;
        match data.get(field) {
            Some(items) if !items.is_null() => Ok(serde_json::from_value(items.clone())?),
            _ => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl TaskSource for TasksClient {
    async fn running_ids(&self) -> BTreeSet<TaskId> {
        self.snapshot.read().await.running_ids()
    }

    async fn refresh(&self) -> SdkResult<()> {
        self.get_manual_tasks().await.map(|_| ())
    }
}

/// Parameters of the parallel crawl with skip and batching optimisations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizedCrawlOptions {
    pub symbols: Option<Vec<String>>,
    pub max_workers: u32,
    pub batch_size: u32,
    pub enable_smart_skip: bool,
    pub enable_batch_db_operations: bool,
    pub smart_skip_days: u32,
}

impl Default for OptimizedCrawlOptions {
    fn default() -> Self {
        Self {
            symbols: None,
            max_workers: 4,
            batch_size: 50,
            enable_smart_skip: true,
            enable_batch_db_operations: true,
            smart_skip_days: 1,
        }
    }
}

/// Parameters of the one-stock-at-a-time crawl that pauses under load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequentialCrawlOptions {
    pub symbols: Option<Vec<String>>,
    pub batch_size: u32,
    /// Seconds
    pub delay_between_stocks: f64,
    /// Seconds
    pub delay_between_batches: f64,
    /// Percent
    pub cpu_threshold: f64,
    /// Percent
    pub memory_threshold: f64,
    pub auto_pause_on_overload: bool,
}

impl Default for SequentialCrawlOptions {
    fn default() -> Self {
        Self {
            symbols: None,
            batch_size: 477,
            delay_between_stocks: 0.5,
            delay_between_batches: 10.0,
            cpu_threshold: 80.0,
            memory_threshold: 85.0,
            auto_pause_on_overload: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimized_defaults_serialize() {
        let body = serde_json::to_value(OptimizedCrawlOptions::default()).unwrap();
        assert_eq!(
            body,
            json!({
                "symbols": null,
                "max_workers": 4,
                "batch_size": 50,
                "enable_smart_skip": true,
                "enable_batch_db_operations": true,
                "smart_skip_days": 1
            })
        );
    }

    #[test]
    fn test_sequential_defaults() {
        let options = SequentialCrawlOptions::default();
        assert_eq!(options.batch_size, 477);
        assert_eq!(options.delay_between_batches, 10.0);
        assert!(options.auto_pause_on_overload);
    }
}
