use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::ids::TaskId;

const START_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
const PLACEHOLDER: &str = "-";
const CALCULATING: &str = "calculating...";
const RUNNING_STEP: &str = "running...";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    #[default]
    Unknown,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Task execution entity as the task-execution endpoints return it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RawTask {
    pub id: TaskId,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub processed_count: Option<u64>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub success_count: Option<u64>,
    #[serde(default)]
    pub error_count: Option<u64>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub result_summary: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaskProgress {
    pub current: u64,
    pub total: u64,
    pub percent: f64,
}

/// Display projection of a running task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub start_time: String,
    pub execution_time: String,
    pub estimated_remaining: String,
    pub current_step: String,
    pub progress: TaskProgress,
    pub recent_items: Vec<String>,
}

/// Display projection of a task from the recent-history window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskHistoryEntry {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub task_type: String,
    pub start_time: String,
    pub execution_time: String,
    pub processed_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDetails {
    pub id: TaskId,
    pub name: String,
    pub task_type: Option<String>,
    pub status: TaskStatus,
    pub progress: Option<f64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_seconds: Option<f64>,
    pub processed_count: Option<u64>,
    pub total_count: Option<u64>,
    pub success_count: Option<u64>,
    pub error_count: Option<u64>,
    pub parameters: Option<serde_json::Value>,
    pub result_summary: Option<String>,
    pub error_message: Option<String>,
    pub created_by: Option<String>,
}

impl RawTask {
    pub fn new(id: impl Into<TaskId>, task_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task_name: task_name.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn to_running_record(&self) -> TaskRecord {
        TaskRecord {
            id: self.id,
            name: self.task_name.clone(),
            description: self.task_name.clone(),
            status: self.status,
            start_time: format_start_time(self.start_time.as_deref()),
            execution_time: format_duration(self.duration_seconds)
                .unwrap_or_else(|| CALCULATING.to_string()),
            estimated_remaining: CALCULATING.to_string(),
            current_step: self
                .result_summary
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| RUNNING_STEP.to_string()),
            progress: TaskProgress {
                current: self.processed_count.unwrap_or(0),
                total: self.total_count.unwrap_or(0),
                percent: self.progress.unwrap_or(0.0),
            },
            recent_items: Vec::new(),
        }
    }

    pub fn to_history_entry(&self) -> TaskHistoryEntry {
        TaskHistoryEntry {
            id: self.id,
            name: self.task_name.clone(),
            description: self.task_name.clone(),
            status: self.status,
            task_type: self
                .task_type
                .clone()
                .unwrap_or_else(|| "manual".to_string()),
            start_time: format_start_time(self.start_time.as_deref()),
            execution_time: format_duration(self.duration_seconds)
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            processed_count: self.processed_count.unwrap_or(0),
            success_count: self.success_count.unwrap_or(0),
            failure_count: self.error_count.unwrap_or(0),
            error_message: self.error_message.clone(),
        }
    }

    pub fn to_details(&self) -> TaskDetails {
        TaskDetails {
            id: self.id,
            name: self.task_name.clone(),
            task_type: self.task_type.clone(),
            status: self.status,
            progress: self.progress,
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            duration_seconds: self.duration_seconds,
            processed_count: self.processed_count,
            total_count: self.total_count,
            success_count: self.success_count,
            error_count: self.error_count,
            parameters: self.parameters.clone(),
            result_summary: self.result_summary.clone(),
            error_message: self.error_message.clone(),
            created_by: self.created_by.clone(),
        }
    }
}

/// Task lists as of the most recent refresh. Rebuilt wholesale every time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaskSnapshot {
    pub running_tasks: Vec<TaskRecord>,
    pub task_history: Vec<TaskHistoryEntry>,
}

impl TaskSnapshot {
    pub fn from_raw(running: &[RawTask], recent: &[RawTask]) -> Self {
        Self {
            running_tasks: running.iter().map(RawTask::to_running_record).collect(),
            task_history: recent.iter().map(RawTask::to_history_entry).collect(),
        }
    }

    pub fn running_ids(&self) -> BTreeSet<TaskId> {
        self.running_tasks.iter().map(|t| t.id).collect()
    }
}

/// Ids present in `before` and missing from `after`, ascending.
pub fn disappeared_ids(before: &BTreeSet<TaskId>, after: &BTreeSet<TaskId>) -> Vec<TaskId> {
    before.difference(after).copied().collect()
}

/// Renders a server timestamp for display; `-` when absent, raw text when unparseable.
pub fn format_start_time(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return PLACEHOLDER.to_string();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(START_TIME_FORMAT).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format(START_TIME_FORMAT).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return dt.format(START_TIME_FORMAT).to_string();
    }
    raw.to_string()
}

/// Whole seconds, e.g. `42s`. Zero and missing durations have no rendering.
pub fn format_duration(seconds: Option<f64>) -> Option<String> {
    seconds
        .filter(|s| *s > 0.0 && s.is_finite())
        .map(|s| format!("{:.0}s", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_running_record_defaults() {
        let raw = RawTask::new(7, "daily crawl").with_status(TaskStatus::Running);
        let record = raw.to_running_record();

        assert_eq!(record.id, TaskId(7));
        assert_eq!(record.start_time, "-");
        assert_eq!(record.execution_time, "calculating...");
        assert_eq!(record.current_step, "running...");
        assert_eq!(record.progress, TaskProgress::default());
    }

    #[test]
    fn test_history_entry_formatting() {
        let raw = RawTask {
            duration_seconds: Some(41.6),
            start_time: Some("2025-03-01T09:30:00".to_string()),
            processed_count: Some(10),
            error_count: Some(2),
            ..RawTask::new(3, "ma calc")
        };
        let entry = raw.to_history_entry();

        assert_eq!(entry.execution_time, "42s");
        assert_eq!(entry.start_time, "2025/03/01 09:30:00");
        assert_eq!(entry.task_type, "manual");
        assert_eq!(entry.failure_count, 2);
    }

    #[test]
    fn test_unknown_status_deserializes() {
        let raw: RawTask =
            serde_json::from_str(r#"{"id": 1, "task_name": "x", "status": "paused"}"#).unwrap();
        assert_eq!(raw.status, TaskStatus::Unknown);
    }

    #[test]
    fn test_disappeared_ids() {
        let before: BTreeSet<TaskId> = [TaskId(1), TaskId(2)].into_iter().collect();
        let after: BTreeSet<TaskId> = [TaskId(2), TaskId(5)].into_iter().collect();
        assert_eq!(disappeared_ids(&before, &after), vec![TaskId(1)]);
    }
}
