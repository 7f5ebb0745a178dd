use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stock_dashboard_core::{TaskId, TaskStatus};
use stock_dashboard_sdk::{PollState, SdkConfig, StockDashboardClient};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> StockDashboardClient {
    let config = SdkConfig::new(format!("{}/api/v1", server.uri()))
        .with_crawler_url(server.uri())
        .with_poll_interval(Duration::from_millis(50));
    StockDashboardClient::new(config).unwrap()
}

async fn mount_running(server: &MockServer, tasks: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/task-execution/running"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "running_tasks": tasks })))
        .mount(server)
        .await;
}

async fn mount_recent(server: &MockServer, tasks: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/task-execution/recent"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tasks": tasks })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_manual_tasks_snapshot() {
    let server = MockServer::start().await;
    mount_running(
        &server,
        json!([{
            "id": 12,
            "task_name": "daily crawl",
            "status": "running",
            "start_time": "2024-03-01T09:30:00",
            "processed_count": 40,
            "total_count": 100,
            "progress": 40.0
        }]),
    )
    .await;
    mount_recent(
        &server,
        json!([{
            "id": 9,
            "task_name": "ma calc",
            "status": "completed",
            "duration_seconds": 61.6,
            "success_count": 10,
            "error_count": 1
        }]),
    )
    .await;

    let client = client_for(&server);
    let snapshot = client.tasks().get_manual_tasks().await.unwrap();

    let running = &snapshot.running_tasks[0];
    assert_eq!(running.id, TaskId(12));
    assert_eq!(running.start_time, "2024/03/01 09:30:00");
    assert_eq!(running.execution_time, "calculating...");
    assert_eq!(running.current_step, "running...");
    assert_eq!(running.progress.current, 40);

    let history = &snapshot.task_history[0];
    assert_eq!(history.status, TaskStatus::Completed);
    assert_eq!(history.task_type, "manual");
    assert_eq!(history.execution_time, "62s");
    assert_eq!(history.failure_count, 1);

    assert_eq!(client.tasks().running_tasks().await, snapshot.running_tasks);
}

#[tokio::test]
async fn test_failing_half_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/task-execution/recent"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_running(&server, json!([{"id": 1, "task_name": "crawl", "status": "running"}])).await;

    let client = client_for(&server);
    let tasks = client.tasks();

    assert!(tasks.get_manual_tasks().await.is_err());
    assert!(tasks.last_error().is_some());
    assert!(tasks.running_tasks().await.is_empty());
    assert!(!tasks.is_loading());
}

#[tokio::test]
async fn test_failed_refresh_does_not_clear_snapshot() {
    let server = MockServer::start().await;
    mount_running(&server, json!([{"id": 1, "task_name": "crawl", "status": "running"}])).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/task-execution/recent"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tasks": [] })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/task-execution/recent"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tasks = client.tasks();
    tasks.get_manual_tasks().await.unwrap();
    assert_eq!(tasks.running_tasks().await.len(), 1);
    assert!(tasks.last_error().is_none());

    assert!(tasks.get_manual_tasks().await.is_err());
    assert!(tasks.last_error().is_some());
    let running = tasks.running_tasks().await;
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, TaskId(1));
}

#[tokio::test]
async fn test_create_crawl_task_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/manual/stock-crawl"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": 33})))
        .expect(1)
        .mount(&server)
        .await;
    mount_running(&server, json!([{"id": 33, "task_name": "stock crawl", "status": "running"}])).await;
    mount_recent(&server, json!([])).await;

    let client = client_for(&server);
    let data = client.tasks().create_stock_crawl_task(None).await.unwrap();

    assert_eq!(data, json!({"task_id": 33}));
    assert_eq!(client.tasks().running_tasks().await[0].id, TaskId(33));
}

#[tokio::test]
async fn test_create_crawl_task_for_symbols() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/manual/stock-crawl"))
        .and(body_json(json!({"symbols": ["2330", "2317"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": 34})))
        .expect(1)
        .mount(&server)
        .await;
    mount_running(&server, json!([])).await;
    mount_recent(&server, json!([])).await;

    let symbols = vec!["2330".to_string(), "2317".to_string()];
    let result = client_for(&server)
        .tasks()
        .create_stock_crawl_task(Some(&symbols))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cancel_task_sends_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/task-execution/cancel/7"))
        .and(body_json(json!({"reason": "cancelled by user"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cancelled": true})))
        .expect(1)
        .mount(&server)
        .await;
    mount_running(&server, json!([])).await;
    mount_recent(&server, json!([])).await;

    let result = client_for(&server).tasks().cancel_task(TaskId(7)).await;
    assert_eq!(result.unwrap(), json!({"cancelled": true}));
}

#[tokio::test]
async fn test_rejected_mutation_skips_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/manual/clear-completed"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "locked"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/task-execution/running"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"running_tasks": []})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.tasks().clear_completed_tasks().await.is_err());
    assert_eq!(
        client.tasks().last_error().as_deref(),
        Some("API error: 500 - locked")
    );
}

#[tokio::test]
async fn test_task_details_reads_nested_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/task-execution/status/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task": {
                "id": 5,
                "task_name": "history backfill",
                "task_type": "scheduled",
                "status": "failed",
                "error_message": "broker refused",
                "parameters": {"symbols": ["2330"]}
            }
        })))
        .mount(&server)
        .await;

    let details = client_for(&server)
        .tasks()
        .get_task_details(TaskId(5))
        .await
        .unwrap();

    assert_eq!(details.name, "history backfill");
    assert_eq!(details.status, TaskStatus::Failed);
    assert_eq!(details.error_message.as_deref(), Some("broker refused"));
    assert_eq!(details.parameters, Some(json!({"symbols": ["2330"]})));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_polling_reports_finished_task_then_stops() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/task-execution/running"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "running_tasks": [{"id": 21, "task_name": "crawl", "status": "running"}]
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_running(&server, json!([])).await;
    mount_recent(&server, json!([])).await;

    let client = client_for(&server);
    client.tasks().get_manual_tasks().await.unwrap();
    assert_eq!(client.tasks().running_tasks().await.len(), 1);

    let completed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&completed);
    let handle = client
        .tasks()
        .start_task_polling(move |ids| sink.lock().unwrap().extend(ids));

    tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("poller should stop once nothing is running");

    assert_eq!(*completed.lock().unwrap(), vec![TaskId(21)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_polling_cancel() {
    let server = MockServer::start().await;
    mount_running(&server, json!([{"id": 3, "task_name": "crawl", "status": "running"}])).await;
    mount_recent(&server, json!([])).await;

    let client = client_for(&server);
    client.tasks().get_manual_tasks().await.unwrap();

    let handle = client.tasks().start_task_polling(|_| panic!("task 3 never finishes"));
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(handle.state(), PollState::Polling);

    handle.cancel();
    assert!(handle.is_cancelled());
    handle.wait().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_polling_through_outage_reports_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/task-execution/running"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "running_tasks": [{"id": 7, "task_name": "crawl", "status": "running"}]
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/task-execution/running"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_recent(&server, json!([])).await;

    let client = client_for(&server);
    client.tasks().get_manual_tasks().await.unwrap();

    let completed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&completed);
    let handle = client
        .tasks()
        .start_task_polling(move |ids| sink.lock().unwrap().extend(ids));

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(handle.state(), PollState::Polling);
    assert!(completed.lock().unwrap().is_empty());
    assert_eq!(client.tasks().running_tasks().await.len(), 1);
    assert!(client.tasks().last_error().is_some());

    handle.cancel();
    handle.wait().await;
}
