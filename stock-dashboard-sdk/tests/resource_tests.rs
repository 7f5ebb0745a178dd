use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use std::time::Duration;
use stock_dashboard_sdk::{
    AsyncCalculation, BatchProgress, SdkConfig, SdkError, SmartApiCall, StockDashboardClient,
};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> StockDashboardClient {
    StockDashboardClient::builder(format!("{}/api/v1", server.uri()))
        .with_crawler_url(server.uri())
        .build()
        .unwrap()
}

fn client_with_page_size(server: &MockServer, page_size: u32) -> StockDashboardClient {
    let config = SdkConfig::new(format!("{}/api/v1", server.uri()))
        .with_crawler_url(server.uri())
        .with_page_size(page_size);
    StockDashboardClient::new(config).unwrap()
}

fn stock_rows(offset: usize, count: usize) -> serde_json::Value {
    let rows: Vec<_> = (offset..offset + count)
        .map(|i| json!({"stock_code": format!("{:04}", i), "record_count": 10}))
        .collect();
    json!({ "stocks": rows })
}

#[tokio::test]
async fn test_stock_list_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/data/stocks"))
        .and(query_param("market", "TSE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stocks": [{"symbol": "2330"}, {"symbol": "2317"}],
            "total": 2
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = stock_dashboard_sdk::StockListParams {
        market: Some("TSE".to_string()),
        ..Default::default()
    };
    let data = client.stocks().get_stock_list(&params).await.unwrap();

    assert_eq!(data["total"], json!(2));
    assert_eq!(client.stocks().stocks().await.len(), 2);
}

#[tokio::test]
async fn test_all_stocks_with_data_walks_pages() {
    let server = MockServer::start().await;
    for (page, rows) in [(1, 3), (2, 3), (3, 1)] {
        Mock::given(method("GET"))
            .and(path("/api/v1/data/history/stocks-with-data"))
            .and(query_param("page", page.to_string()))
            .and(query_param("limit", "3"))
            .and(query_param("sort_by", "stock_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stock_rows((page - 1) * 3, rows)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_with_page_size(&server, 3);
    let stocks = client
        .stocks()
        .get_all_stocks_with_data(Some("stock_code"), None)
        .await
        .unwrap();

    assert_eq!(stocks.len(), 7);
    assert_eq!(stocks[6].stock_code, "0006");
}

#[tokio::test]
async fn test_failed_call_sets_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/stocks/2330/update"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"detail": "Update already running"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.stocks().update_stock_data("2330").await.unwrap_err();

    assert_eq!(err.status_code(), Some(409));
    assert_eq!(
        client.stocks().last_error().as_deref(),
        Some("API error: 409 - Update already running")
    );
    assert!(!client.stocks().is_loading());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_loading_held_until_last_call_finishes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sync/stocks/count"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"count": 1}))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/data/history/overview"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"total_records": 1}))
                .set_delay(Duration::from_millis(600)),
        )
        .mount(&server)
        .await;

    let stocks = client_for(&server).stocks().clone();

    let fast = tokio::spawn({
        let stocks = stocks.clone();
        async move { stocks.get_stock_count().await }
    });
    let slow = tokio::spawn({
        let stocks = stocks.clone();
        async move { stocks.get_overall_stats().await }
    });

    assert_ok!(fast.await.unwrap());
    assert!(stocks.is_loading());

    assert_ok!(slow.await.unwrap());
    assert!(!stocks.is_loading());
}

#[tokio::test]
async fn test_moving_average_async_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/moving-averages/calculate-async"))
        .and(body_json(json!({
            "stock_codes": ["2330"],
            "periods": [5, 10, 24, 72, 120, 240],
            "force_recalculate": true,
            "batch_size": 50
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "ma-7"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/moving-averages/calculate-async"))
        .and(body_json(serde_json::to_value(AsyncCalculation::default()).unwrap()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "ma-8"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let single = client
        .moving_averages()
        .start_single_stock_async_calculation("2330", &[], true)
        .await
        .unwrap();
    assert_eq!(single["task_id"], json!("ma-7"));

    let all = client
        .moving_averages()
        .start_async_calculation(&AsyncCalculation::default())
        .await
        .unwrap();
    assert_eq!(all["task_id"], json!("ma-8"));
}

#[tokio::test]
async fn test_moving_average_cancel_uses_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/moving-averages/task/ma-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cancelled": true})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server).moving_averages().cancel_task("ma-7").await;
    assert_ok!(result);
}

#[tokio::test]
async fn test_missing_summary_unwraps_nested_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/trading-days/missing-summary"))
        .and(query_param("days_back", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {"missing_days": ["2024-01-05"]}
        })))
        .mount(&server)
        .await;

    let data = client_for(&server)
        .trading_days()
        .missing_summary(30)
        .await
        .unwrap();

    assert_eq!(data, json!({"missing_days": ["2024-01-05"]}));
}

#[tokio::test]
async fn test_smart_analysis_returns_statistics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/trading-days/smart-analysis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {"statistics": {"total_missing_days": 4}}
        })))
        .mount(&server)
        .await;

    let data = client_for(&server)
        .trading_days()
        .smart_analysis()
        .await
        .unwrap();

    assert_eq!(data["statistics"]["total_missing_days"], json!(4));
}

#[rstest]
#[case(json!({"status": "error", "message": "calendar unavailable"}), "calendar unavailable")]
#[case(json!({"status": "error"}), "Smart analysis failed")]
#[tokio::test]
async fn test_nested_failure_is_business_error(
    #[case] body: serde_json::Value,
    #[case] expected: &str,
) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/trading-days/smart-analysis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.trading_days().smart_analysis().await.unwrap_err();

    assert!(matches!(err, SdkError::Business { .. }));
    assert_eq!(err.to_string(), expected);
    assert_eq!(client.trading_days().last_error().as_deref(), Some(expected));
}

#[tokio::test]
async fn test_batch_update_records_each_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/twse/historical-all/20240102"))
        .and(query_param("save_to_db", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"saved": 950})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/twse/historical-all/20240103"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({"detail": "exchange timeout"})))
        .mount(&server)
        .await;

    let dates = vec!["2024-01-02".to_string(), "2024-01-03".to_string()];
    let mut progress: Vec<BatchProgress> = Vec::new();

    let summary = client_for(&server)
        .trading_days()
        .batch_update_missing_dates(&dates, Duration::ZERO, |p| progress.push(p.clone()))
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.results[0].result, Some(json!({"saved": 950})));
    assert_eq!(
        summary.results[1].error.as_deref(),
        Some("API error: 502 - exchange timeout")
    );

    let seen: Vec<(usize, u32)> = progress.iter().map(|p| (p.current, p.percentage)).collect();
    assert_eq!(seen, vec![(1, 50), (2, 100)]);
}

#[tokio::test]
async fn test_smart_batch_strips_api_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/twse/historical-all/20240105"))
        .and(query_param("save_to_db", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"saved": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let calls = vec![SmartApiCall {
        date: "2024-01-05".to_string(),
        api_endpoint: "/api/v1/twse/historical-all/20240105?save_to_db=true".to_string(),
    }];
    let mut actions = Vec::new();

    let summary = client_for(&server)
        .trading_days()
        .execute_smart_batch_update(&calls, Duration::ZERO, |p| {
            actions.push(p.current_action.clone())
        })
        .await
        .unwrap();

    assert_eq!(summary.successful, 1);
    assert_eq!(actions, vec![Some("Processing 2024-01-05".to_string())]);
}

#[tokio::test]
async fn test_stock_completeness_omits_empty_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/trading-days/stock-completeness"))
        .and(query_param("days_back", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stocks": []})))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .trading_days()
        .stock_completeness(Some(""), 7)
        .await;
    assert_ok!(result);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("days_back=7"));
}

#[tokio::test]
async fn test_service_info_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/trading-days/info"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert_err!(client_for(&server).trading_days().service_info().await);
}

#[tokio::test]
async fn test_symbols_are_encoded_as_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/data/history/2330%2Fstats%3Fx/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 1})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/moving-averages/task-status/a%20b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "done"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_ok!(client.stocks().get_stock_stats("2330/stats?x").await);
    assert_ok!(client.moving_averages().task_status("a b").await);
}
