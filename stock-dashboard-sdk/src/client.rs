//! HTTP client implementation
//!
//! A single attempt per call; every outcome, including transport failures,
//! is folded into an [`Envelope`].

use crate::config::SdkConfig;
use crate::envelope::{error_message_from_body, Envelope};
use crate::error::{SdkError, SdkResult};
use reqwest::{header, Client, Method, Response};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

/// Which backend a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Primary data/task API
    Api,
    /// Crawler service
    Crawler,
}

/// The HTTP client for making API requests
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: Arc<SdkConfig>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: SdkConfig) -> SdkResult<Self> {
        config.validate()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        for (name, value) in &config.custom_headers {
            let name = header::HeaderName::try_from(name.as_str()).map_err(|e| {
                SdkError::ConfigurationError(format!("Invalid header name {}: {}", name, e))
            })?;
            let value = header::HeaderValue::try_from(value.as_str()).map_err(|e| {
                SdkError::ConfigurationError(format!("Invalid header value: {}", e))
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Build the full primary-API URL for an endpoint
    pub fn url(&self, path: &str) -> String {
        self.url_for(Service::Api, path)
    }

    pub fn url_for(&self, service: Service, path: &str) -> String {
        let base = match service {
            Service::Api => &self.config.base_url,
            Service::Crawler => &self.config.crawler_url,
        };
        let base = base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Envelope {
        self.get_from(Service::Api, path).await
    }

    /// Make a GET request with query parameters. An empty mapping adds no `?`.
    pub async fn get_with_query<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Envelope {
        self.send(Service::Api, Method::GET, path, Some(query), None)
            .await
    }

    pub async fn get_from(&self, service: Service, path: &str) -> Envelope {
        self.send::<()>(service, Method::GET, path, None, None).await
    }

    pub async fn get_from_with_query<Q: Serialize + ?Sized>(
        &self,
        service: Service,
        path: &str,
        query: &Q,
    ) -> Envelope {
        self.send(service, Method::GET, path, Some(query), None)
            .await
    }

    /// Make a POST request. A `None` body is sent as the literal `null`.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Envelope {
        self.post_to(Service::Api, path, body).await
    }

    pub async fn post_to<B: Serialize + ?Sized>(
        &self,
        service: Service,
        path: &str,
        body: Option<&B>,
    ) -> Envelope {
        match encode_body(body) {
            Ok(body) => {
                self.send::<()>(service, Method::POST, path, None, Some(body))
                    .await
            }
            Err(e) => Envelope::failure(e.to_string()),
        }
    }

    /// Make a PUT request
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Envelope {
        match encode_body(body) {
            Ok(body) => {
                self.send::<()>(Service::Api, Method::PUT, path, None, Some(body))
                    .await
            }
            Err(e) => Envelope::failure(e.to_string()),
        }
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Envelope {
        self.send::<()>(Service::Api, Method::DELETE, path, None, None)
            .await
    }

    /// Fetches a non-JSON body, such as Prometheus exposition text.
    pub async fn get_text(&self, service: Service, path: &str) -> SdkResult<String> {
        let url = self.url_for(service, path);
        if self.config.enable_logging {
            debug!("Request: GET {}", url);
        }

        let response = self.client.get(&url).send().await.map_err(|e| {
            error!("Request failed: {}", e);
            SdkError::from(e)
        })?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(SdkError::Api {
                status: status.as_u16(),
                message: error_message_from_body(&text)
                    .unwrap_or_else(|| status_text(status)),
            })
        }
    }

    async fn send<Q: Serialize + ?Sized>(
        &self,
        service: Service,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<String>,
    ) -> Envelope {
        let url = self.url_for(service, path);
        let mut request = self.client.request(method.clone(), &url);

        if let Some(q) = query {
            request = request.query(q);
        }

        if self.config.enable_logging {
            debug!("Request: {} {}", method, url);
            if let Some(ref body_str) = body {
                debug!("Request body: {}", body_str);
            }
        }

        if let Some(body_str) = body {
            request = request.body(body_str);
        }

        match request.send().await {
            Ok(response) => self.into_envelope(response).await,
            Err(e) => {
                error!("Request failed: {}", e);
                Envelope::failure(e.to_string())
            }
        }
    }

    async fn into_envelope(&self, response: Response) -> Envelope {
        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read response body: {}", e);
                return Envelope::failure(e.to_string());
            }
        };

        if self.config.enable_logging {
            debug!("Response {}: {}", status, text);
        }

        if !status.is_success() {
            let message = error_message_from_body(&text).unwrap_or_else(|| status_text(status));
            return Envelope::http_failure(status.as_u16(), message);
        }

        if text.trim().is_empty() {
            return Envelope::ok(Value::Null);
        }

        match serde_json::from_str(&text) {
            Ok(data) => Envelope::ok(data),
            Err(e) => Envelope::failure(format!("Invalid JSON response: {}", e)),
        }
    }
}

fn encode_body<B: Serialize + ?Sized>(body: Option<&B>) -> SdkResult<String> {
    match body {
        Some(b) => Ok(serde_json::to_string(b)?),
        None => Ok("null".to_string()),
    }
}

fn status_text(status: reqwest::StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

/// Walks a page-numbered endpoint starting at page 1, stopping at the first
/// page shorter than `page_size`.
pub async fn paginate<T, F, Fut>(page_size: u32, mut fetch_page: F) -> SdkResult<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = SdkResult<Vec<T>>>,
{
    if page_size == 0 {
        return Err(SdkError::InvalidRequest(
            "page size must be positive".to_string(),
        ));
    }

    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch_page(page).await?;
        let count = batch.len();
        items.extend(batch);

        if count < page_size as usize {
            break;
        }
        page += 1;
    }

    debug!(pages = page, items = items.len(), "Pagination finished");
    Ok(items)
}

/// Query for page-numbered list endpoints.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

impl PageParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Default::default()
        }
    }

    pub fn with_sort(mut self, sort_by: Option<String>, sort_order: Option<String>) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let config = SdkConfig::new("https://api.example.com/api/v1/")
            .with_crawler_url("http://localhost:8082");
        let client = HttpClient::new(config).unwrap();

        assert_eq!(
            client.url("/sync/stocks/count"),
            "https://api.example.com/api/v1/sync/stocks/count"
        );
        assert_eq!(
            client.url("sync/stocks"),
            "https://api.example.com/api/v1/sync/stocks"
        );
        assert_eq!(
            client.url_for(Service::Crawler, "/health"),
            "http://localhost:8082/health"
        );
    }

    #[test]
    fn test_invalid_custom_header() {
        let config = SdkConfig::default().with_header("bad header", "x");
        assert!(matches!(
            HttpClient::new(config),
            Err(SdkError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_null_body_encoding() {
        assert_eq!(encode_body::<()>(None).unwrap(), "null");
        assert_eq!(
            encode_body(Some(&serde_json::json!({"a": 1}))).unwrap(),
            r#"{"a":1}"#
        );
    }

    #[tokio::test]
    async fn test_paginate_stops_on_short_page() {
        let sizes = [1000usize, 1000, 400];
        let mut calls = 0;

        let items = paginate(1000, |page| {
            calls += 1;
            let size = sizes[(page - 1) as usize];
            async move { Ok(vec![page; size]) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 2400);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_paginate_propagates_failure() {
        let result: SdkResult<Vec<u32>> = paginate(10, |page| async move {
            if page == 2 {
                Err(SdkError::Transport("reset".to_string()))
            } else {
                Ok(vec![0; 10])
            }
        })
        .await;

        assert!(matches!(result, Err(SdkError::Transport(_))));
    }
}
