/// Transport to the NoteX API
///
/// The [`Transport`] trait is the seam between the offline client and the
/// network. [`HttpTransport`] talks to a real server with reqwest;
/// [`MockTransport`] answers from canned responses and records every request,
/// for tests and demos.
///
/// # Example
///
/// ```no_run
/// use notex_sync::transport::{ApiRequest, HttpTransport, Transport};
///
/// # async fn example() -> Result<(), notex_sync::error::SyncError> {
/// let transport = HttpTransport::new("http://localhost:8080", Some("token".to_string()))?;
/// let response = transport.send(&ApiRequest::get("/api/notes")).await?;
/// println!("status {}", response.status);
/// # Ok(())
/// # }
/// ```

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::RwLock;

/// HTTP method subset used by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        write!(f, "{}", s)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An API call: method, path (with optional query) and JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, None)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path, Some(body))
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path, Some(body))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path, None)
    }

    /// Path without the query string
    pub fn route(&self) -> &str {
        self.path.split('?').next().unwrap_or_default()
    }
}

/// Status code and JSON body of an answered request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        ApiResponse { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends API requests
///
/// `Err` means the request never got an answer; any HTTP status, including
/// 4xx and 5xx, is an `Ok` response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> SyncResult<ApiResponse>;

    /// Replaces the bearer token used for later requests
    async fn set_access_token(&self, _token: Option<String>) {}
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    access_token: RwLock<Option<String>>,
}

impl HttpTransport {
    /// Request timeout; a hung request counts as unreachable
    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .user_agent(concat!("notex-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpTransport {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: RwLock::new(access_token),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> SyncResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.into(), &url);

        if let Some(token) = self.access_token.read().await.as_deref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        // Non-JSON bodies (proxies, HTML error pages) are kept as a string
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        tracing::debug!(method = %request.method, path = %request.path, status, "API request");

        Ok(ApiResponse { status, body })
    }

    async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }
}

/// In-memory transport with canned responses
///
/// Unmatched requests answer `200 {}`. While unreachable, every request
/// fails with [`SyncError::Transport`].
#[derive(Default)]
pub struct MockTransport {
    responses: StdMutex<HashMap<(Method, String), ApiResponse>>,
    requests: StdMutex<Vec<ApiRequest>>,
    unreachable: AtomicBool,
    access_token: StdMutex<Option<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `method route` (query string ignored) with `response`
    pub fn respond(&self, method: Method, route: &str, response: ApiResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((method, route.to_string()), response);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> SyncResult<ApiResponse> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(SyncError::Transport("connection refused".to_string()));
        }

        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let canned = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(request.method, request.route().to_string()))
            .cloned();

        Ok(canned.unwrap_or_else(|| ApiResponse::new(200, serde_json::json!({}))))
    }

    async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_strips_query() {
        assert_eq!(ApiRequest::get("/api/search/users?q=ada").route(), "/api/search/users");
        assert_eq!(ApiRequest::get("/api/notes").route(), "/api/notes");
    }

    #[test]
    fn test_success_range() {
        assert!(ApiResponse::new(201, Value::Null).is_success());
        assert!(!ApiResponse::new(304, Value::Null).is_success());
        assert!(!ApiResponse::new(503, Value::Null).is_success());
    }

    #[tokio::test]
    async fn test_mock_transport() {
        let mock = MockTransport::new();
        mock.respond(
            Method::Get,
            "/api/notes",
            ApiResponse::new(200, json!({ "notes": [] })),
        );

        let response = mock.send(&ApiRequest::get("/api/notes?x=1")).await.unwrap();
        assert_eq!(response.body, json!({ "notes": [] }));

        let fallback = mock.send(&ApiRequest::delete("/api/notes/1")).await.unwrap();
        assert_eq!(fallback.status, 200);
        assert_eq!(mock.requests().len(), 2);

        mock.set_reachable(false);
        assert!(mock.send(&ApiRequest::get("/health")).await.is_err());
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn test_http_transport_trims_base_url() {
        let transport = HttpTransport::new("http://localhost:8080/", None).unwrap();
        assert_eq!(transport.base_url, "http://localhost:8080");
    }
}
