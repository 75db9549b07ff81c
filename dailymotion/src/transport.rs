//! The HTTP layer: one request in, one status and body out.
//!
//! Everything above this module talks to the API through the [`Transport`] trait, so tests can
//! swap the network out for [`MockTransport`](crate::mock::MockTransport).

use crate::config::ClientConfig;
use eyre::Context;
use http::Method;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::instrument;

/// Parameter names whose values never show up in logs.
const SECRET_PARAMS: &[&str] = &["password", "client_secret", "refresh_token"];

/// A single API call.
///
/// For `GET` and `DELETE` the parameters go into the query string; for everything else they are
/// sent as a form-encoded body.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            bearer: None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn bearer(mut self, token: Option<impl Into<String>>) -> Self {
        self.bearer = token.map(Into::into);
        self
    }

    /// Looks up the first value given for `key`.
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn sends_query(&self) -> bool {
        self.method == Method::GET || self.method == Method::DELETE
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<_> = self
            .params
            .iter()
            .map(|(k, v)| {
                if SECRET_PARAMS.contains(&k.as_str()) {
                    (k.as_str(), "[redacted]")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("params", &params)
            .field("bearer", &self.bearer.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// The status code and body of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// The `error` object the API returns alongside a failure status.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Throttled and server-side failures are worth retrying; other failures are not.
    pub fn is_retryable(&self) -> bool {
        self.status == 429 || self.status >= 500
    }

    /// The API's error description, if the body carries one.
    pub fn api_error(&self) -> Option<ApiErrorBody> {
        serde_json::from_str::<ApiErrorEnvelope>(&self.body)
            .ok()
            .map(|envelope| envelope.error)
    }

    /// Turns a failure status into an error that describes what went wrong.
    pub fn error_for_status(self) -> eyre::Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        match self.api_error() {
            Some(error) => Err(eyre::eyre!(
                "Dailymotion API request failed with status {} ({}): {}",
                self.status,
                error.kind.as_deref().unwrap_or("unknown"),
                error.message
            )),
            None => Err(eyre::eyre!(
                "Dailymotion API request failed with status {}: {}",
                self.status,
                self.body
            )),
        }
    }
}

/// Something that can carry API calls.
///
/// Implementations own retries, timeouts and pacing. A transport error means no response was
/// received at all; an error status is a successful [`ApiResponse`].
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> impl Future<Output = eyre::Result<ApiResponse>> + Send;

    /// Posts `contents` as a multipart file upload to `url`.
    fn upload(
        &self,
        url: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> impl Future<Output = eyre::Result<ApiResponse>> + Send;
}

/// [`Transport`] over `reqwest`.
///
/// Redirects are never followed. Failed calls are retried up to `max_retries` times with linear
/// back-off, but non-idempotent ones only when the server cannot have acted on them.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: Arc<ClientConfig>,
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> eyre::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            config: Arc::new(config),
            last_call: Arc::new(Mutex::new(None)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Waits until at least `min_call_interval` has passed since the previous call started.
    async fn pace(&self) {
        let interval = self.config.min_call_interval();
        if interval.is_zero() {
            return;
        }
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<ApiResponse, reqwest::Error> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = if request.sends_query() {
            builder.query(&request.params)
        } else {
            builder.form(&request.params)
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}

/// Whether a failed attempt may be sent again.
///
/// Idempotent methods are retried on throttling, server errors and transport failures. Anything
/// else is only retried when the server cannot have acted on it: a 429, or a connection that was
/// never established.
fn should_retry(method: &Method, outcome: &Result<ApiResponse, reqwest::Error>) -> bool {
    match outcome {
        Ok(response) if method.is_idempotent() => response.is_retryable(),
        Ok(response) => response.status == 429,
        Err(e) => method.is_idempotent() || e.is_connect(),
    }
}

impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url), level = tracing::Level::DEBUG)]
    async fn send(&self, request: ApiRequest) -> eyre::Result<ApiResponse> {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;
        loop {
            self.pace().await;
            let outcome = self.send_once(&request).await;
            if attempt >= max_retries || !should_retry(&request.method, &outcome) {
                if let Ok(response) = &outcome {
                    tracing::trace!(status = response.status, "got response");
                }
                return outcome.with_context(|| {
                    format!("send {} request to {}", request.method, request.url)
                });
            }
            match &outcome {
                Ok(response) => {
                    tracing::warn!(status = response.status, attempt, "retryable status");
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "request failed, retrying");
                }
            }
            attempt += 1;
            tokio::time::sleep(self.config.retry_backoff() * attempt).await;
        }
    }

    #[instrument(skip(self, contents), fields(bytes = contents.len()))]
    async fn upload(
        &self,
        url: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> eyre::Result<ApiResponse> {
        self.pace().await;
        let part = reqwest::multipart::Part::bytes(contents).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("upload {file_name} to {url}"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("read upload response body")?;
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn request_builder_collects_params() {
        let request = ApiRequest::new(Method::GET, "https://api.dailymotion.com/videos")
            .param("search", "a b")
            .params([("limit", "10")])
            .bearer(Some("tok"));
        assert_eq!(request.get_param("search"), Some("a b"));
        assert_eq!(request.get_param("limit"), Some("10"));
        assert_eq!(request.get_param("page"), None);
        assert_eq!(request.bearer.as_deref(), Some("tok"));
        assert!(request.sends_query());
        assert!(!ApiRequest::new(Method::POST, "x").sends_query());
    }

    #[test]
    fn debug_redacts_secrets() {
        let request = ApiRequest::new(Method::POST, "https://api.dailymotion.com/oauth/token")
            .param("username", "someone")
            .param("password", "hunter2")
            .param("client_secret", "abc123")
            .bearer(Some("tok-secret"));
        let debug = format!("{request:?}");
        assert!(debug.contains("someone"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("abc123"));
        assert!(!debug.contains("tok-secret"));
    }

    #[test]
    fn error_status_carries_api_message() {
        let response = ApiResponse::new(
            403,
            r#"{"error":{"code":403,"message":"Access forbidden","type":"access_forbidden"}}"#,
        );
        assert!(!response.is_success());
        assert!(!response.is_retryable());
        let error = response.api_error().unwrap();
        assert_eq!(error.code, Some(403));
        assert_eq!(error.kind.as_deref(), Some("access_forbidden"));

        let report = ApiResponse::new(403, response.body.clone())
            .error_for_status()
            .unwrap_err();
        let message = report.to_string();
        assert!(message.contains("403"), "{message}");
        assert!(message.contains("Access forbidden"), "{message}");
    }

    #[test]
    fn retryable_statuses() {
        assert!(ApiResponse::new(429, "").is_retryable());
        assert!(ApiResponse::new(503, "").is_retryable());
        assert!(!ApiResponse::new(404, "").is_retryable());
        assert!(ApiResponse::new(204, "").error_for_status().is_ok());
    }

    /// A one-connection-at-a-time HTTP server that plays back `statuses` in order, repeating the
    /// last one, and records every raw request it sees.
    struct ScriptedServer {
        url: String,
        requests: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl ScriptedServer {
        async fn start(statuses: &[u16]) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(std::sync::Mutex::new(Vec::new()));
            let recorded = Arc::clone(&requests);
            let statuses = statuses.to_vec();
            tokio::spawn(async move {
                let mut served = 0;
                while let Ok((mut socket, _)) = listener.accept().await {
                    let request = read_request(&mut socket).await;
                    recorded.lock().unwrap().push(request);
                    let status = statuses[served.min(statuses.len() - 1)];
                    served += 1;
                    let body = "{}";
                    let reply = format!(
                        "HTTP/1.1 {status} Scripted\r\n\
                         Content-Type: application/json\r\n\
                         Location: /elsewhere\r\n\
                         Content-Length: {}\r\n\
                         Connection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });
            Self { url, requests }
        }

        fn hits(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, i: usize) -> String {
            self.requests.lock().unwrap()[i].clone()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn transport(
        max_retries: u32,
        retry_backoff_ms: u64,
        min_call_interval_ms: u64,
    ) -> HttpTransport {
        HttpTransport::new(ClientConfig {
            max_retries,
            retry_backoff_ms,
            min_call_interval_ms,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn get_retries_stop_after_max_retries_with_linear_backoff() {
        let server = ScriptedServer::start(&[503]).await;
        let http = transport(2, 50, 0);

        let start = Instant::now();
        let response = http
            .send(ApiRequest::new(Method::GET, format!("{}/videos", server.url)))
            .await
            .unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(server.hits(), 3);
        // 50ms before the second attempt, 100ms before the third
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn get_retries_until_success() {
        let server = ScriptedServer::start(&[503, 429, 200]).await;
        let http = transport(2, 1, 0);
        let response = http
            .send(ApiRequest::new(Method::GET, format!("{}/videos", server.url)))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = ScriptedServer::start(&[404, 200]).await;
        let http = transport(2, 1, 0);
        let response = http
            .send(ApiRequest::new(Method::GET, format!("{}/video/x1", server.url)))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn post_is_not_retried_on_server_errors() {
        let server = ScriptedServer::start(&[503, 503, 200]).await;
        let http = transport(2, 1, 0);
        let response = http
            .send(
                ApiRequest::new(Method::POST, format!("{}/me/videos", server.url))
                    .param("title", "x"),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn post_is_retried_when_throttled() {
        let server = ScriptedServer::start(&[429, 200]).await;
        let http = transport(2, 1, 0);
        let response = http
            .send(
                ApiRequest::new(Method::POST, format!("{}/me/playlists", server.url))
                    .param("name", "x"),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn calls_are_paced() {
        let server = ScriptedServer::start(&[200]).await;
        let http = transport(0, 1, 200);
        let url = format!("{}/videos", server.url);

        let start = Instant::now();
        http.send(ApiRequest::new(Method::GET, url.clone()))
            .await
            .unwrap();
        http.send(ApiRequest::new(Method::GET, url)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn redirects_are_not_followed() {
        let server = ScriptedServer::start(&[302, 200]).await;
        let http = transport(2, 1, 0);
        let response = http
            .send(ApiRequest::new(Method::GET, format!("{}/video/x1", server.url)))
            .await
            .unwrap();
        assert_eq!(response.status, 302);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn get_uses_query_and_post_uses_form_body() {
        let server = ScriptedServer::start(&[200]).await;
        let http = transport(0, 1, 0);

        http.send(
            ApiRequest::new(Method::GET, format!("{}/videos", server.url))
                .param("limit", "10")
                .bearer(Some("tok")),
        )
        .await
        .unwrap();
        http.send(
            ApiRequest::new(Method::POST, format!("{}/me/videos", server.url))
                .param("title", "x"),
        )
        .await
        .unwrap();

        let get = server.request(0);
        assert!(get.starts_with("GET /videos?limit=10 HTTP/1.1\r\n"), "{get}");
        assert!(get.to_ascii_lowercase().contains("authorization: bearer tok"), "{get}");

        let post = server.request(1);
        assert!(post.starts_with("POST /me/videos HTTP/1.1\r\n"), "{post}");
        assert!(
            post.to_ascii_lowercase()
                .contains("content-type: application/x-www-form-urlencoded"),
            "{post}"
        );
        assert!(post.ends_with("\r\n\r\ntitle=x"), "{post}");
    }
}
