//! Authenticated request gateway.
//!
//! Every call that needs the session goes through [`Gateway::request`]: the
//! bearer token is read from the token store at request time, and a 401 from
//! the server fires the injected unauthorized hook before the caller sees the
//! [`GatewayError::Unauthorized`] sentinel.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::{ClientError, ClientResult};
use crate::models::MessageBody;
use crate::token_store::TokenStore;

/// User-Agent sent with every API request.
pub const USER_AGENT: &str = concat!("pulse/", env!("CARGO_PKG_VERSION"));

/// Callback fired when the server rejects the current token.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The server answered 401. The unauthorized hook has already run.
    #[error("401 Unauthorized")]
    Unauthorized,

    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Request body variants the API accepts.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Multipart upload; reqwest sets the boundary content type.
    Multipart(reqwest::multipart::Form),
}

impl RequestBody {
    /// Serializes any value into a JSON body.
    ///
    /// # Errors
    /// Returns a decode error if the value cannot be represented as JSON.
    pub fn json<T: serde::Serialize>(value: &T) -> ClientResult<Self> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Cheaply clonable handle over a shared HTTP client.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    on_unauthorized: UnauthorizedHook,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Builds the shared HTTP client. `timeout` of `None` keeps the transport
    /// default (no overall timeout).
    ///
    /// # Errors
    /// Returns a transport error if the TLS backend cannot be initialised.
    pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client, GatewayError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(GatewayError::Transport)
    }

    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        tokens: Arc<dyn TokenStore>,
        on_unauthorized: UnauthorizedHook,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                http,
                base_url: base_url.trim().trim_end_matches('/').to_string(),
                tokens,
                on_unauthorized,
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.inner.tokens
    }

    /// Sends an authenticated request.
    ///
    /// Non-401 error statuses are returned as `Ok(response)` for the caller to
    /// inspect.
    ///
    /// # Errors
    /// `Unauthorized` after the hook ran on 401, `Transport` on network failure.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<Response, GatewayError> {
        let token = self.inner.tokens.load();
        let response = self.send(method.clone(), path, body, token.as_deref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(%method, path, "server rejected session token");
            (self.inner.on_unauthorized)();
            return Err(GatewayError::Unauthorized);
        }
        Ok(response)
    }

    /// Sends an authenticated request without firing the unauthorized hook.
    /// A 401 comes back as an ordinary response.
    ///
    /// # Errors
    /// `Transport` on network failure, `InvalidUrl` on a malformed path.
    pub async fn request_unhooked(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<Response, GatewayError> {
        let token = self.inner.tokens.load();
        self.send(method, path, body, token.as_deref()).await
    }

    /// Sends a request without credentials and without 401 handling
    /// (login and registration, where 401 means bad credentials).
    ///
    /// # Errors
    /// `Transport` on network failure, `InvalidUrl` on a malformed path.
    pub async fn request_anonymous(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<Response, GatewayError> {
        self.send(method, path, body, None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        token: Option<&str>,
    ) -> Result<Response, GatewayError> {
        let url = self.url(path)?;
        tracing::debug!(%method, %url, "api request");

        let mut request = self.inner.http.request(method.clone(), url);
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| GatewayError::InvalidUrl("token is not a valid header".into()))?;
            request = request.header(AUTHORIZATION, value);
        }

        request = match body {
            RequestBody::Multipart(form) => request.multipart(form),
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Empty if method != Method::GET => {
                request.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            }
            RequestBody::Empty => request,
        };

        request.send().await.map_err(GatewayError::Transport)
    }

    fn url(&self, path: &str) -> Result<url::Url, GatewayError> {
        let joined = format!("{}{path}", self.inner.base_url);
        url::Url::parse(&joined).map_err(|e| GatewayError::InvalidUrl(format!("{joined}: {e}")))
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    /// Any gateway error, `Api` on a non-2xx status, `Decode` on a bad body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> ClientResult<T> {
        let response = self.request(Method::GET, path, RequestBody::Empty).await?;
        decode_json(response, fallback).await
    }

    /// Sends a request and decodes a JSON response.
    ///
    /// # Errors
    /// Any gateway error, `Api` on a non-2xx status, `Decode` on a bad body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        fallback: &str,
    ) -> ClientResult<T> {
        let response = self.request(method, path, body).await?;
        decode_json(response, fallback).await
    }

    /// Sends a request whose response body only matters for its optional
    /// `message`.
    ///
    /// # Errors
    /// Any gateway error, or `Api` on a non-2xx status.
    pub async fn send_ok(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        fallback: &str,
    ) -> ClientResult<Option<String>> {
        let response = self.request(method, path, body).await?;
        let status = response.status();
        let text = response.text().await.map_err(ClientError::Transport)?;
        if !status.is_success() {
            return Err(ClientError::from_status(status, &text, fallback));
        }
        let parsed: MessageBody = serde_json::from_str(&text).unwrap_or_default();
        Ok(parsed.message.filter(|m| !m.trim().is_empty()))
    }
}

/// Maps a response to `T`, or to `ClientError::Api` for non-2xx statuses.
///
/// # Errors
/// `Api` on a non-2xx status, `Transport` if the body cannot be read,
/// `Decode` if it does not match `T`.
pub async fn decode_json<T: DeserializeOwned>(response: Response, fallback: &str) -> ClientResult<T> {
    let status = response.status();
    let text = response.text().await.map_err(ClientError::Transport)?;
    if !status.is_success() {
        return Err(ClientError::from_status(status, &text, fallback));
    }
    serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::token_store::MemoryTokenStore;

    fn gateway(server: &MockServer, token: Option<&str>) -> (Gateway, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let tokens: Arc<dyn TokenStore> = match token {
            Some(t) => Arc::new(MemoryTokenStore::with_token(t)),
            None => Arc::new(MemoryTokenStore::new()),
        };
        let gateway = Gateway::new(
            Gateway::http_client(None).unwrap(),
            &format!("{}/", server.uri()),
            tokens,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (gateway, hits)
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .and(header("authorization", "Bearer T"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let (gateway, hits) = gateway(&server, Some("T"));
        let value: serde_json::Value = gateway.get_json("/api/me", "failed").await.unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_401_fires_hook_once_and_returns_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "expired"})))
            .mount(&server)
            .await;

        let (gateway, hits) = gateway(&server, Some("T"));
        let err = gateway
            .request(Method::GET, "/api/notifications", RequestBody::Empty)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_post_sends_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/events/4/archive"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "archived"})))
            .expect(1)
            .mount(&server)
            .await;

        let (gateway, _) = gateway(&server, Some("T"));
        let message = gateway
            .send_ok(Method::POST, "/api/events/4/archive", RequestBody::Empty, "failed")
            .await
            .unwrap();
        assert_eq!(message.as_deref(), Some("archived"));
    }

    #[tokio::test]
    async fn test_non_ok_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(body_json(json!({"username": "bob"})))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"error": "Username taken"})),
            )
            .mount(&server)
            .await;

        let (gateway, _) = gateway(&server, Some("T"));
        let err = gateway
            .send_json::<serde_json::Value>(
                Method::PUT,
                "/api/me",
                RequestBody::Json(json!({"username": "bob"})),
                "Update failed",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 409, ref message } if message == "Username taken"));
    }

    #[tokio::test]
    async fn test_unhooked_request_returns_401_as_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .and(header("authorization", "Bearer T"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (gateway, hits) = gateway(&server, Some("T"));
        let response = gateway
            .request_unhooked(Method::GET, "/api/me", RequestBody::Empty)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_anonymous_request_ignores_401_hook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "bad"})))
            .mount(&server)
            .await;

        let (gateway, hits) = gateway(&server, Some("T"));
        let response = gateway
            .request_anonymous(Method::POST, "/api/login", RequestBody::Empty)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_error() {
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let gateway = Gateway::new(
            Gateway::http_client(Some(Duration::from_secs(2))).unwrap(),
            "http://127.0.0.1:1",
            tokens,
            Arc::new(|| {}),
        );
        let err = gateway
            .request(Method::GET, "/api/events", RequestBody::Empty)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
