//! HTTP implementation of the session transport.
//!
//! All calls are JSON request/response against the session API:
//!
//! - `GET  {base}/session/{handle}`
//! - `POST {base}/session` with `{ "ownerId" }`
//! - `POST {base}/window_state` with `{ "sessionId", "state" }`
//! - `POST {base}/session_clear` with `{ "sessionId" }`
//!
//! Every endpoint answers `{ "session": ..., "thread"?: ... }`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tether_core::{Result, SessionEnvelope, SessionTransport, TetherError, WindowStatePatch};
use url::Url;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    owner_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WindowStateRequest<'a> {
    session_id: &'a str,
    state: &'a WindowStatePatch,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClearRequest<'a> {
    session_id: &'a str,
}

/// Session transport over reqwest.
///
/// Two flavours exist: [`HttpSessionTransport::primary`] talks to the
/// same-origin proxy with a pooled client, [`HttpSessionTransport::fallback`]
/// talks to an alternate base URL with a separately configured client that
/// does not reuse connections.
#[derive(Clone, Debug)]
pub struct HttpSessionTransport {
    name: String,
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpSessionTransport {
    /// Creates the primary transport.
    pub fn primary(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TetherError::config(format!("Failed to build HTTP client: {}", e)))?;
        Self::with_client("primary", client, base_url, timeout)
    }

    /// Creates the fallback transport.
    pub fn fallback(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .http1_only()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| TetherError::config(format!("Failed to build HTTP client: {}", e)))?;
        Self::with_client("fallback", client, base_url, timeout)
    }

    fn with_client(name: &str, client: Client, base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TetherError::config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TetherError::config(format!(
                "Base URL '{}' cannot be used as a base",
                base_url
            )));
        }

        Ok(Self {
            name: name.to_string(),
            client,
            base_url,
            timeout,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TetherError::config("Base URL cannot be used as a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a request and decodes the envelope.
    ///
    /// A 404 maps to `NotFound` when the call targets an existing handle.
    async fn send(&self, request: RequestBuilder, handle: Option<&str>) -> Result<SessionEnvelope> {
        let response = request.send().await.map_err(|e| self.map_reqwest(e))?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND
            && let Some(handle) = handle
        {
            return Err(TetherError::session_not_found(handle));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                "[HttpTransport:{}] Non-success status {}: {}",
                self.name,
                status,
                body
            );
            return Err(TetherError::http_status(
                status.as_u16(),
                format!("{} returned {}", self.name, status),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| self.map_reqwest(e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn map_reqwest(&self, err: reqwest::Error) -> TetherError {
        if err.is_timeout() {
            TetherError::timeout(self.timeout)
        } else {
            TetherError::transport(format!("{} request failed: {}", self.name, err))
        }
    }
}

#[async_trait]
impl SessionTransport for HttpSessionTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, handle: &str) -> Result<SessionEnvelope> {
        let url = self.endpoint(&["session", handle])?;
        self.send(self.client.get(url), Some(handle)).await
    }

    async fn create(&self, owner_id: &str) -> Result<SessionEnvelope> {
        let url = self.endpoint(&["session"])?;
        let request = self.client.post(url).json(&CreateRequest { owner_id });
        self.send(request, None).await
    }

    async fn patch(&self, handle: &str, patch: &WindowStatePatch) -> Result<SessionEnvelope> {
        let url = self.endpoint(&["window_state"])?;
        let request = self.client.post(url).json(&WindowStateRequest {
            session_id: handle,
            state: patch,
        });
        self.send(request, Some(handle)).await
    }

    async fn clear(&self, handle: &str) -> Result<SessionEnvelope> {
        let url = self.endpoint(&["session_clear"])?;
        let request = self
            .client
            .post(url)
            .json(&ClearRequest { session_id: handle });
        self.send(request, Some(handle)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_json(id: &str) -> serde_json::Value {
        json!({
            "session": {
                "id": id,
                "ownerId": "site-1",
                "threads": [{ "threadId": "t1", "createdAt": "2026-01-01T00:00:00Z" }],
                "textOpen": true
            }
        })
    }

    fn transport(server: &MockServer) -> HttpSessionTransport {
        HttpSessionTransport::primary(&format!("{}/api", server.uri()), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json("s1")))
            .mount(&server)
            .await;

        let envelope = transport(&server).get("s1").await.unwrap();
        assert_eq!(envelope.session.persisted_id(), Some("s1"));
        assert!(envelope.session.window.text_open);
        assert_eq!(envelope.session.threads[0].thread_id, "t1");
        assert!(envelope.thread.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_session_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/s0"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = transport(&server).get("s0").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_sends_owner_and_reads_thread() {
        let server = MockServer::start().await;
        let mut body = session_json("s2");
        body["thread"] = json!({ "threadId": "t9", "createdAt": "2026-01-01T00:00:00Z" });

        Mock::given(method("POST"))
            .and(path("/api/session"))
            .and(body_json(json!({ "ownerId": "site-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let envelope = transport(&server).create("site-1").await.unwrap();
        assert_eq!(envelope.session.persisted_id(), Some("s2"));
        assert_eq!(envelope.thread.unwrap().thread_id, "t9");
    }

    #[tokio::test]
    async fn test_patch_sends_only_set_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/window_state"))
            .and(body_json(json!({
                "sessionId": "s1",
                "state": { "voiceOpen": true, "voiceOpenWindowUp": false }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json("s1")))
            .expect(1)
            .mount(&server)
            .await;

        let patch = WindowStatePatch::new()
            .voice_open(true)
            .voice_open_window_up(false);
        transport(&server).patch("s1", &patch).await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/session_clear"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = transport(&server).clear("s1").await.unwrap_err();
        assert!(matches!(
            err,
            TetherError::Transport {
                status: Some(500),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_serialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = transport(&server).get("s1").await.unwrap_err();
        assert!(matches!(err, TetherError::Serialization { .. }));
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/session/s1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(session_json("s1"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let transport =
            HttpSessionTransport::fallback(&server.uri(), Duration::from_millis(50)).unwrap();
        let err = transport.get("s1").await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(transport.name(), "fallback");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = HttpSessionTransport::primary("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, TetherError::Config(_)));
    }
}
