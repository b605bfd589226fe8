// 📮 Outbound relay client
// POSTs one JSON payload per event to the spreadsheet endpoint and turns the
// tolerant response convention into a typed result.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as Json};
use tracing::debug;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::relay::payload::RelayRequest;
use crate::value::Value;

/// Anything that can deliver a relay request. The HTTP client is the real
/// implementation; tests substitute a recorder.
#[async_trait]
pub trait RelaySink: Send + Sync {
    async fn deliver(&self, request: &RelayRequest) -> Result<Json, RelayError>;
}

#[async_trait]
impl<T: RelaySink + ?Sized> RelaySink for Arc<T> {
    async fn deliver(&self, request: &RelayRequest) -> Result<Json, RelayError> {
        (**self).deliver(request).await
    }
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;
        Ok(RelayClient {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        Self::new(config.script_url.clone(), config.timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RelaySink for RelayClient {
    async fn deliver(&self, request: &RelayRequest) -> Result<Json, RelayError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| RelayError::Transport {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| RelayError::Transport {
            status: Some(status),
            body: e.to_string(),
        })?;
        debug!(status, bytes = text.len(), action = request.name(), "relay response");

        interpret_response(status, &text)
    }
}

/// Response convention of the endpoint:
/// non-2xx fails with the raw text, `{"ok": false}` fails with its `error`
/// (or the raw text), and anything else succeeds. An unparsable body counts
/// as `{"ok": true}`.
pub fn interpret_response(status: u16, text: &str) -> Result<Json, RelayError> {
    if !(200..300).contains(&status) {
        return Err(RelayError::Transport {
            status: Some(status),
            body: text.to_string(),
        });
    }

    let parsed = serde_json::from_str::<Json>(text).ok().filter(|v| !v.is_null());
    match parsed {
        Some(body) if body.get("ok") == Some(&Json::Bool(false)) => {
            let detail = body
                .get("error")
                .cloned()
                .map(Value::from)
                .filter(Value::is_truthy)
                .map(|v| v.to_text())
                .unwrap_or_else(|| text.to_string());
            Err(RelayError::Application(detail))
        }
        Some(body) => Ok(body),
        None => Ok(json!({ "ok": true })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::payload::{plan_request, OrderPayload};
    use crate::testutil::{spawn_http_server, CannedResponse};

    #[test]
    fn test_interpret_success_variants() {
        assert_eq!(interpret_response(200, r#"{"ok":true,"row":7}"#).unwrap()["row"], 7);
        assert_eq!(interpret_response(200, "<html>done</html>").unwrap(), json!({"ok": true}));
        assert_eq!(interpret_response(200, "").unwrap(), json!({"ok": true}));
        assert_eq!(interpret_response(200, "null").unwrap(), json!({"ok": true}));
        assert_eq!(interpret_response(201, r#"{"saved":1}"#).unwrap(), json!({"saved": 1}));
    }

    #[test]
    fn test_interpret_application_failure() {
        match interpret_response(200, r#"{"ok":false,"error":"quota"}"#) {
            Err(RelayError::Application(detail)) => assert_eq!(detail, "quota"),
            other => panic!("unexpected {other:?}"),
        }

        let raw = r#"{"ok":false}"#;
        match interpret_response(200, raw) {
            Err(RelayError::Application(detail)) => assert_eq!(detail, raw),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interpret_transport_failure() {
        match interpret_response(500, "Internal error") {
            Err(RelayError::Transport { status, body }) => {
                assert_eq!(status, Some(500));
                assert_eq!(body, "Internal error");
            }
            other => panic!("unexpected {other:?}"),
        }
        // Status wins even when the body claims success.
        assert!(matches!(
            interpret_response(404, r#"{"ok":true}"#),
            Err(RelayError::Transport { status: Some(404), .. })
        ));
    }

    #[tokio::test]
    async fn test_client_posts_json() {
        let (addr, handle) = spawn_http_server(CannedResponse::json(200, r#"{"ok":true}"#));
        let client = RelayClient::new(format!("http://{addr}/exec"), Duration::from_secs(5)).unwrap();

        let request = plan_request("m1", "2026-03", None);
        let response = client.deliver(&request).await.unwrap();
        assert_eq!(response, json!({"ok": true}));

        let captured = handle.join().unwrap();
        assert_eq!(captured.method, "POST");
        assert_eq!(captured.path, "/exec");
        assert_eq!(captured.header("content-type"), Some("application/json"));
        let body: Json = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(body, json!({"action": "deletePlan", "managerId": "m1", "period": "2026-03"}));
    }

    #[tokio::test]
    async fn test_client_surfaces_application_error() {
        let (addr, handle) = spawn_http_server(CannedResponse::json(200, r#"{"ok":false,"error":"quota"}"#));
        let client = RelayClient::new(format!("http://{addr}/exec"), Duration::from_secs(5)).unwrap();

        let request = RelayRequest::CreateOrder(OrderPayload::from_document("m1", "o1", None));
        let err = client.deliver(&request).await.unwrap_err();
        assert!(matches!(err, RelayError::Application(ref d) if d == "quota"));
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_client_surfaces_http_status() {
        let (addr, handle) = spawn_http_server(CannedResponse::text(500, "Script error"));
        let client = RelayClient::new(format!("http://{addr}/exec"), Duration::from_secs(5)).unwrap();

        let err = client.deliver(&plan_request("m1", "p", None)).await.unwrap_err();
        match err {
            RelayError::Transport { status, body } => {
                assert_eq!(status, Some(500));
                assert_eq!(body, "Script error");
            }
            other => panic!("unexpected {other:?}"),
        }
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = RelayClient::new(format!("http://127.0.0.1:{port}/exec"), Duration::from_secs(2)).unwrap();

        let err = client.deliver(&plan_request("m1", "p", None)).await.unwrap_err();
        assert!(matches!(err, RelayError::Transport { status: None, .. }));
    }
}
