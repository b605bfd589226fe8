// 🌐 Relay HTTP surface
// Change events arrive as POSTs; every event maps to one relay handler call.
// A relay failure answers 502 so the sender redelivers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, Instrument};
use uuid::Uuid;

use crate::error::RelayError;
use crate::relay::{ChangeEvent, ChangeRelay, RelayOutcome, RelaySink};

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

fn relay_response(result: Result<RelayOutcome, RelayError>) -> Response {
    match result {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::ok(outcome))).into_response(),
        Err(e) => {
            error!(error = %e, "relay failed");
            failure(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// Empty bodies are allowed (deletes carry no snapshot).
fn parse_event(body: &Bytes) -> Result<ChangeEvent, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ChangeEvent::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| failure(StatusCode::BAD_REQUEST, format!("invalid event body: {e}")))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /events/managers/:manager_id/orders/:order_id/:kind
async fn order_event<S: RelaySink + 'static>(
    State(relay): State<Arc<ChangeRelay<S>>>,
    Path((manager_id, order_id, kind)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(response) => return response,
    };

    let span = tracing::info_span!("order_event", request_id = %Uuid::new_v4(), %kind);
    let result = async {
        match kind.as_str() {
            "created" => Some(relay.order_created(&manager_id, &order_id, event.after.as_ref()).await),
            "updated" => Some(relay.order_updated(&manager_id, &order_id, event.after.as_ref()).await),
            "deleted" => Some(relay.order_deleted(&manager_id, &order_id).await),
            _ => None,
        }
    }
    .instrument(span)
    .await;

    match result {
        Some(result) => relay_response(result),
        None => failure(StatusCode::NOT_FOUND, format!("unknown order event: {kind}")),
    }
}

/// POST /events/managers/:manager_id/plans/:period/written
async fn plan_event<S: RelaySink + 'static>(
    State(relay): State<Arc<ChangeRelay<S>>>,
    Path((manager_id, period)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(response) => return response,
    };

    let span = tracing::info_span!("plan_event", request_id = %Uuid::new_v4());
    let result = relay
        .plan_written(&manager_id, &period, event.after.as_ref())
        .instrument(span)
        .await;
    relay_response(result)
}

pub fn router<S: RelaySink + 'static>(relay: ChangeRelay<S>) -> Router {
    let events = Router::new()
        .route(
            "/managers/:manager_id/orders/:order_id/:kind",
            post(order_event::<S>),
        )
        .route("/managers/:manager_id/plans/:period/written", post(plan_event::<S>))
        .with_state(Arc::new(relay));

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/events", events)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value as Json};
    use std::sync::Mutex;
    use tower::ServiceExt;

    use crate::relay::RelayRequest;

    #[derive(Default)]
    struct StubSink {
        sent: Mutex<Vec<Json>>,
        fail: bool,
    }

    #[async_trait]
    impl RelaySink for StubSink {
        async fn deliver(&self, request: &RelayRequest) -> Result<Json, RelayError> {
            self.sent
                .lock()
                .unwrap()
                .push(serde_json::to_value(request).unwrap());
            if self.fail {
                return Err(RelayError::Transport {
                    status: Some(500),
                    body: "Script error".into(),
                });
            }
            Ok(json!({"ok": true}))
        }
    }

    async fn call(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Json) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(ChangeRelay::new(Arc::new(StubSink::default())));
        let (status, body) = call(app, "GET", "/api/health", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "data": "OK"}));
    }

    #[tokio::test]
    async fn test_order_created_event() {
        let sink = Arc::new(StubSink::default());
        let app = router(ChangeRelay::new(sink.clone()));

        let (status, body) = call(
            app,
            "POST",
            "/events/managers/m1/orders/o1/created",
            r#"{"after": {"payer": "Acme", "amount": 10}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "sent");
        assert_eq!(body["data"]["action"], "createOrder");

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent[0]["managerId"], "m1");
        assert_eq!(sent[0]["id"], "o1");

        println!("✅ Order created event test PASSED");
    }

    #[tokio::test]
    async fn test_skipped_event_is_ok() {
        let sink = Arc::new(StubSink::default());
        let app = router(ChangeRelay::new(sink.clone()));

        let (status, body) = call(app, "POST", "/events/managers/m1/orders/o1/updated", "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "skipped");
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_without_body() {
        let sink = Arc::new(StubSink::default());
        let app = router(ChangeRelay::new(sink.clone()));

        let (status, _) = call(app.clone(), "POST", "/events/managers/m1/orders/o1/deleted", "").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(app, "POST", "/events/managers/m1/plans/2026-06/written", "").await;
        assert_eq!(status, StatusCode::OK);

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent[0]["action"], "deleteOrder");
        assert_eq!(sent[1]["action"], "deletePlan");
        assert_eq!(sent[1]["period"], "2026-06");
    }

    #[tokio::test]
    async fn test_relay_failure_is_bad_gateway() {
        let sink = Arc::new(StubSink {
            fail: true,
            ..StubSink::default()
        });
        let app = router(ChangeRelay::new(sink));

        let (status, body) = call(
            app,
            "POST",
            "/events/managers/m1/plans/2026-06/written",
            r#"{"after": {"goal": 5}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let app = router(ChangeRelay::new(Arc::new(StubSink::default())));

        let (status, body) = call(app.clone(), "POST", "/events/managers/m1/orders/o1/archived", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = call(app, "POST", "/events/managers/m1/orders/o1/created", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
