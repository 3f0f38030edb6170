//! Webhook ingress endpoint: POST /webhook.
//!
//! The raw body is authenticated against `X-Vikunja-Signature` (or the bare
//! `X-Signature`) before anything is parsed. Authentication failures answer
//! 401; every other rejection (unknown kind, schema mismatch, garbage) is
//! logged and acknowledged with 200 so Vikunja does not retry it.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;
use vikord_events::ingest;

const SIGNATURE_HEADERS: [&str; 2] = ["x-vikunja-signature", "x-signature"];

fn signature(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
}

/// POST /webhook
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let event = match ingest(state.validator.as_ref(), &body, signature(&headers)) {
        Ok(event) => event,
        Err(e) if e.is_auth_failure() => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "authentication failed", "code": e.code()})),
            ));
        }
        Err(e) => {
            return Ok(Json(
                json!({"ok": true, "skipped": e.to_string(), "code": e.code()}),
            ))
        }
    };

    let receipt_id = uuid::Uuid::new_v4().to_string();
    info!(event_kind = %event.kind(), receipt_id = %receipt_id, "webhook accepted");

    // Delivery runs on its own task; the sender only needs the ack.
    let state = Arc::clone(&state);
    tokio::spawn(async move {
        crate::route::dispatch(&state, &event).await;
    });

    Ok(Json(json!({"ok": true, "receipt_id": receipt_id})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use vikord_events::SignatureValidator;

    use crate::app::build_router;
    use crate::testing::test_state;

    const BODY: &str = r#"{"event_name":"task.created","time":"2026-10-19T10:00:00Z","data":{"task":{"id":42,"title":"Fix bug","project_id":3},"doer":{"id":1,"username":"u1"}}}"#;

    fn post(body: &str, header: Option<(&str, String)>) -> Request<Body> {
        let mut req = Request::post("/webhook").header("content-type", "application/json");
        if let Some((name, value)) = header {
            req = req.header(name, value);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn signed_webhook_is_accepted() {
        let (state, _) = test_state(Some("s3cret"));
        let sig = SignatureValidator::new("s3cret").sign(BODY.as_bytes()).unwrap();

        let resp = build_router(state)
            .oneshot(post(BODY, Some(("X-Vikunja-Signature", sig))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(json_body(resp).await["receipt_id"].is_string());
    }

    #[tokio::test]
    async fn bare_signature_header_is_accepted() {
        let (state, _) = test_state(Some("s3cret"));
        let sig = SignatureValidator::new("s3cret").sign(BODY.as_bytes()).unwrap();
        let resp = build_router(state)
            .oneshot(post(BODY, Some(("X-Signature", sig))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_or_wrong_signature_is_401() {
        let (state, _) = test_state(Some("s3cret"));
        let app = build_router(state);

        let resp = app.clone().oneshot(post(BODY, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["code"], "AUTH_FAILED");

        let wrong = SignatureValidator::new("other").sign(BODY.as_bytes()).unwrap();
        let resp = app
            .oneshot(post(BODY, Some(("X-Vikunja-Signature", wrong))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_kind_is_acknowledged_and_skipped() {
        let (state, _) = test_state(None);
        let resp = build_router(state)
            .oneshot(post(r#"{"event_name":"label.created","data":{}}"#, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert!(body["skipped"].is_string());
        assert_eq!(body["code"], "UNKNOWN_EVENT");
    }

    #[tokio::test]
    async fn garbage_body_is_acknowledged_with_its_code() {
        let (state, _) = test_state(None);
        let resp = build_router(state)
            .oneshot(post("not json", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["code"], "MALFORMED_BODY");
    }

    #[tokio::test]
    async fn health_reports_jobs() {
        let (state, _) = test_state(None);
        let resp = build_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["scheduled_jobs"], 0);
    }
}
