//! Checkout entry point
//!
//! The caller-facing pipeline endpoint: inbound HTTP headers become the
//! carrier, the configured pipeline runs, and the composite response maps
//! onto an HTTP status. Only a fatal pipeline outcome produces an
//! error-class status; a degraded request is still a success.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::api::types::ApiError;
use crate::domain::pipeline::Pipeline;
use crate::trace::Carrier;

#[derive(Clone)]
pub struct CheckoutState {
    pub pipeline: Arc<Pipeline>,
}

/// Caller-facing request: the domain input handed to every stage.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub order: JsonValue,
}

pub fn routes(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/checkout", post(checkout))
        .with_state(CheckoutState { pipeline })
}

async fn checkout(
    State(state): State<CheckoutState>,
    headers: HeaderMap,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return ApiError::bad_request("INVALID_BODY", rejection.body_text()).into_response();
        }
    };

    let carrier = carrier_from_headers(&headers);
    let response = state.pipeline.run(&carrier, &request.order).await;

    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(response)).into_response()
}

/// Convert inbound HTTP headers into a carrier, preserving header order.
fn carrier_from_headers(headers: &HeaderMap) -> Carrier {
    let mut carrier = Carrier::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            carrier.set(name.as_str(), value);
        }
    }
    carrier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::downstream::{DownstreamCall, DownstreamError};
    use crate::domain::pipeline::{FailurePolicy, PipelineStats, Stage};
    use crate::trace::{LogSink, Tracer};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    const SAMPLE: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    struct StaticCall {
        fail: bool,
    }

    #[async_trait]
    impl DownstreamCall for StaticCall {
        async fn call(
            &self,
            _carrier: &Carrier,
            _body: &JsonValue,
        ) -> Result<JsonValue, DownstreamError> {
            if self.fail {
                Err(DownstreamError::Status { status: 500 })
            } else {
                Ok(json!({"ok": true}))
            }
        }
    }

    fn make_router(fail: bool) -> Router {
        let tracer = Arc::new(Tracer::new(Arc::new(LogSink)));
        let stats = Arc::new(PipelineStats::new());
        let stages = vec![Stage::new(
            "query",
            Arc::new(StaticCall { fail }),
            FailurePolicy::Fatal,
            Duration::from_millis(250),
        )];
        let pipeline = Arc::new(Pipeline::new(tracer, stages, stats, "checkout"));
        routes(pipeline)
    }

    fn checkout_request(body: &str, traceparent: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/checkout")
            .header("content-type", "application/json");
        if let Some(tp) = traceparent {
            builder = builder.header("traceparent", tp);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_checkout_continues_inbound_trace() {
        let app = make_router(false);
        let response = app
            .oneshot(checkout_request(r#"{"order": {"sku": "A-1"}}"#, Some(SAMPLE)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["trace_id"], json!("4bf92f3577b34da6a3ce929d0e0e4736"));
        assert_eq!(body["is_root_span"], json!(false));
        assert_eq!(body["services_called"], json!(["query"]));
    }

    #[tokio::test]
    async fn test_checkout_without_carrier_originates_trace() {
        let app = make_router(false);
        let response = app
            .oneshot(checkout_request(r#"{"order": {}}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["is_root_span"], json!(true));
        assert_eq!(body["trace_id"].as_str().unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_checkout_fatal_outcome_maps_to_502() {
        let app = make_router(true);
        let response = app
            .oneshot(checkout_request(r#"{"order": {}}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["stage"], json!("query"));
    }

    #[tokio::test]
    async fn test_checkout_rejects_malformed_body() {
        let app = make_router(false);
        let response = app
            .oneshot(checkout_request("{not json", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
