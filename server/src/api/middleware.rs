//! HTTP middleware (CORS, 404 handler)

use axum::Json;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::core::config::is_all_interfaces;

/// Build the CORS allow-list from the configured bind address.
pub fn cors(host: &str, port: u16) -> CorsLayer {
    let base_hosts: Vec<&str> = if is_all_interfaces(host) || host == "127.0.0.1" || host == "localhost"
    {
        vec!["localhost", "127.0.0.1"]
    } else {
        vec![host]
    };

    let origins: Vec<HeaderValue> = base_hosts
        .iter()
        .map(|h| format!("http://{}:{}", h, port))
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
}

/// Fallback for unknown routes
pub async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": "NOT_FOUND",
                "message": "Unknown route",
            }
        })),
    )
}
