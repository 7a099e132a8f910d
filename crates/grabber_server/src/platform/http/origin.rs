use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grabber_logging::{grabber_debug, grabber_info, grabber_warn};
use serde_json::json;

use super::constants::{ALLOWED_METHODS, MSG_ORIGIN_REJECTED};
use super::AppState;

/// Rejects requests from origins outside the allow-list and decorates the
/// rest with the matching CORS headers. Requests without `Origin` pass.
pub(crate) async fn origin_guard(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let origin = match req.headers().get(ORIGIN) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(origin) if state.config.is_origin_allowed(origin) => Some(value.clone()),
            _ => {
                grabber_warn!("{method} {path} rejected for origin {value:?}");
                return reject();
            }
        },
    };

    let mut resp = if method == Method::OPTIONS {
        preflight(req.headers())
    } else {
        next.run(req).await
    };

    if let Some(origin) = origin {
        let headers = resp.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }

    if method == Method::OPTIONS {
        grabber_debug!("{method} {path} -> {}", resp.status().as_u16());
    } else {
        grabber_info!("{method} {path} -> {}", resp.status().as_u16());
    }
    resp
}

fn preflight(request_headers: &HeaderMap) -> Response {
    let mut resp = StatusCode::NO_CONTENT.into_response();
    let headers = resp.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    let allow_headers = request_headers
        .get(ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("Content-Type"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allow_headers);
    resp
}

fn reject() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "success": false, "message": MSG_ORIGIN_REJECTED })),
    )
        .into_response()
}
