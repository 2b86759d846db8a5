//! nginx `auth_http` adapter.
//!
//! nginx sends the login attempt as request headers and expects the verdict
//! back as `Auth-*` response headers. Each request maps to one backend query
//! with the `nginx` verb.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
};

use crate::backend::{Backend, BackendError};
use crate::observability::metrics;
use crate::protocol::{Query, Response, Status, Value};

/// Verb of every HTTP-origin query.
pub const NGINX_VERB: &str = "nginx";

/// Request headers forwarded to the backend, with their object keys.
pub const FORWARDED_HEADERS: [(&str, &str); 5] = [
    ("auth-user", "user"),
    ("auth-pass", "pass"),
    ("auth-protocol", "protocol"),
    ("auth-login-attempt", "attempt"),
    ("client-ip", "client"),
];

pub const AUTH_STATUS: HeaderName = HeaderName::from_static("auth-status");
pub const AUTH_SERVER: HeaderName = HeaderName::from_static("auth-server");
pub const AUTH_PORT: HeaderName = HeaderName::from_static("auth-port");
pub const AUTH_WAIT: HeaderName = HeaderName::from_static("auth-wait");

const INVALID_LOGIN: &str = "Invalid login or password";
const RETRY_WAIT_SECS: &str = "5";

/// Build the backend query; absent or non-text headers become empty strings.
pub fn query_from_headers(headers: &HeaderMap) -> Query {
    Query::new(
        NGINX_VERB,
        Value::fields(FORWARDED_HEADERS.iter().map(|(header, key)| {
            let value = headers
                .get(*header)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            (*key, value)
        })),
    )
}

/// Turn a backend outcome into the response nginx expects.
pub fn render(outcome: Result<Response, BackendError>) -> HttpResponse {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Backend call failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match (response.status, &response.data) {
        (Status::Found, data @ Value::Map(_)) => {
            let upstream = data
                .str_field("host")
                .zip(data.str_field("port"))
                .and_then(|(host, port)| Some((HeaderValue::from_str(host).ok()?, HeaderValue::from_str(port).ok()?)));
            match upstream {
                Some((host, port)) => (
                    StatusCode::OK,
                    [
                        (AUTH_STATUS, HeaderValue::from_static("OK")),
                        (AUTH_SERVER, host),
                        (AUTH_PORT, port),
                    ],
                )
                    .into_response(),
                None => contract_violation(&response),
            }
        }
        (Status::NotFound, Value::Map(_)) => (
            StatusCode::OK,
            [
                (AUTH_STATUS, HeaderValue::from_static(INVALID_LOGIN)),
                (AUTH_WAIT, HeaderValue::from_static(RETRY_WAIT_SECS)),
            ],
        )
            .into_response(),
        _ => contract_violation(&response),
    }
}

fn contract_violation(response: &Response) -> HttpResponse {
    tracing::error!(response = ?response, "Unexpected backend response");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Axum handler for every auth_http request.
pub async fn auth_handler<B: Backend>(State(backend): State<Arc<B>>, headers: HeaderMap) -> HttpResponse {
    let query = query_from_headers(&headers);
    tracing::debug!(
        protocol = query.object.str_field("protocol").unwrap_or_default(),
        client = query.object.str_field("client").unwrap_or_default(),
        "Auth request"
    );
    let started = Instant::now();
    let outcome = backend.request(&query).await;
    metrics::record_backend_call("http", started.elapsed());

    let response = render(outcome);
    let label = match (response.status(), response.headers().get(AUTH_STATUS)) {
        (StatusCode::OK, Some(status)) if status == "OK" => "found",
        (StatusCode::OK, _) => "not_found",
        _ => "failed",
    };
    metrics::record_request("http", label);
    response
}
