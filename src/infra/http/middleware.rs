use std::time::Instant;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header::HeaderName},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tag the request with an id, echoed back in `x-request-id`.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

struct Outcome<'a> {
    method: &'a Method,
    path: &'a str,
    status: StatusCode,
    elapsed_ms: u128,
    request_id: &'a str,
}

/// Log every response; 4xx/5xx include the [`ErrorReport`] their handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let outcome = Outcome {
        method: &method,
        path: &path,
        status: response.status(),
        elapsed_ms: start.elapsed().as_millis(),
        request_id: &request_id,
    };

    if outcome.status.is_client_error() || outcome.status.is_server_error() {
        let report = response.extensions_mut().remove::<ErrorReport>();
        log_failure(&outcome, report);
    } else {
        debug!(
            target = "product_sync::http::response",
            status = outcome.status.as_u16(),
            method = %outcome.method,
            path = outcome.path,
            elapsed_ms = outcome.elapsed_ms,
            request_id = outcome.request_id,
            "request completed",
        );
    }

    response
}

fn log_failure(outcome: &Outcome<'_>, report: Option<ErrorReport>) {
    let (source, messages) = match report {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .map(String::as_str)
        .unwrap_or("no diagnostic available");

    if outcome.status.is_server_error() {
        error!(
            target = "product_sync::http::response",
            status = outcome.status.as_u16(),
            method = %outcome.method,
            path = outcome.path,
            elapsed_ms = outcome.elapsed_ms,
            source = source,
            detail = detail,
            chain = ?messages,
            request_id = outcome.request_id,
            "request failed",
        );
    } else {
        warn!(
            target = "product_sync::http::response",
            status = outcome.status.as_u16(),
            method = %outcome.method,
            path = outcome.path,
            elapsed_ms = outcome.elapsed_ms,
            source = source,
            detail = detail,
            chain = ?messages,
            request_id = outcome.request_id,
            "client request error",
        );
    }
}
