//! HTTP middleware stack shared by every module router.

use std::time::Duration;

use anyhow::anyhow;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, Response},
    middleware::{from_fn_with_state, Next},
    response::IntoResponse,
    Router,
};
use modkit::api::ApiError;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{field::Empty, Span};

pub fn x_request_id() -> HeaderName {
    HeaderName::from_static("x-request-id")
}

const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// Fresh `x-request-id` for requests that arrive without one.
#[derive(Clone, Copy, Default)]
pub struct MakeUuidRequestId;

impl MakeRequestId for MakeUuidRequestId {
    fn make_request_id<B>(&mut self, _req: &axum::http::Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Some(RequestId::new(id.parse().ok()?))
    }
}

/// Fails a request that outlives `deadline` with the `unknown_error` envelope.
pub async fn request_deadline(
    State(deadline): State<Duration>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    match tokio::time::timeout(deadline, next.run(req)).await {
        Ok(resp) => resp,
        Err(_) => ApiError::fatal(anyhow!(
            "{method} {path} exceeded the {}s request deadline",
            deadline.as_secs()
        ))
        .into_response(),
    }
}

/// Wrap `router` in the middleware stack, outermost first:
/// set request id, propagate request id, trace, deadline, body limit.
///
/// A zero `timeout_sec` disables the deadline.
pub fn apply(router: Router, timeout_sec: u64) -> Router {
    let mut router = router.layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));
    if timeout_sec > 0 {
        router = router.layer(from_fn_with_state(
            Duration::from_secs(timeout_sec),
            request_deadline,
        ));
    }

    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &axum::http::Request<Body>| {
            let rid = req
                .headers()
                .get(x_request_id())
                .and_then(|v| v.to_str().ok())
                .unwrap_or("n/a");
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                path = %req.uri().path(),
                query = req.uri().query().unwrap_or(""),
                request_id = %rid,
                status = Empty,
                latency_ms = Empty
            )
        })
        .on_response(|resp: &Response<Body>, latency: Duration, span: &Span| {
            span.record("status", resp.status().as_u16());
            span.record(
                "latency_ms",
                u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            );
            tracing::debug!(parent: span, "response sent");
        });

    router
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(x_request_id()))
        .layer(SetRequestIdLayer::new(x_request_id(), MakeUuidRequestId))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get};
    use tower::ServiceExt;

    fn slow_app(timeout_sec: u64) -> Router {
        let router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "done"
                }),
            )
            .route("/fast", get(|| async { "done" }));
        apply(router, timeout_sec)
    }

    async fn get_status(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_renders_the_error_envelope() {
        let (status, body) = get_status(slow_app(5), "/slow").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "unknown_error");
        assert!(body["data"].is_null());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_disables_the_deadline() {
        let (status, _) = get_status(slow_app(0), "/slow").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn request_id_is_generated_for_the_response() {
        let req = axum::http::Request::builder()
            .uri("/fast")
            .body(Body::empty())
            .unwrap();
        let resp = slow_app(5).oneshot(req).await.unwrap();
        let rid = resp.headers().get(x_request_id()).unwrap().to_str().unwrap();
        assert_eq!(rid.len(), 32);
        assert!(rid.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
