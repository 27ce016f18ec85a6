use std::{sync::Arc, time::Instant};

use arc_swap::ArcSwap;
use axum::{
    Router,
    body::Body as AxumBody,
    http::{StatusCode, header},
};
use http_body_util::{BodyExt, Limited};
use hyper::{Request, Response};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::{
    adapters::renderer::RendererRegistry,
    core::{dispatcher::Dispatcher, error::DispatchError, request::RequestSnapshot},
    metrics::{DispatchTimer, MODE_UNRESOLVED},
    tracing_setup::create_request_span,
};

/// Response header echoing the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP entry point: buffers the request, hands it to the current
/// [`Dispatcher`] and renders the resolution.
#[derive(Clone)]
pub struct DispatchHandler {
    dispatcher: Arc<ArcSwap<Dispatcher>>,
    renderers: Arc<RendererRegistry>,
    max_body_bytes: usize,
}

impl DispatchHandler {
    pub fn new(
        dispatcher: Arc<ArcSwap<Dispatcher>>,
        renderers: Arc<RendererRegistry>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            dispatcher,
            renderers,
            max_body_bytes,
        }
    }

    /// Axum router sending every request through [`Self::handle_request`]
    pub fn router(self) -> Router {
        let handler = Arc::new(self);
        Router::new()
            .fallback(move |req: Request<AxumBody>| {
                let handler = handler.clone();
                async move { handler.handle_request(req).await }
            })
            .layer(TraceLayer::new_for_http())
    }

    /// Dispatch and render one request. Never fails: every error becomes a
    /// status response. Each response carries the request's `X-Request-ID`.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = create_request_span(req.method().as_str(), req.uri().path(), &request_id);
        let start = Instant::now();

        let mut timer = DispatchTimer::new();
        let mut response = self
            .process(req, &mut timer)
            .instrument(span.clone())
            .await;

        span.record("http.status_code", response.status().as_u16());
        span.record("duration_ms", start.elapsed().as_millis() as u64);
        if let Ok(value) = header::HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }

    async fn process(
        &self,
        req: Request<AxumBody>,
        timer: &mut DispatchTimer,
    ) -> Response<AxumBody> {
        let (parts, body) = req.into_parts();

        let body = match Limited::new(body, self.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!(error = %e, limit = self.max_body_bytes, "Rejected request body");
                timer.finish("body_rejected", 413, MODE_UNRESOLVED);
                return status_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
        };
        let snapshot = match RequestSnapshot::from_parts(&parts, body) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected request path");
                timer.finish(e.label(), e.status().as_u16(), MODE_UNRESOLVED);
                return error_response(&e);
            }
        };

        // Resource probes and handlers are blocking; keep them off the reactor
        let dispatcher = self.dispatcher.load_full();
        let outcome = match tokio::task::spawn_blocking(move || dispatcher.dispatch(snapshot)).await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Dispatch task failed");
                timer.finish("internal", 500, MODE_UNRESOLVED);
                return status_response(StatusCode::INTERNAL_SERVER_ERROR, "Dispatch failed");
            }
        };

        match outcome {
            Ok(resolution) => {
                let mode = resolution.mode.as_str();
                tracing::Span::current().record("dispatch.mode", mode);
                match self.renderers.render(&resolution).await {
                    Ok(response) => {
                        tracing::debug!(view = %resolution.view, "Request resolved");
                        timer.finish("resolved", response.status().as_u16(), mode);
                        response
                    }
                    Err(e) => {
                        tracing::error!(
                            view = %resolution.view,
                            error = %e,
                            "View rendering failed"
                        );
                        timer.finish("render_error", 500, mode);
                        status_response(StatusCode::INTERNAL_SERVER_ERROR, "View rendering failed")
                    }
                }
            }
            Err(e) => {
                timer.finish(e.label(), e.status().as_u16(), MODE_UNRESOLVED);
                error_response(&e)
            }
        }
    }
}

/// Map a dispatch failure to its status response
pub fn error_response(error: &DispatchError) -> Response<AxumBody> {
    let mut response = status_response(error.status(), &error.to_string());
    if let DispatchError::MethodNotAllowed { allowed, .. } = error {
        let allow = allowed
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = allow.parse() {
            response.headers_mut().insert(header::ALLOW, value);
        }
    }
    response
}

fn status_response(status: StatusCode, message: &str) -> Response<AxumBody> {
    let mut response = Response::new(AxumBody::from(message.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
