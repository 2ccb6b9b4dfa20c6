//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router feeding every request into the dispatch graph
//! - Wire up middleware (tracing, timeout, request ID)
//! - Strip the configured root prefix before dispatch
//! - Run synchronous dispatch off the async runtime
//! - Map dispatch outcomes to HTTP status codes
//! - Observability (metrics, correlation IDs)

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::dispatch::{DispatchContext, DispatchError, NodeGraph, NodeId, PathCursor, RequestState};
use crate::enumerate::RouteTable;
use crate::http::request::{self, UuidRequestId};
use crate::http::response::BufferedResponse;
use crate::observability::metrics;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<NodeGraph>,
    pub root: NodeId,
    pub routes: Arc<RouteTable>,
    /// Segments every request path must start with.
    pub prefix: Arc<[String]>,
}

impl AppState {
    pub fn new(graph: Arc<NodeGraph>, root: NodeId, routes: Arc<RouteTable>, prefix: Option<&str>) -> Self {
        let prefix: Vec<String> = PathCursor::from_uri(prefix.unwrap_or("/")).segments().to_vec();
        Self {
            graph,
            root,
            routes,
            prefix: prefix.into(),
        }
    }

    /// Move the cursor past the root prefix; false if the path is outside it.
    fn strip_prefix(&self, cursor: &mut PathCursor) -> bool {
        if !cursor.segments().starts_with(&self.prefix) {
            return false;
        }
        cursor.skip(self.prefix.len()).is_ok()
    }
}

/// HTTP front end for a dispatch graph.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `graph` from `root`.
    pub fn new(config: AppConfig, graph: Arc<NodeGraph>, root: NodeId, routes: Arc<RouteTable>) -> Self {
        let state = AppState::new(graph, root, routes, config.dispatch.root_prefix.as_deref());
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for embedding or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `signal` completes.
    pub async fn run_until<F>(self, listener: TcpListener, signal: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.server.request_timeout_secs,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Feeds one request through the dispatch graph.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request::request_id(request.headers());
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %path,
        "Dispatching request"
    );

    let mut cursor = PathCursor::from_uri(&path);
    if !state.strip_prefix(&mut cursor) {
        tracing::debug!(request_id = %request_id, path = %path, "Path outside root prefix");
        metrics::record_dispatch(RequestState::NotFound, start_time);
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    let task_request_id = request_id.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let mut sink = BufferedResponse::new(task_request_id);
        let mut ctx = DispatchContext::new(cursor, &mut sink, state.routes.as_ref());
        let result = state.graph.dispatch(state.root, &mut ctx);
        drop(ctx);
        (result, sink)
    })
    .await;

    let (result, sink) = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Dispatch task failed");
            metrics::record_dispatch(RequestState::Fatal, start_time);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    metrics::record_dispatch(RequestState::from_result(&result), start_time);

    match result {
        Ok(_) => sink.into_response(),
        Err(DispatchError::NotFound { .. }) | Err(DispatchError::Exhausted { .. }) => {
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
        Err(DispatchError::Rejected { status, reason }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
            tracing::debug!(request_id = %request_id, status = %status, reason = %reason, "Request rejected");
            (status, reason).into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Dispatch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
