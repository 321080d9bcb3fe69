//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the axum Router with a single fallback into the engine
//! - Wire up middleware (tracing, request timeout)
//! - Serve until the shutdown broadcast fires

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::dispatch::Response;
use crate::http::{request, response};
use crate::server::Engine;

/// HTTP binding for an [`Engine`].
#[derive(Debug)]
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(engine: Engine) -> Self {
        Self {
            router: Self::build_router(engine),
        }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(engine: Engine) -> Router {
        let timeout = Duration::from_secs(engine.config().timeouts.request_secs);
        Router::new()
            .fallback(dispatch_handler)
            .with_state(engine)
            .layer(TimeoutLayer::new(timeout))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for hosts that mount it themselves.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve connections from `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(
    State(engine): State<Engine>,
    inbound: axum::extract::Request,
) -> axum::response::Response {
    let max_body = engine.config().http.max_body_bytes;
    let request = match request::from_axum(inbound, max_body).await {
        Ok(request) => request,
        Err(e) => return (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response(),
    };

    let sink = Response::new();
    let dispatched = engine.dispatch(request, sink.clone()).await;
    response::into_axum(sink.take(), dispatched.request_id)
}
