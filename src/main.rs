//! Demo host for the switchyard engine.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   HTTP request  │  http binding ──▶ Engine::dispatch           │
//!   ─────────────▶│                    ├─ filters (ALL, method)  │
//!                 │                    └─ endpoint               │
//!                 │                                              │
//!   WebSocket     │  net listener ──▶ handshake ──▶ frame loop   │
//!   ─────────────▶│                    └─ sub-path handler task  │
//!                 └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::StatusCode;
use clap::Parser;

use switchyard::components::Components;
use switchyard::config::{load_config, EngineConfig};
use switchyard::lifecycle::signals::wait_for_ctrl_c;
use switchyard::net::Listener;
use switchyard::observability::{logging, metrics};
use switchyard::{
    BoxError, Compose, Context, FrameSender, Flow, HttpServer, Request, Response, Server, Shutdown,
    WebSocketServer,
};

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Demo server for the switchyard dispatch engine", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Application-scoped hit counter.
#[derive(Default)]
struct Hits(AtomicU64);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("switchyard v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                metrics::init_metrics(addr);
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut server = Server::new(config.clone());
    server.resolver(|token| Ok(Components::new(token)?.application(Hits::default)))?;
    server.configure(|c| {
        c.filter("/.*", count_hits)?;
        c.get("/health", health)?;
        c.path("/users", |c| {
            c.get("/(\\w+)", user_profile)?;
            Ok(())
        })?;
        c.websocket("/echo", echo)?;
        Ok(())
    })?;
    let engine = server.start()?;

    let shutdown = Shutdown::new();
    let http_listener = Listener::bind(&config.listener.http_address, &config.listener).await?;
    let ws_listener = Listener::bind(&config.listener.websocket_address, &config.listener).await?;

    let http = tokio::spawn(
        HttpServer::new(engine.clone()).run(http_listener.into_inner(), shutdown.subscribe()),
    );
    let ws = tokio::spawn(WebSocketServer::new(engine).run(ws_listener, shutdown.subscribe()));

    wait_for_ctrl_c(shutdown).await;

    http.await??;
    ws.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn count_hits(_req: Arc<Request>, _res: Response, ctx: Context) -> Result<Flow, BoxError> {
    ctx.dep::<Hits>()?.0.fetch_add(1, Ordering::Relaxed);
    Ok(Flow::Continue)
}

async fn health(_req: Arc<Request>, res: Response, ctx: Context) -> Result<(), BoxError> {
    let hits = ctx.dep::<Hits>()?.0.load(Ordering::Relaxed);
    res.insert_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    res.write(serde_json::json!({ "status": "ok", "hits": hits }).to_string());
    Ok(())
}

async fn user_profile(_req: Arc<Request>, res: Response, ctx: Context) -> Result<(), BoxError> {
    let Some(name) = ctx.param("1") else {
        res.reset(StatusCode::BAD_REQUEST, "missing user");
        return Ok(());
    };
    res.write(format!("User profile: {name}"));
    Ok(())
}

async fn echo(message: Vec<u8>, sender: FrameSender, _ctx: Context) -> Result<(), BoxError> {
    sender.send_frame(message).await?;
    Ok(())
}
