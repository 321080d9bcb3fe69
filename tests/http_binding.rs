//! The axum binding driven by a real HTTP client.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use switchyard::{BoxError, Compose, Context, EngineConfig, HttpServer, Request, Response, Server, Shutdown};

struct Running {
    addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), std::io::Error>>,
}

async fn start(config: EngineConfig) -> Running {
    let mut server = Server::new(config);
    server
        .configure(|c| {
            c.get("/users/(\\w+)", |_req: Arc<Request>, res: Response, ctx: Context| async move {
                res.write(format!("User profile: {}", ctx.param("1").unwrap_or_default()));
                Ok::<(), BoxError>(())
            })?;
            c.post("/echo", |req: Arc<Request>, res: Response, _ctx: Context| async move {
                res.set_status(StatusCode::CREATED);
                res.insert_header(
                    axum::http::header::CONTENT_TYPE,
                    axum::http::HeaderValue::from_static("text/plain"),
                );
                let query = req.query.clone().unwrap_or_default();
                res.write(format!("{}|{}", query, req.body_text().unwrap_or_default()));
                Ok::<(), BoxError>(())
            })?;
            Ok(())
        })
        .unwrap();
    let engine = server.start().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(HttpServer::new(engine).run(listener, shutdown.subscribe()));
    Running {
        addr,
        shutdown,
        task,
    }
}

#[tokio::test]
async fn serves_profiles_and_request_ids() {
    let running = start(EngineConfig::default()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("http://{}/users/Jimmy", running.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap();
    assert!(uuid::Uuid::parse_str(&request_id).is_ok());
    assert_eq!(res.text().await.unwrap(), "User profile: Jimmy");

    let res = client
        .get(format!("http://{}/users/Jimmy/extra", running.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);

    running.shutdown.trigger();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn passes_body_query_and_headers_through() {
    let running = start(EngineConfig::default()).await;
    let res = reqwest::Client::new()
        .post(format!("http://{}/echo?lang=en", running.addr))
        .body("ping")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 201);
    assert_eq!(
        res.headers().get("content-type").unwrap().to_str().unwrap(),
        "text/plain"
    );
    assert_eq!(res.text().await.unwrap(), "lang=en|ping");

    running.shutdown.trigger();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn rejects_oversized_bodies_and_unknown_methods() {
    let mut config = EngineConfig::default();
    config.http.max_body_bytes = 8;
    let running = start(config).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("http://{}/echo", running.addr))
        .body("far more than eight bytes")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 413);

    let brew = reqwest::Method::from_bytes(b"BREW").unwrap();
    let res = client
        .request(brew, format!("http://{}/users/Jimmy", running.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 405);

    running.shutdown.trigger();
    running.task.await.unwrap().unwrap();
}
