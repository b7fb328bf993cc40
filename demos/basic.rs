//! Minimal trellis service — a database-backed index, a token-guarded admin
//! group and health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic -- --connection 'sqlite|:memory:'
//!
//! Try:
//!   curl http://localhost:8000/
//!   curl http://localhost:8000/admin
//!   curl 'http://localhost:8000/admin?token=123'
//!   curl http://localhost:8000/readyz

use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trellis::middleware::Next;
use trellis::{Config, IntoResponse, Json, Method, Request, Response, Server, StatusCode, health};

#[derive(Debug, Parser)]
#[command(about = "trellis example service")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Prefix of the service that appears in every URL
    #[arg(long, env = "PREFIX", default_value = "")]
    prefix: String,

    /// Database connection string, `driver|dataSourceName`
    #[arg(long, env = "CONNECTION", default_value = "mysql|root:root@/golang?charset=utf8")]
    connection: String,
}

#[derive(Serialize)]
struct Welcome {
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), trellis::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::new(args.port)
        .path_prefix(args.prefix)
        .connection(args.connection);

    let mut server = Server::new(config).await?;

    let db = server.db_connection_middleware();
    server.add_middleware(db);
    server.add_route(Method::GET, "/", index)?;
    server.add_route(Method::GET, "/healthz", health::liveness)?;
    server.add_route(Method::GET, "/readyz", health::readiness)?;

    let admin = server.new_route_group("/admin");
    admin.add_middleware(|req: Request, next: Next| async move {
        info!("route specific middleware: only for admins");
        next.run(req).await
    });
    admin.add_middleware(terrible_auth);
    admin.add_route(Method::GET, "", |_req: Request| async { "admin" })?;
    admin.add_route(Method::GET, "/foo", |_req: Request| async { "woop 2 foo" })?;

    server.start().await
}

// GET / — reports which database the pool is connected to.
async fn index(req: Request) -> Response {
    let db = match req.require_db() {
        Ok(db) => db,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    match db.database_name().await {
        Ok(name) => Json(Welcome {
            message: format!("Welcome to trellis you are connected to database: {name}"),
        })
        .into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

// Rejects every request without `?token=123`.
async fn terrible_auth(req: Request, next: Next) -> Response {
    info!("performing authentication check");
    if req.query_param("token").as_deref() == Some("123") {
        return next.run(req).await;
    }
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .text("Authentication failed")
}
