//! # trellis
//!
//! Assemble an HTTP service from a root router, path-prefixed route groups
//! with their own middleware, and an optional pooled SQL handle.
//!
//! ## The model
//!
//! A [`Server`] is the root scope. Each [`RouteGroup`] is a child scope with
//! its own prefix, router and middleware. At start the tree is composed
//! once:
//!
//! ```text
//! request ──▶ root middleware ──▶ root router ─┬─▶ root route
//!                                              └─▶ /admin mount ──▶ group middleware ──▶ group route
//! ```
//!
//! - Root middleware runs for every request, first.
//! - Group middleware runs only for requests under the group's prefix.
//! - Within a chain, middleware runs in the order it was added; one that
//!   does not call `next` ends the request with its own response.
//!
//! Matching is a radix tree per method via [`matchit`]; connections are
//! served by hyper over tokio; the database is a `sqlx` pool chosen by the
//! connection string's driver name.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trellis::middleware::Next;
//! use trellis::{Config, Json, Method, Request, Response, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), trellis::Error> {
//!     let config = Config::new(8000)
//!         .path_prefix("/v1")
//!         .connection("mysql|root:root@/golang?charset=utf8");
//!     let mut server = Server::new(config).await?;
//!
//!     let db = server.db_connection_middleware();
//!     server.add_middleware(db);
//!     server.add_route(Method::GET, "/", index)?;
//!
//!     let admin = server.new_route_group("/admin");
//!     admin.add_middleware(require_token);
//!     admin.add_route(Method::GET, "", |_req: Request| async { "admin" })?;
//!
//!     server.start().await
//! }
//!
//! async fn index(req: Request) -> Response {
//!     let Ok(db) = req.require_db() else {
//!         return Response::status(StatusCode::INTERNAL_SERVER_ERROR);
//!     };
//!     match db.database_name().await {
//!         Ok(name) => Json(serde_json::json!({ "database": name })).into_response(),
//!         Err(_) => Response::status(StatusCode::SERVICE_UNAVAILABLE),
//!     }
//! }
//!
//! async fn require_token(req: Request, next: Next) -> Response {
//!     if req.query_param("token").as_deref() == Some("123") {
//!         return next.run(req).await;
//!     }
//!     Response::builder()
//!         .status(StatusCode::UNAUTHORIZED)
//!         .text("Authentication failed")
//! }
//! # use trellis::IntoResponse;
//! ```

mod config;
mod db;
mod error;
mod group;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod health;
pub mod middleware;

pub use config::Config;
pub use db::{ConnectionString, Database};
pub use error::Error;
pub use group::{Route, RouteGroup};
pub use handler::Handler;
pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Json, Response, ResponseBuilder};
pub use server::{App, Server};
