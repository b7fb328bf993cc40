//! Health-check handlers.
//!
//! | Probe | Question |
//! |---|---|
//! | [`liveness`] | Is the process alive? |
//! | [`readiness`] | Can it serve traffic, database included? |
//!
//! ```rust,no_run
//! use trellis::{Config, Method, Server, health};
//!
//! # async fn run() -> Result<(), trellis::Error> {
//! let mut server = Server::new(Config::new(8000)).await?;
//! let db = server.db_connection_middleware();
//! server.add_middleware(db);
//! server.add_route(Method::GET, "/healthz", health::liveness)?;
//! server.add_route(Method::GET, "/readyz", health::readiness)?;
//! # Ok(())
//! # }
//! ```

use http::StatusCode;
use tracing::warn;

use crate::{Request, Response};

/// Always `200 OK` with body `"ok"`. If the process can answer HTTP at all,
/// it is alive.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"`, or `503` when the request carries a
/// database handle that fails its ping.
///
/// Without the database middleware in front of it this is equivalent to
/// [`liveness`].
pub async fn readiness(req: Request) -> Response {
    if let Some(db) = req.db() {
        if let Err(e) = db.ping().await {
            warn!("readiness: {e}");
            return Response::status(StatusCode::SERVICE_UNAVAILABLE);
        }
    }
    Response::text("ready")
}
