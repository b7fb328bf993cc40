//! Database-context middleware.

use crate::db::Database;
use crate::request::Request;

use super::{Middleware, Next};

/// Places `db` in the typed database slot of every request passing through,
/// then continues the chain.
///
/// Usually obtained through
/// [`Server::db_connection_middleware`](crate::Server::db_connection_middleware).
/// With `None` the middleware is a plain pass-through and handlers see
/// [`Request::db`] return `None`.
pub fn db_connection(db: Option<Database>) -> impl Middleware {
    move |mut req: Request, next: Next| {
        if let Some(db) = &db {
            req.set_db(db.clone());
        }
        next.run(req)
    }
}
