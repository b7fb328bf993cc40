//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::db::Database;
use crate::error::Error;

/// An incoming HTTP request with its body fully read.
///
/// Besides the wire data, a request carries per-request context filled in by
/// the pipeline: path parameters from the matched route and, when the
/// database middleware ran, a handle to the server's connection pool. The
/// context lives and dies with the request; nothing is shared between
/// requests except what the handle itself points at.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) db: Option<Database>,
}

impl Request {
    pub(crate) fn new(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
            params: HashMap::new(),
            db: None,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the first value of a percent-decoded query-string parameter.
    ///
    /// `req.query_param("token")` on `/admin?token=123` returns `Some("123")`.
    pub fn query_param(&self, key: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// The database handle placed on this request by
    /// [`Server::db_connection_middleware`](crate::Server::db_connection_middleware).
    ///
    /// `None` when the request never passed through that middleware, or the
    /// server was built without a connection string.
    pub fn db(&self) -> Option<&Database> {
        self.db.as_ref()
    }

    /// Like [`db`](Request::db), for handlers that cannot do anything useful
    /// without a database.
    pub fn require_db(&self) -> Result<&Database, Error> {
        self.db.as_ref().ok_or(Error::MissingDatabase)
    }

    pub(crate) fn set_db(&mut self, db: Database) {
        self.db = Some(db);
    }
}
