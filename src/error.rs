//! Unified error type.

use http::Method;

/// The error type returned by trellis's fallible operations.
///
/// Application-level errors (401, 404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. A middleware that
/// refuses to call `next` is not an error either. This type surfaces
/// construction and infrastructure failures: bad configuration, an
/// unreachable database, conflicting routes, binding to a port.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The [`Config`](crate::Config) is unusable: missing port, malformed
    /// connection string.
    #[error("configuration: {0}")]
    Configuration(String),

    /// The database pool could not be opened or failed its ping.
    #[error("connectivity: {0}")]
    Connectivity(#[source] sqlx::Error),

    /// A route or mount point clashes with one already registered.
    #[error("route `{method} {path}`: {reason}")]
    Route {
        method: Method,
        path: String,
        reason: String,
    },

    /// Two route groups resolve to the same prefix.
    #[error("mount `{prefix}`: prefix already taken by another route group")]
    Mount { prefix: String },

    /// A query issued through [`Database`](crate::Database) failed.
    #[error("query: {0}")]
    Query(#[source] sqlx::Error),

    /// [`Request::require_db`](crate::Request::require_db) was called on a
    /// request that never passed through the database middleware.
    #[error("no database handle on this request")]
    MissingDatabase,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
