//! Server configuration.

use std::fmt;
use std::time::Duration;

use crate::handler::{BoxedHandler, Handler};

/// Everything [`Server::new`](crate::Server::new) needs, built once and
/// passed in by value.
///
/// ```rust
/// use trellis::Config;
///
/// let config = Config::new(8000)
///     .path_prefix("/v1")
///     .connection("mysql|root:root@/golang?charset=utf8");
/// ```
#[derive(Clone)]
pub struct Config {
    pub(crate) port: u16,
    pub(crate) path_prefix: String,
    pub(crate) connection: Option<String>,
    pub(crate) not_found: Option<BoxedHandler>,
    pub(crate) trace_requests: bool,
    pub(crate) recover_panics: bool,
    pub(crate) connect_timeout: Duration,
    pub(crate) max_connections: u32,
}

impl Config {
    /// A configuration listening on `port` with every other setting at its
    /// default. Port `0` is rejected when the server is built.
    pub fn new(port: u16) -> Self {
        Self { port, ..Self::default() }
    }

    /// Prefix prepended to every route and route group. Default `""`.
    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// `driver|dataSourceName`. An empty string means no database.
    pub fn connection(mut self, conn: impl Into<String>) -> Self {
        let conn = conn.into();
        self.connection = (!conn.is_empty()).then_some(conn);
        self
    }

    /// Replaces the built-in `404 page not found` handler, for the root and
    /// every route group.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(handler.into_boxed_handler());
        self
    }

    /// Whether [`middleware::trace`](crate::middleware::trace) heads the root
    /// chain. Default `true`.
    pub fn trace_requests(mut self, enabled: bool) -> Self {
        self.trace_requests = enabled;
        self
    }

    /// Whether [`middleware::recover`](crate::middleware::recover) follows
    /// the tracer in the root chain. Default `true`.
    pub fn recover_panics(mut self, enabled: bool) -> Self {
        self.recover_panics = enabled;
        self
    }

    /// How long opening and pinging the database may take. Default 5 s.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Upper bound on pooled database connections. Default 10.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 0,
            path_prefix: String::new(),
            connection: None,
            not_found: None,
            trace_requests: true,
            recover_panics: true,
            connect_timeout: Duration::from_secs(5),
            max_connections: 10,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("path_prefix", &self.path_prefix)
            .field("connection", &self.connection.as_ref().map(|_| "<redacted>"))
            .field("not_found", &self.not_found.is_some())
            .field("trace_requests", &self.trace_requests)
            .field("recover_panics", &self.recover_panics)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}
