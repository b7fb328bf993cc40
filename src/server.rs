//! Server construction, composition and the accept loop.
//!
//! # Lifecycle
//!
//! 1. [`Server::new`] validates the [`Config`] and, if a connection string
//!    is given, opens and pings the database. Nothing is returned unless
//!    every step succeeded.
//! 2. Routes, middleware and route groups are registered.
//! 3. [`Server::start`] (or [`Server::build`]) composes the routing tree
//!    once: every group's middleware is put in front of its router and the
//!    result mounted under the group prefix; the root middleware is then
//!    put in front of the root router. Both take `self`, so a server can
//!    only be composed once.
//!
//! # Shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets every in-flight
//! connection finish, and then returns from `start`.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{Database, PoolSettings};
use crate::error::Error;
use crate::group::{Route, RouteGroup, Scope};
use crate::handler::{BoxedHandler, ErasedHandler, Handler};
use crate::middleware::{self, Middleware, Pipeline};
use crate::request::Request;
use crate::response::Response;
use crate::router::{self, join, normalize_prefix};

/// The root scope of a service: routes, middleware, route groups and an
/// optional database handle.
pub struct Server {
    port: u16,
    root: Scope,
    groups: Vec<RouteGroup>,
    db: Option<Database>,
    not_found: BoxedHandler,
}

impl Server {
    /// Builds a server from `config`.
    ///
    /// Fails with [`Error::Configuration`] for port `0` or a connection
    /// string without `|`, and with [`Error::Connectivity`] when the
    /// database cannot be opened or does not answer a ping.
    pub async fn new(config: Config) -> Result<Self, Error> {
        if config.port == 0 {
            return Err(Error::Configuration("missing required port".to_owned()));
        }

        let db = match config.connection.as_deref() {
            Some(conn) => {
                let settings = PoolSettings {
                    connect_timeout: config.connect_timeout,
                    max_connections: config.max_connections,
                };
                Some(Database::connect(conn, settings).await?)
            }
            None => None,
        };

        let not_found = config
            .not_found
            .unwrap_or_else(|| router::not_found.into_boxed_handler());

        let mut root = Scope::new(normalize_prefix(&config.path_prefix), Arc::clone(&not_found));
        if config.trace_requests {
            root.add_middleware(middleware::trace);
        }
        if config.recover_panics {
            root.add_middleware(middleware::recover);
        }

        Ok(Self { port: config.port, root, groups: Vec::new(), db, not_found })
    }

    /// Registers `handler` for `method` at the server prefix + `path`.
    ///
    /// With prefix `/v1`, `"/foo"` answers on `/v1/foo` and `""` on exactly
    /// `/v1`. Registering the same method and resolved path twice fails
    /// with [`Error::Route`] and leaves the first registration in place.
    pub fn add_route(&mut self, method: Method, path: &str, handler: impl Handler) -> Result<(), Error> {
        self.root.add_route(method, path, handler)
    }

    /// Appends a middleware to the root chain. Root middleware runs for
    /// every request, route groups included, before any group middleware.
    pub fn add_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.root.add_middleware(middleware);
        self
    }

    /// Creates a route group mounted at the server prefix + `prefix` and
    /// returns it for configuration.
    pub fn new_route_group(&mut self, prefix: &str) -> &mut RouteGroup {
        let resolved = normalize_prefix(&join(&self.root.prefix, prefix));
        let scope = Scope::new(resolved, Arc::clone(&self.not_found));
        self.groups.push(RouteGroup::new(prefix, scope));
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }

    /// A middleware that puts this server's database handle on each request.
    /// See [`Request::db`].
    pub fn db_connection_middleware(&self) -> impl Middleware + use<> {
        middleware::db_connection(self.db.clone())
    }

    pub fn database(&self) -> Option<&Database> {
        self.db.as_ref()
    }

    pub fn port(&self) -> u16 { self.port }

    /// Routes registered directly on the server, in registration order.
    pub fn routes(&self) -> &[Route] { self.root.routes() }

    pub fn route_groups(&self) -> &[RouteGroup] { &self.groups }

    /// Composes the routing tree without binding a socket.
    ///
    /// Fails with [`Error::Mount`] if two route groups resolve to the same
    /// prefix.
    pub fn build(self) -> Result<App, Error> {
        let Self { port, mut root, groups, .. } = self;

        for group in groups {
            let prefix = group.scope.prefix.clone();
            root.mount(&prefix, group.scope.into_pipeline())?;
        }

        Ok(App { port, pipeline: Arc::new(root.into_pipeline()) })
    }

    /// Composes the routing tree, binds `0.0.0.0:port` and serves until
    /// SIGTERM or Ctrl-C.
    pub async fn start(self) -> Result<(), Error> {
        let app = self.build()?;
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], app.port))).await?;
        app.serve(listener, shutdown_signal()).await
    }
}

// ── Composed application ─────────────────────────────────────────────────────

/// A composed, immutable routing tree ready to answer requests.
pub struct App {
    port: u16,
    pipeline: Arc<Pipeline>,
}

impl App {
    pub fn port(&self) -> u16 { self.port }

    /// Runs one request through the full pipeline in-process.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Display,
    {
        dispatch(&self.pipeline, req).await
    }

    /// Serves connections from `listener` until `shutdown` resolves, then
    /// drains in-flight connections and returns.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let addr = listener.local_addr()?;
        let pipeline = self.pipeline;

        info!(%addr, "trellis listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let pipeline = Arc::clone(&pipeline);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let pipeline = Arc::clone(&pipeline);
                            async move { Ok::<_, Infallible>(dispatch(&pipeline, req).await) }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("trellis stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Reads the body, wraps the request and runs it through the root pipeline.
async fn dispatch<B>(pipeline: &Pipeline, req: http::Request<B>) -> http::Response<Full<Bytes>>
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(path = %parts.uri.path(), "failed to read request body: {e}");
            return Response::status(StatusCode::BAD_REQUEST).into_inner();
        }
    };

    pipeline.call(Request::new(parts, body)).await.into_inner()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM or Ctrl-C. A signal that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
