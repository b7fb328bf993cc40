//! Routing scopes: the root of a [`Server`](crate::Server) and its
//! [`RouteGroup`]s.
//!
//! A scope owns a prefix, a router, a middleware list and the routes
//! registered on it. Routes are bound into the router as soon as they are
//! added; middleware is only collected, because a pipeline can only be
//! built from the final list.

use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{BoxedMiddleware, Middleware, Pipeline};
use crate::router::{Router, join};

/// A registered route, as resolved against its scope's prefix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Route {
    method: Method,
    path: String,
}

impl Route {
    pub fn method(&self) -> &Method { &self.method }

    /// The full path the route answers on, prefixes included.
    pub fn path(&self) -> &str { &self.path }
}

pub(crate) struct Scope {
    pub(crate) prefix: String,
    router: Router,
    middleware: Vec<BoxedMiddleware>,
    routes: Vec<Route>,
}

impl Scope {
    pub(crate) fn new(prefix: String, not_found: BoxedHandler) -> Self {
        Self { prefix, router: Router::new(not_found), middleware: Vec::new(), routes: Vec::new() }
    }

    pub(crate) fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
    ) -> Result<(), Error> {
        let resolved = join(&self.prefix, path);
        self.router.insert(method.clone(), &resolved, handler.into_boxed_handler())?;
        debug!(%method, path = %resolved, "route registered");
        self.routes.push(Route { method, path: resolved });
        Ok(())
    }

    pub(crate) fn add_middleware(&mut self, middleware: impl Middleware) {
        self.middleware.push(middleware.into_boxed_middleware());
    }

    pub(crate) fn mount(&mut self, prefix: &str, pipeline: Pipeline) -> Result<(), Error> {
        let links = pipeline.len();
        self.router.mount(prefix, Arc::new(pipeline))?;
        debug!(prefix, middleware = links, "route group mounted");
        Ok(())
    }

    pub(crate) fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Freezes the middleware list in front of the router.
    pub(crate) fn into_pipeline(self) -> Pipeline {
        Pipeline::new(self.middleware, Arc::new(self.router))
    }
}

/// A path-prefixed sub-router with its own middleware.
///
/// Obtained from [`Server::new_route_group`](crate::Server::new_route_group).
/// Its middleware runs only for requests under its prefix, after the
/// server's root middleware. Routes registered here are resolved against
/// the server prefix followed by the group prefix.
///
/// ```rust,no_run
/// # use trellis::{Config, Method, Request, Response, Server, StatusCode};
/// # use trellis::middleware::Next;
/// # async fn run() -> Result<(), trellis::Error> {
/// let mut server = Server::new(Config::new(8000).path_prefix("/v1")).await?;
///
/// let admin = server.new_route_group("/admin");
/// admin.add_middleware(|req: Request, next: Next| async move {
///     if req.header("x-admin").is_none() {
///         return Response::status(StatusCode::FORBIDDEN);
///     }
///     next.run(req).await
/// });
/// admin.add_route(Method::GET, "/stats", |_req: Request| async { "stats" })?; // GET /v1/admin/stats
/// # Ok(())
/// # }
/// ```
pub struct RouteGroup {
    path: String,
    pub(crate) scope: Scope,
}

impl RouteGroup {
    pub(crate) fn new(path: &str, scope: Scope) -> Self {
        Self { path: path.to_owned(), scope }
    }

    /// Registers `handler` for `method` at the group prefix + `path`.
    ///
    /// An empty `path` (or `/`) is the group prefix itself. Registering the
    /// same method and resolved path twice fails with [`Error::Route`].
    pub fn add_route(&mut self, method: Method, path: &str, handler: impl Handler) -> Result<(), Error> {
        self.scope.add_route(method, path, handler)
    }

    /// Appends a middleware to this group's chain.
    pub fn add_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.scope.add_middleware(middleware);
        self
    }

    /// The prefix as passed to `new_route_group`.
    pub fn path(&self) -> &str { &self.path }

    /// The resolved mount point, server prefix included.
    pub fn prefix(&self) -> &str { &self.scope.prefix }

    pub fn routes(&self) -> &[Route] { self.scope.routes() }
}
