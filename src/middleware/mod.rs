//! Middleware layer.
//!
//! A middleware is a chain link with an explicit continuation:
//!
//! ```text
//! async fn name(req: Request, next: Next) -> impl IntoResponse
//! ```
//!
//! Calling [`Next::run`] hands the request to the next link (or, at the end
//! of the chain, to the router). Returning without calling it short-circuits
//! the chain: no later middleware and no handler runs, and the response the
//! middleware returned is what the client sees.
//!
//! ```rust
//! use trellis::middleware::Next;
//! use trellis::{Request, Response, StatusCode};
//!
//! async fn require_token(req: Request, next: Next) -> Response {
//!     if req.query_param("token").as_deref() == Some("123") {
//!         return next.run(req).await;
//!     }
//!     Response::builder()
//!         .status(StatusCode::UNAUTHORIZED)
//!         .text("Authentication failed")
//! }
//! ```
//!
//! Links run strictly in the order they were added to their scope. The
//! list is frozen into a [`Pipeline`] when the server is composed.
//!
//! Built-in middleware:
//! - [`trace`]: per-request span with method, path, status, latency
//! - [`recover`]: answers `500` when anything later in the chain panics
//! - [`db_connection`]: puts the server's database handle on the request

mod db;
mod recover;
mod trace;

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

pub use db::db_connection;
pub use recover::recover;
pub use trace::trace;

/// Internal dispatch interface for middleware, the counterpart of
/// [`ErasedHandler`].
#[doc(hidden)]
pub trait ErasedMiddleware {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedMiddleware = Arc<dyn ErasedMiddleware + Send + Sync + 'static>;

/// Implemented for every valid middleware function. Sealed, like
/// [`Handler`](crate::Handler).
pub trait Middleware: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_middleware(self) -> BoxedMiddleware;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_middleware(self) -> BoxedMiddleware {
        Arc::new(FnMiddleware(self))
    }
}

struct FnMiddleware<F>(F);

impl<F, Fut, R> ErasedMiddleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let fut = (self.0)(req, next);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Continuation ──────────────────────────────────────────────────────────────

/// The rest of the chain after the current middleware.
///
/// `run` takes `self`, so a middleware can continue the chain at most once.
pub struct Next {
    chain: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    /// Hands `req` to the next link and waits for its response.
    pub async fn run(mut self, req: Request) -> Response {
        match self.chain.get(self.index).cloned() {
            Some(link) => {
                self.index += 1;
                link.call(req, self).await
            }
            None => self.endpoint.call(req).await,
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// An ordered middleware chain terminating in a handler, usually a router.
///
/// Built once at composition time and immutable afterwards. A pipeline is
/// itself a handler, which is how a route group's chain gets mounted on the
/// root router.
pub(crate) struct Pipeline {
    chain: Arc<[BoxedMiddleware]>,
    endpoint: BoxedHandler,
}

impl Pipeline {
    pub(crate) fn new(chain: Vec<BoxedMiddleware>, endpoint: BoxedHandler) -> Self {
        Self { chain: chain.into(), endpoint }
    }

    pub(crate) fn len(&self) -> usize {
        self.chain.len()
    }
}

impl ErasedHandler for Pipeline {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Next {
            chain: Arc::clone(&self.chain),
            index: 0,
            endpoint: Arc::clone(&self.endpoint),
        };
        Box::pin(next.run(req))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::Handler;

    fn request(uri: &str) -> Request {
        let (parts, ()) = http::Request::get(uri).body(()).unwrap().into_parts();
        Request::new(parts, Bytes::new())
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> BoxedMiddleware {
        let log = Arc::clone(log);
        (move |req: Request, next: Next| {
            log.lock().unwrap().push(name);
            next.run(req)
        })
        .into_boxed_middleware()
    }

    #[tokio::test]
    async fn links_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let endpoint_log = Arc::clone(&log);
        let endpoint = (move |_req: Request| {
            endpoint_log.lock().unwrap().push("handler");
            async { "done" }
        })
        .into_boxed_handler();

        let chain = vec![recorder(&log, "m1"), recorder(&log, "m2"), recorder(&log, "m3")];
        let pipeline = Pipeline::new(chain, endpoint);
        assert_eq!(pipeline.len(), 3);

        let res = pipeline.call(request("/")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), ["m1", "m2", "m3", "handler"]);
    }

    #[tokio::test]
    async fn link_that_skips_next_halts_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let endpoint_log = Arc::clone(&log);
        let endpoint = (move |_req: Request| {
            endpoint_log.lock().unwrap().push("handler");
            async { "done" }
        })
        .into_boxed_handler();

        let halt = (|_req: Request, _next: Next| async { StatusCode::FORBIDDEN })
            .into_boxed_middleware();
        let chain = vec![recorder(&log, "m1"), halt, recorder(&log, "m3")];

        let res = Pipeline::new(chain, endpoint).call(request("/")).await;
        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(*log.lock().unwrap(), ["m1"]);
    }

    #[tokio::test]
    async fn recover_turns_a_panic_into_500() {
        let endpoint = (|req: Request| async move {
            if req.path() == "/boom" {
                panic!("handler blew up");
            }
            "fine"
        })
        .into_boxed_handler();
        let pipeline = Pipeline::new(vec![recover.into_boxed_middleware()], endpoint);

        let res = pipeline.call(request("/boom")).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = pipeline.call(request("/ok")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body, b"fine");
    }

    #[tokio::test]
    async fn empty_chain_goes_straight_to_endpoint() {
        let endpoint = (|_req: Request| async { "direct" }).into_boxed_handler();
        let res = Pipeline::new(Vec::new(), endpoint).call(request("/")).await;
        assert_eq!(res.body, b"direct");
    }
}
