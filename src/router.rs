//! Radix-tree request router with prefix mounts.
//!
//! One tree per HTTP method, O(path-length) lookup via [`matchit`]. On top
//! of exact routes a router holds *mounts*: handlers (in practice, route
//! group pipelines) that own every path at or below a prefix.
//!
//! Resolution order for a request:
//!
//! 1. a route registered for the request's method and path;
//! 2. the mount with the longest prefix covering the path;
//! 3. `405` if the path is registered under other methods;
//! 4. `301` to the registered form if the path only differs by a trailing slash;
//! 5. the not-found handler.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::Response;

pub(crate) struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    mounts: Vec<(String, BoxedHandler)>,
    not_found: BoxedHandler,
}

enum Resolution {
    Route(BoxedHandler, HashMap<String, String>),
    Mount(BoxedHandler),
    MethodNotAllowed(Vec<Method>),
    Redirect(String),
    NotFound,
}

impl Router {
    pub(crate) fn new(not_found: BoxedHandler) -> Self {
        Self { routes: HashMap::new(), mounts: Vec::new(), not_found }
    }

    /// Binds `handler` to an already-resolved path. Duplicates and patterns
    /// that conflict with an existing one are rejected; the first
    /// registration stays in effect.
    pub(crate) fn insert(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler,
    ) -> Result<(), Error> {
        self.routes
            .entry(method.clone())
            .or_default()
            .insert(path, handler)
            .map_err(|e| Error::Route { method, path: path.to_owned(), reason: e.to_string() })
    }

    /// Hands every request at or below `prefix` to `handler`.
    pub(crate) fn mount(&mut self, prefix: &str, handler: BoxedHandler) -> Result<(), Error> {
        if self.mounts.iter().any(|(p, _)| p == prefix) {
            return Err(Error::Mount { prefix: prefix.to_owned() });
        }
        self.mounts.push((prefix.to_owned(), handler));
        Ok(())
    }

    fn route(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    fn resolve(&self, method: &Method, path: &str, query: Option<&str>) -> Resolution {
        if let Some((handler, params)) = self.route(method, path) {
            return Resolution::Route(handler, params);
        }

        let mount = self.mounts.iter()
            .filter(|(prefix, _)| covers(prefix, path))
            .max_by_key(|(prefix, _)| prefix.len());
        if let Some((_, handler)) = mount {
            return Resolution::Mount(Arc::clone(handler));
        }

        let mut allowed: Vec<Method> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(m, _)| m.clone())
            .collect();
        if !allowed.is_empty() {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            return Resolution::MethodNotAllowed(allowed);
        }

        let toggled = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed.to_owned(),
            Some(_) => return Resolution::NotFound,
            None => format!("{path}/"),
        };
        if self.route(method, &toggled).is_some() {
            let location = match query {
                Some(q) => format!("{toggled}?{q}"),
                None => toggled,
            };
            return Resolution::Redirect(location);
        }

        Resolution::NotFound
    }
}

impl ErasedHandler for Router {
    fn call(&self, mut req: Request) -> BoxFuture {
        match self.resolve(&req.method, &req.path, req.query.as_deref()) {
            Resolution::Route(handler, params) => {
                req.params = params;
                handler.call(req)
            }
            Resolution::Mount(handler) => handler.call(req),
            Resolution::MethodNotAllowed(allowed) => {
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                Box::pin(async move {
                    Response::builder()
                        .status(StatusCode::METHOD_NOT_ALLOWED)
                        .header("allow", &allow)
                        .no_body()
                })
            }
            Resolution::Redirect(location) => Box::pin(async move {
                Response::builder()
                    .status(StatusCode::MOVED_PERMANENTLY)
                    .header("location", &location)
                    .no_body()
            }),
            Resolution::NotFound => self.not_found.call(req),
        }
    }
}

/// Built-in not-found handler.
pub(crate) async fn not_found(_req: Request) -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .text("404 page not found")
}

// ── Path resolution ──────────────────────────────────────────────────────────

/// Normalises a scope prefix: leading `/`, no trailing `/`, and `""` for the
/// root.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Resolves `path` against a normalised `prefix`.
///
/// An empty prefix leaves the path alone; an empty path (or `/`) under a
/// non-empty prefix is the prefix itself. There is always exactly one `/`
/// at the seam.
pub(crate) fn join(prefix: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => format!("/{path}"),
        (false, true) => prefix.to_owned(),
        (false, false) => format!("{prefix}/{path}"),
    }
}

/// Whether a mount at `prefix` owns `path`: the prefix itself or anything
/// below it, on segment boundaries.
fn covers(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::Handler;

    fn request(method: Method, uri: &str) -> Request {
        let (parts, ()) = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        Request::new(parts, Bytes::new())
    }

    fn router() -> Router {
        Router::new(not_found.into_boxed_handler())
    }

    fn text(body: &'static str) -> BoxedHandler {
        (move |_req: Request| async move { body }).into_boxed_handler()
    }

    #[test]
    fn joins_prefix_and_path() {
        assert_eq!(join("/v1", "/foo"), "/v1/foo");
        assert_eq!(join("/v1", ""), "/v1");
        assert_eq!(join("/v1", "/"), "/v1");
        assert_eq!(join("/v1", "foo"), "/v1/foo");
        assert_eq!(join("", "/foo"), "/foo");
        assert_eq!(join("", ""), "/");
        assert_eq!(join("/v1/prefix", "/admin"), "/v1/prefix/admin");
    }

    #[test]
    fn normalizes_prefixes() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("v1/"), "/v1");
        assert_eq!(normalize_prefix("/v1/prefix/"), "/v1/prefix");
    }

    #[test]
    fn mount_covers_segments_only() {
        assert!(covers("/admin", "/admin"));
        assert!(covers("/admin", "/admin/"));
        assert!(covers("/admin", "/admin/users"));
        assert!(!covers("/admin", "/administrator"));
        assert!(!covers("/admin", "/"));
        assert!(covers("", "/anything"));
    }

    #[test]
    fn duplicate_route_is_rejected_and_first_wins() {
        let mut r = router();
        r.insert(Method::GET, "/foo", text("first")).unwrap();
        let err = r.insert(Method::GET, "/foo", text("second")).unwrap_err();
        assert!(matches!(err, Error::Route { ref path, .. } if path == "/foo"));
        // Same path under another method is a different route.
        r.insert(Method::POST, "/foo", text("post")).unwrap();
    }

    #[test]
    fn duplicate_mount_is_rejected() {
        let mut r = router();
        r.mount("/admin", text("a")).unwrap();
        assert!(matches!(r.mount("/admin", text("b")), Err(Error::Mount { .. })));
    }

    #[tokio::test]
    async fn first_registration_stays_in_effect() {
        let mut r = router();
        r.insert(Method::GET, "/foo", text("first")).unwrap();
        let _ = r.insert(Method::GET, "/foo", text("second"));
        let res = r.call(request(Method::GET, "/foo")).await;
        assert_eq!(res.body, b"first");
    }

    #[tokio::test]
    async fn captures_path_params() {
        let mut r = router();
        let echo = (|req: Request| async move {
            req.param("id").unwrap_or("none").to_owned()
        })
        .into_boxed_handler();
        r.insert(Method::GET, "/users/{id}", echo).unwrap();
        let res = r.call(request(Method::GET, "/users/42")).await;
        assert_eq!(res.body, b"42");
    }

    #[tokio::test]
    async fn route_beats_mount_and_longest_mount_wins() {
        let mut r = router();
        r.insert(Method::GET, "/admin/health", text("route")).unwrap();
        r.mount("/admin", text("admin")).unwrap();
        r.mount("/admin/users", text("users")).unwrap();

        assert_eq!(r.call(request(Method::GET, "/admin/health")).await.body, b"route");
        assert_eq!(r.call(request(Method::GET, "/admin/x")).await.body, b"admin");
        assert_eq!(r.call(request(Method::GET, "/admin/users/7")).await.body, b"users");
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow() {
        let mut r = router();
        r.insert(Method::GET, "/foo", text("get")).unwrap();
        r.insert(Method::PUT, "/foo", text("put")).unwrap();
        let res = r.call(request(Method::DELETE, "/foo")).await;
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(res.headers.contains(&("allow".to_owned(), "GET, PUT".to_owned())));
    }

    #[tokio::test]
    async fn trailing_slash_redirects_to_registered_form() {
        let mut r = router();
        r.insert(Method::GET, "/foo", text("foo")).unwrap();
        r.insert(Method::GET, "/bar/", text("bar")).unwrap();

        let res = r.call(request(Method::GET, "/foo/?a=1")).await;
        assert_eq!(res.status_code(), StatusCode::MOVED_PERMANENTLY);
        assert!(res.headers.contains(&("location".to_owned(), "/foo?a=1".to_owned())));

        let res = r.call(request(Method::GET, "/bar")).await;
        assert!(res.headers.contains(&("location".to_owned(), "/bar/".to_owned())));
    }

    #[tokio::test]
    async fn unknown_path_uses_not_found_handler() {
        let res = router().call(request(Method::GET, "/nope")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.body, b"404 page not found");
    }
}
