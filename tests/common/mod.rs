#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use trellis::{App, Config, Server, StatusCode};

/// A server with request tracing off, so only the middleware a test adds
/// is in the chain.
pub async fn server(prefix: &str) -> Server {
    Server::new(Config::new(8000).path_prefix(prefix).trace_requests(false))
        .await
        .expect("server builds without a database")
}

pub async fn send(app: &App, method: &str, uri: &str) -> (StatusCode, String) {
    let req = http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap();
    let res = app.handle(req).await;
    let status = res.status();
    let body = res.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

pub async fn get(app: &App, uri: &str) -> (StatusCode, String) {
    send(app, "GET", uri).await
}
