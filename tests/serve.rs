//! Serving over a real socket, with graceful shutdown.

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use trellis::{Method, Request, StatusCode};

mod common;

#[tokio::test]
async fn serves_composed_app_until_shutdown() {
    let mut s = common::server("/v1/prefix").await;
    s.add_route(Method::GET, "/endpoint", |_req: Request| async { "foo" }).unwrap();
    let app = s.build().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(app.serve(listener, async {
        let _ = stopped.await;
    }));

    let client = reqwest::Client::new();
    let res = client
        .get(format!("http://{addr}/v1/prefix/endpoint"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), StatusCode::OK.as_u16());
    assert_eq!(res.text().await.unwrap(), "foo");

    let res = client.get(format!("http://{addr}/nope")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 404);

    drop(client);
    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn panicking_handler_answers_500_and_keeps_serving() {
    let mut s = common::server("").await;
    s.add_route(Method::GET, "/boom", |_req: Request| async {
        if true {
            panic!("handler blew up");
        }
        "unreachable"
    })
    .unwrap();
    s.add_route(Method::GET, "/ok", |_req: Request| async { "still here" }).unwrap();
    let app = s.build().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(app.serve(listener, async {
        let _ = stopped.await;
    }));

    let client = reqwest::Client::new();
    let res = client.get(format!("http://{addr}/boom")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), StatusCode::INTERNAL_SERVER_ERROR.as_u16());

    let res = client.get(format!("http://{addr}/ok")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), StatusCode::OK.as_u16());
    assert_eq!(res.text().await.unwrap(), "still here");

    drop(client);
    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}
