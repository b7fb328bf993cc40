//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use http::StatusCode;
use tracing::error;

use crate::request::Request;
use crate::response::Response;

use super::Next;

/// Turns a panic anywhere further down the chain into a `500`.
///
/// Without it a panicking handler takes its connection down with it and
/// the client sees a reset instead of a response. Added to the root chain
/// right after [`trace`](super::trace) unless
/// [`Config::recover_panics`](crate::Config::recover_panics) is turned off.
pub async fn recover(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.path().to_owned();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => {
            error!(%method, %path, panic = panic_message(panic.as_ref()), "handler panicked");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}
