//! Request tracing.

use std::time::Instant;

use tracing::{Instrument, info, info_span};

use crate::request::Request;
use crate::response::Response;

use super::Next;

/// Wraps the rest of the chain in a `request` span and logs one event per
/// request with its status and latency.
///
/// Added at the head of the root chain unless
/// [`Config::trace_requests`](crate::Config::trace_requests) is turned off,
/// so it sees every request, including ones rejected by later middleware.
pub async fn trace(req: Request, next: Next) -> Response {
    let span = info_span!("request", method = %req.method(), path = %req.path());
    let started = Instant::now();

    let res = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            status = res.status_code().as_u16(),
            latency_us = started.elapsed().as_micros() as u64,
            "request completed"
        );
    });
    res
}
