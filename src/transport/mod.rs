//! Transport seam between the client and the wire.
//!
//! The client depends only on this narrow contract: hand over a request,
//! get back a response head plus a one-shot body stream, or a transport
//! error. Connection management, TLS, and protocol negotiation all live
//! behind it.

mod hyper;

use futures::future::BoxFuture;

pub use self::hyper::HyperTransport;

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};

/// Performs the actual network I/O for one request.
///
/// Implementations construct the [`HttpResponse`](crate::HttpResponse) as
/// soon as the reply head is fully received and stream the body through
/// the response's [`ResponseBody`](crate::ResponseBody) as the handler
/// reads it. A returned error means no response ever arrived and is routed
/// to the handler's `handle_error`.
pub trait Transport: Send + Sync + 'static {
    /// Send the request and produce the response head.
    fn send<'a>(&'a self, request: &'a HttpRequest) -> BoxFuture<'a, Result<HttpResponse>>;
}
