//! Caller-supplied response handling capability.
//!
//! A handler converts the eventual outcome of one execution into an
//! application result: `handle` maps a real response to `Output`, and
//! `handle_error` maps a transport failure (connection refused, timeout,
//! I/O error, malformed reply) to the application error type. Exactly one
//! of the two runs per execution, on the client's worker — never on the
//! caller's thread.

use std::marker::PhantomData;

use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse};

/// Converts a completed response, or a transport failure, into an
/// application-specific result.
///
/// An `Err` returned from [`handle`](Self::handle) is a handler failure:
/// it becomes the failure outcome of the handle, typed exactly as
/// returned, and is NOT routed through
/// [`handle_error`](Self::handle_error) — that path is reserved for
/// failures where no response ever arrived.
pub trait ResponseHandler: Send + 'static {
    /// Result of a successfully handled response.
    type Output: Send + 'static;

    /// Application error produced on either failure path.
    type Error: Send + 'static;

    /// Map a received response to the application result. The handler owns
    /// the response and decides how much of the one-shot body to drain.
    fn handle(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<Self::Output, Self::Error>;

    /// Map a transport failure to the application error. The returned
    /// value resolves the handle as its failure outcome.
    fn handle_error(&self, request: &HttpRequest, error: Error) -> Self::Error;
}

/// Build a [`ResponseHandler`] from a pair of closures, one per outcome
/// path. Suited to call sites that want a fresh handler per request.
pub fn handler_fn<T, E, F, G>(on_response: F, on_error: G) -> impl ResponseHandler<Output = T, Error = E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(&HttpRequest, HttpResponse) -> Result<T, E> + Send + 'static,
    G: Fn(&HttpRequest, Error) -> E + Send + 'static,
{
    FnHandler {
        on_response,
        on_error,
        _marker: PhantomData,
    }
}

struct FnHandler<T, E, F, G> {
    on_response: F,
    on_error: G,
    _marker: PhantomData<fn() -> (T, E)>,
}

impl<T, E, F, G> ResponseHandler for FnHandler<T, E, F, G>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(&HttpRequest, HttpResponse) -> Result<T, E> + Send + 'static,
    G: Fn(&HttpRequest, Error) -> E + Send + 'static,
{
    type Output = T;
    type Error = E;

    fn handle(&self, request: &HttpRequest, response: HttpResponse) -> Result<T, E> {
        (self.on_response)(request, response)
    }

    fn handle_error(&self, request: &HttpRequest, error: Error) -> E {
        (self.on_error)(request, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{RequestBuilder, ResponseBody};
    use http::{HeaderMap, StatusCode};

    fn request() -> HttpRequest {
        RequestBuilder::prepare_get()
            .uri_str("http://localhost:8080/")
            .expect("absolute uri")
            .build()
            .expect("request")
    }

    #[test]
    fn handler_fn_routes_responses() {
        let handler = handler_fn(
            |_req, response: HttpResponse| Ok::<u16, String>(response.status_code()),
            |_req, error| error.to_string(),
        );
        let response = HttpResponse::new(
            StatusCode::OK,
            None,
            HeaderMap::new(),
            ResponseBody::from_bytes(""),
        );
        assert_eq!(handler.handle(&request(), response), Ok(200));
    }

    #[test]
    fn handler_fn_routes_failures() {
        let handler = handler_fn(
            |_req, response: HttpResponse| Ok::<u16, String>(response.status_code()),
            |_req, error| error.to_string(),
        );
        let mapped = handler.handle_error(&request(), crate::error::closed());
        assert_eq!(mapped, "client is closed");
    }
}
