//! Asynchronous HTTP request/response client.
//!
//! Callers build an immutable [`HttpRequest`], submit it through
//! [`HttpClient::execute`] together with a [`ResponseHandler`], and
//! receive an [`ExecutionHandle`] over the eventual application result.
//! The handler converts the real response (or the transport failure that
//! prevented one) into the application's own types; the handle's blocking
//! accessors deliver that result with its type preserved end-to-end.
//!
//! ```no_run
//! use httpcall::{HttpClient, RequestBuilder, handler_fn};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//!
//! let request = RequestBuilder::prepare_get()
//!     .uri_str("http://localhost:8080/road/to/nowhere")?
//!     .header("foo", "bar")
//!     .build()?;
//!
//! let handle = client.execute(
//!     request,
//!     handler_fn(
//!         |_request, response| response.into_body().text(),
//!         |_request, error| error,
//!     ),
//! )?;
//!
//! let body: String = handle.get()?;
//! # let _ = body;
//! client.close();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod transport;

pub use client::{Cancelled, ClientStatsSnapshot, ExecutionError, ExecutionHandle, HttpClient};
pub use config::ClientConfig;
pub use error::{Error, Kind, Result};
pub use handler::{ResponseHandler, handler_fn};
pub use http::{HttpRequest, HttpResponse, RequestBuilder, ResponseBody};
pub use transport::{HyperTransport, Transport};
