//! Error types shared by the builder, the client, and the transport layer.

mod constructors;
mod types;

pub use constructors::{body, builder, closed, connect, request, timeout};
pub(crate) use constructors::BoxError;
pub use types::{Error, Kind, Result};
