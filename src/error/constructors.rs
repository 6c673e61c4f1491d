use super::types::{Error, Kind};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Creates an `Error` for a request construction failure.
pub fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder).with(e.into())
}

/// Creates an `Error` for a submission against a closed client.
pub fn closed() -> Error {
    Error::new(Kind::Closed)
}

/// Creates an `Error` for a connection establishment failure.
pub fn connect<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connect).with(e.into())
}

/// Creates an `Error` for a response head that never arrived in time.
pub fn timeout() -> Error {
    Error::new(Kind::Timeout)
}

/// Creates an `Error` for a send or malformed-reply failure.
pub fn request<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Request).with(e.into())
}

/// Creates an `Error` for a body stream failure.
pub fn body<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Body).with(e.into())
}
