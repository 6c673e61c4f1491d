//! HTTP request type and its staging builder.
//!
//! `HttpRequest` is an immutable value describing a single exchange: verb,
//! absolute URI, ordered header multimap, and optional body. Requests are
//! produced exclusively through `RequestBuilder`, whose `prepare_*` verb
//! factories pre-seed the method the same way each call site expects to use
//! it. Building consumes the builder, so the header map is never aliased
//! between a built request and later builder mutation.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::error::{self, Error};

/// Immutable description of a single HTTP exchange.
///
/// Header names are normalized to lowercase per HTTP field semantics, while
/// duplicate names preserve their values in insertion order (`get_all`
/// yields them in the order they were appended).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    uri: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl HttpRequest {
    /// Get the HTTP method.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the absolute request URI.
    #[inline]
    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Get the header multimap.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the request body, if one was set.
    #[inline]
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

/// Mutable staging object that accumulates method, URI, headers, and body,
/// and produces an [`HttpRequest`] on [`build`](RequestBuilder::build).
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    uri: Option<Url>,
    headers: HeaderMap,
    body: Option<Bytes>,
    // Deferred construction failure, reported at build() time so the
    // fluent chain stays infallible.
    error: Option<Error>,
}

impl RequestBuilder {
    fn prepare(method: Method) -> Self {
        Self {
            method,
            uri: None,
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Start a GET request.
    #[must_use]
    pub fn prepare_get() -> Self {
        Self::prepare(Method::GET)
    }

    /// Start a POST request.
    #[must_use]
    pub fn prepare_post() -> Self {
        Self::prepare(Method::POST)
    }

    /// Start a PUT request.
    #[must_use]
    pub fn prepare_put() -> Self {
        Self::prepare(Method::PUT)
    }

    /// Start a DELETE request.
    #[must_use]
    pub fn prepare_delete() -> Self {
        Self::prepare(Method::DELETE)
    }

    /// Start a HEAD request.
    #[must_use]
    pub fn prepare_head() -> Self {
        Self::prepare(Method::HEAD)
    }

    /// Start a request with an arbitrary method.
    #[must_use]
    pub fn prepare_method(method: Method) -> Self {
        Self::prepare(method)
    }

    /// Set the target URI. `Url` values are absolute by construction, so
    /// this cannot fail; use [`uri_str`](Self::uri_str) to parse from text.
    #[must_use]
    pub fn uri(mut self, uri: Url) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Parse and set the target URI from a string.
    ///
    /// # Errors
    ///
    /// Returns a builder error if the string is not an absolute URI.
    pub fn uri_str(self, uri: &str) -> Result<Self, Error> {
        let parsed = Url::parse(uri).map_err(error::builder)?;
        Ok(self.uri(parsed))
    }

    /// Append a header without overwriting existing values for the same
    /// name. Repeated names keep their values in insertion order.
    ///
    /// Invalid names or values are rejected at [`build`](Self::build) time
    /// rather than silently dropped.
    #[must_use]
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: Into<crate::error::BoxError>,
        V: TryInto<HeaderValue>,
        V::Error: Into<crate::error::BoxError>,
    {
        let name: Result<HeaderName, crate::error::BoxError> = name.try_into().map_err(Into::into);
        let value: Result<HeaderValue, crate::error::BoxError> =
            value.try_into().map_err(Into::into);
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            (Err(e), _) | (_, Err(e)) => {
                if self.error.is_none() {
                    self.error = Some(error::builder(e));
                }
            }
        }
        self
    }

    /// Set the request body, replacing any prior body.
    #[must_use]
    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a UTF-8 text body, replacing any prior body.
    #[must_use]
    pub fn body_text<S: Into<String>>(self, body: S) -> Self {
        self.body(Bytes::from(body.into()))
    }

    /// Produce the immutable [`HttpRequest`], consuming the builder.
    ///
    /// # Errors
    ///
    /// Returns a builder error if no URI was set, or if an earlier call in
    /// the chain recorded a deferred failure (e.g. an invalid header name).
    pub fn build(self) -> Result<HttpRequest, Error> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let uri = self.uri.ok_or_else(|| error::builder("request URI is not set"))?;
        Ok(HttpRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body,
        })
    }
}
