use std::error::Error as StdError;
use std::fmt;

/// A Result alias where the Err case is `httpcall::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur building requests or executing them
/// against a transport.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync>>,
    url: Option<url::Url>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Malformed request construction (missing or relative URI, bad header).
    Builder,
    /// The client was closed before the request was submitted.
    Closed,
    /// Connection could not be established.
    Connect,
    /// The response head did not arrive in time.
    Timeout,
    /// The request failed while being sent or the reply was malformed.
    Request,
    /// The response body stream failed mid-read.
    Body,
}

impl Error {
    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                source: None,
                url: None,
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub(crate) fn with<E: Into<Box<dyn StdError + Send + Sync>>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: url::Url) -> Error {
        self.inner.url = Some(url);
        self
    }

    /// Get the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Get the URL associated with this error, if any.
    #[must_use]
    pub fn url(&self) -> Option<&url::Url> {
        self.inner.url.as_ref()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("httpcall::Error");

        f.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        if let Some(ref url) = self.inner.url {
            f.field("url", url);
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self.inner.kind {
            Kind::Builder => "builder error",
            Kind::Closed => "client is closed",
            Kind::Connect => "error connecting to server",
            Kind::Timeout => "request timeout",
            Kind::Request => "error sending request",
            Kind::Body => "response body error",
        };
        f.write_str(msg)?;
        if let Some(ref url) = self.inner.url {
            write!(f, " for url ({url})")?;
        }
        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

// Classification helpers used by callers to branch on transport failures
// without matching on `Kind` directly.
impl Error {
    /// True if the connection to the server could not be established.
    #[must_use]
    pub fn is_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::Connect)
    }

    /// True if the response head did not arrive within the configured timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::Timeout)
    }

    /// True if the error was caused by submitting to a closed client.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.inner.kind, Kind::Closed)
    }

    /// True if the request could not be built.
    #[must_use]
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// True if the response body stream failed mid-read.
    #[must_use]
    pub fn is_body(&self) -> bool {
        matches!(self.inner.kind, Kind::Body)
    }
}
