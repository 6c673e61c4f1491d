//! Client configuration.

use std::time::Duration;

/// Tunables for an [`HttpClient`](crate::HttpClient) instance and its
/// default transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Worker threads for the client-owned runtime. `None` uses the
    /// runtime default (one per core).
    pub worker_threads: Option<usize>,

    /// Time allowed for establishing a connection.
    pub connect_timeout: Duration,

    /// Time allowed for the response head to arrive after dispatch. Body
    /// streaming is paced by the handler and is not bounded by this.
    pub request_timeout: Duration,

    /// How long [`close`](crate::HttpClient::close) waits for in-flight
    /// work before abandoning it.
    pub shutdown_grace: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Set the worker thread count.
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the response-head timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
