//! The client: runtime ownership, dispatch, and shutdown.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Runtime;

use crate::client::handle::{CompletionGuard, ExecutionHandle, Outcome, Shared};
use crate::client::stats::{ClientStats, ClientStatsSnapshot};
use crate::config::ClientConfig;
use crate::error::{self, Result};
use crate::handler::ResponseHandler;
use crate::http::HttpRequest;
use crate::transport::{HyperTransport, Transport};

/// Asynchronous HTTP client with caller-supplied response handlers.
///
/// The client owns a dedicated multi-thread runtime: transport I/O and
/// handler invocation run there, never on the caller's thread. Cloning is
/// cheap and clones share the runtime, transport, and counters. The
/// runtime's lifecycle is explicit: [`close`](Self::close) releases every
/// pooled resource, after which [`execute`](Self::execute) fails with a
/// closed-client error.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    runtime: Mutex<Option<Runtime>>,
    stats: Arc<ClientStats>,
}

impl HttpClient {
    /// Create a client with default configuration and the hyper transport.
    ///
    /// # Errors
    ///
    /// Returns a builder error if the runtime cannot be started.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with the given configuration and the hyper
    /// transport.
    ///
    /// # Errors
    ///
    /// Returns a builder error if the runtime cannot be started.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(HyperTransport::new(&config));
        Self::with_transport(config, transport)
    }

    /// Create a client over a custom [`Transport`].
    ///
    /// # Errors
    ///
    /// Returns a builder error if the runtime cannot be started.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all().thread_name("httpcall-worker");
        if let Some(threads) = config.worker_threads {
            builder.worker_threads(threads);
        }
        let runtime = builder.build().map_err(error::builder)?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                transport,
                runtime: Mutex::new(Some(runtime)),
                stats: Arc::new(ClientStats::default()),
            }),
        })
    }

    /// Dispatch `request` and hand the eventual outcome to `handler`.
    ///
    /// Never blocks: the transport call is scheduled on the client's
    /// runtime and a handle over the eventual result is returned
    /// immediately. On transport success the handler's `handle` runs with
    /// the real response; on transport failure its `handle_error` maps the
    /// cause to the application error. Exactly one of the two is invoked,
    /// on a blocking worker thread, and the handle resolves exactly once.
    ///
    /// # Errors
    ///
    /// Fails synchronously only when the client is closed. Everything
    /// else surfaces through the returned handle.
    pub fn execute<H: ResponseHandler>(
        &self,
        request: HttpRequest,
        handler: H,
    ) -> Result<ExecutionHandle<H::Output, H::Error>> {
        let runtime = self
            .inner
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(runtime) = runtime.as_ref() else {
            return Err(error::closed());
        };

        self.inner.stats.record_dispatch();
        tracing::debug!(method = %request.method(), uri = %request.uri(), "dispatching request");

        let shared = Arc::new(Shared::new(Arc::clone(&self.inner.stats)));
        let task_shared = Arc::clone(&shared);
        let transport = Arc::clone(&self.inner.transport);

        let join = runtime.spawn(async move {
            // Until the handler slot is claimed, tearing this task down
            // (cancel, shutdown) must still resolve the handle.
            let mut guard = CompletionGuard::new(Arc::clone(&task_shared));
            let sent = transport.send(&request).await;

            if !task_shared.begin_handler() {
                // Cancellation won the race; the handler never runs.
                return;
            }
            guard.disarm();

            let blocking_shared = Arc::clone(&task_shared);
            let blocking_guard = CompletionGuard::new(task_shared);
            tokio::task::spawn_blocking(move || {
                let mut blocking_guard = blocking_guard;
                let outcome = match sent {
                    Ok(response) => {
                        match catch_unwind(AssertUnwindSafe(|| handler.handle(&request, response)))
                        {
                            Ok(Ok(value)) => Outcome::Resolved(value),
                            Ok(Err(error)) => Outcome::Failed(error),
                            Err(panic) => Outcome::Panicked(panic),
                        }
                    }
                    Err(cause) => {
                        tracing::debug!(error = %cause, "transport failure routed to handler");
                        match catch_unwind(AssertUnwindSafe(|| {
                            handler.handle_error(&request, cause)
                        })) {
                            Ok(mapped) => Outcome::Failed(mapped),
                            Err(panic) => Outcome::Panicked(panic),
                        }
                    }
                };
                blocking_shared.finish(outcome);
                blocking_guard.disarm();
            });
        });

        Ok(ExecutionHandle::new(shared, join.abort_handle()))
    }

    /// Release the runtime and every pooled resource. In-flight
    /// executions are given [`shutdown_grace`](ClientConfig::shutdown_grace)
    /// to finish; abandoned ones resolve their handles to cancelled.
    /// Idempotent. Must be called from outside the client's runtime.
    pub fn close(&self) {
        let runtime = self
            .inner
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            tracing::debug!("closing http client");
            runtime.shutdown_timeout(self.inner.config.shutdown_grace);
        }
    }

    /// True once [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Point-in-time execution counters.
    #[must_use]
    pub fn stats(&self) -> ClientStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("closed", &self.is_closed())
            .field("config", &self.inner.config)
            .finish()
    }
}
