//! Default transport over hyper's HTTP/1.1 client.

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::ClientConfig;
use crate::error::{self, Error, Result};
use crate::http::{HttpRequest, HttpResponse, ResponseBody};
use crate::transport::Transport;

// Frames in flight between the wire and a slow-reading handler.
const BODY_CHANNEL_DEPTH: usize = 8;

/// [`Transport`] backed by the hyper legacy pooled client.
///
/// The connect timeout is enforced by the connector; the request timeout
/// bounds only the arrival of the response head, since body pacing belongs
/// to the handler.
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    request_timeout: Duration,
}

impl HyperTransport {
    /// Build a transport from the client configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            request_timeout: config.request_timeout,
        }
    }

    fn to_wire(request: &HttpRequest) -> Result<http::Request<Full<Bytes>>> {
        let uri: http::Uri = request.uri().as_str().parse().map_err(error::builder)?;
        let mut wire = http::Request::builder()
            .method(request.method().clone())
            .uri(uri)
            .body(Full::new(request.body().cloned().unwrap_or_default()))
            .map_err(error::builder)?;
        *wire.headers_mut() = request.headers().clone();
        Ok(wire)
    }
}

impl Transport for HyperTransport {
    fn send<'a>(&'a self, request: &'a HttpRequest) -> BoxFuture<'a, Result<HttpResponse>> {
        Box::pin(async move {
            let wire = Self::to_wire(request)?;
            let url = request.uri().clone();

            let reply = tokio::time::timeout(self.request_timeout, self.client.request(wire))
                .await
                .map_err(|_| error::timeout().with_url(url.clone()))?
                .map_err(|e| classify(e).with_url(url))?;

            let (parts, incoming) = reply.into_parts();
            let reason = reason_phrase(&parts);

            let (tx, rx) = mpsc::channel(BODY_CHANNEL_DEPTH);
            tokio::spawn(pump_body(incoming, tx));

            Ok(HttpResponse::new(
                parts.status,
                reason,
                parts.headers,
                ResponseBody::new(rx),
            ))
        })
    }
}

fn classify(error: hyper_util::client::legacy::Error) -> Error {
    if error.is_connect() {
        error::connect(error)
    } else {
        error::request(error)
    }
}

/// Reason phrase from the status line, only when it differs from the
/// canonical phrase for the status code.
fn reason_phrase(parts: &http::response::Parts) -> Option<String> {
    let phrase = parts.extensions.get::<hyper::ext::ReasonPhrase>()?;
    let text = std::str::from_utf8(phrase.as_bytes()).ok()?;
    if parts.status.canonical_reason() == Some(text) {
        None
    } else {
        Some(text.to_owned())
    }
}

/// Pull frames off the wire and feed the one-shot body reader. Stops as
/// soon as the reader is dropped.
async fn pump_body(
    mut incoming: hyper::body::Incoming,
    tx: mpsc::Sender<std::result::Result<Bytes, Error>>,
) {
    loop {
        match incoming.frame().await {
            Some(Ok(frame)) => {
                if let Ok(data) = frame.into_data() {
                    if !data.is_empty() && tx.send(Ok(data)).await.is_err() {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                drop(tx.send(Err(error::body(e))).await);
                return;
            }
            None => return,
        }
    }
}
