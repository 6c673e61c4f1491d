//! HTTP response type with a one-shot body stream.
//!
//! A response is created by the transport once the reply head (status line
//! and headers) has been fully received. The body is NOT buffered by the
//! client: it is exposed as a [`ResponseBody`] that pulls frames from the
//! wire as the handler reads them, exactly once. Reading after the handler
//! returns is undefined; the reader then reports end-of-stream because the
//! connection may already be closed.

use std::io::Read;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::error::{self, Error};

/// Read-only view over a received reply.
#[derive(Debug)]
pub struct HttpResponse {
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    body: ResponseBody,
}

impl HttpResponse {
    /// Create a response from its received parts.
    ///
    /// `reason` carries the status line's reason phrase only when the
    /// server supplied a non-canonical one. Called by transport
    /// implementations; application code receives responses through its
    /// [`ResponseHandler`](crate::ResponseHandler).
    #[must_use]
    pub fn new(
        status: StatusCode,
        reason: Option<String>,
        headers: HeaderMap,
        body: ResponseBody,
    ) -> Self {
        Self {
            status,
            reason,
            headers,
            body,
        }
    }

    /// Get the status code.
    #[inline]
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the status code as a bare integer.
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Get the custom reason phrase, absent unless the server supplied one
    /// that differs from the canonical phrase for the status code.
    #[inline]
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Get the header multimap. Duplicate names preserve value order.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Consume the response and take ownership of its body stream.
    #[must_use]
    pub fn into_body(self) -> ResponseBody {
        self.body
    }
}

/// One-shot readable byte stream over the response body.
///
/// Implements [`std::io::Read`] for incremental consumption; the drain
/// helpers ([`bytes`](Self::bytes), [`text`](Self::text),
/// [`json`](Self::json)) consume the stream in full. Reads block the
/// handler's worker thread while waiting for the next frame from the wire,
/// so they must not be issued from async context.
#[derive(Debug)]
pub struct ResponseBody {
    rx: mpsc::Receiver<Result<Bytes, Error>>,
    chunk: Bytes,
    done: bool,
}

impl ResponseBody {
    /// Wrap a channel of body frames pumped by the transport.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<Result<Bytes, Error>>) -> Self {
        Self {
            rx,
            chunk: Bytes::new(),
            done: false,
        }
    }

    /// A body consisting of a single in-memory chunk. Intended for
    /// transport implementations and tests that already hold the bytes.
    #[must_use]
    pub fn from_bytes<B: Into<Bytes>>(bytes: B) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let chunk = bytes.into();
        if !chunk.is_empty() {
            // Capacity 1 on a fresh channel: the send cannot fail.
            drop(tx.try_send(Ok(chunk)));
        }
        Self::new(rx)
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        if self.done {
            return Ok(None);
        }
        match self.rx.blocking_recv() {
            Some(Ok(data)) => Ok(Some(data)),
            Some(Err(e)) => {
                self.done = true;
                Err(e)
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    /// Drain the remaining stream into a single buffer.
    ///
    /// # Errors
    ///
    /// Returns a body error if the stream failed mid-read.
    pub fn bytes(mut self) -> Result<Bytes, Error> {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&std::mem::take(&mut self.chunk));
        while let Some(chunk) = self.next_chunk()? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Drain the remaining stream and decode it as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns a body error if the stream failed mid-read or the bytes are
    /// not valid UTF-8.
    pub fn text(self) -> Result<String, Error> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(error::body)
    }

    /// Drain the remaining stream and deserialize it as JSON.
    ///
    /// # Errors
    ///
    /// Returns a body error if the stream failed mid-read or the bytes are
    /// not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, Error> {
        let bytes = self.bytes()?;
        serde_json::from_slice(&bytes).map_err(error::body)
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.chunk.is_empty() {
            match self.next_chunk() {
                Ok(Some(chunk)) => self.chunk = chunk,
                Ok(None) => return Ok(0),
                Err(e) => return Err(std::io::Error::other(e)),
            }
        }
        let n = buf.len().min(self.chunk.len());
        buf[..n].copy_from_slice(&self.chunk.split_to(n));
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_body(body: &str) -> HttpResponse {
        HttpResponse::new(
            StatusCode::OK,
            None,
            HeaderMap::new(),
            ResponseBody::from_bytes(body.to_owned()),
        )
    }

    #[test]
    fn empty_body_reads_zero_bytes() {
        let mut body = response_with_body("").into_body();
        let mut buf = [0u8; 16];
        assert_eq!(body.read(&mut buf).expect("read"), 0);
    }

    #[test]
    fn body_is_readable_exactly_once() {
        let mut body = response_with_body("body text").into_body();
        let mut out = String::new();
        body.read_to_string(&mut out).expect("read");
        assert_eq!(out, "body text");

        let mut again = String::new();
        body.read_to_string(&mut again).expect("read after drain");
        assert_eq!(again, "");
    }

    #[test]
    fn text_drains_the_stream() {
        let body = response_with_body("body text").into_body();
        assert_eq!(body.text().expect("text"), "body text");
    }

    #[test]
    fn json_decodes_the_stream() {
        #[derive(serde::Deserialize)]
        struct Reply {
            id: u32,
        }
        let body = response_with_body(r#"{"id":7}"#).into_body();
        let reply: Reply = body.json().expect("json");
        assert_eq!(reply.id, 7);
    }

    #[test]
    fn stream_error_surfaces_as_body_error() {
        let (tx, rx) = mpsc::channel(2);
        tx.try_send(Ok(Bytes::from_static(b"partial")))
            .expect("send");
        tx.try_send(Err(crate::error::body(std::io::Error::other("reset"))))
            .expect("send");
        drop(tx);

        let err = ResponseBody::new(rx).bytes().unwrap_err();
        assert!(err.is_body());
    }

    #[test]
    fn status_message_absent_for_canonical_reason() {
        let response = HttpResponse::new(
            StatusCode::OK,
            None,
            HeaderMap::new(),
            ResponseBody::from_bytes(""),
        );
        assert_eq!(response.status_code(), 200);
        assert!(response.status_message().is_none());
    }

    #[test]
    fn custom_status_message_is_exposed() {
        let response = HttpResponse::new(
            StatusCode::from_u16(543).expect("status"),
            Some("message".to_owned()),
            HeaderMap::new(),
            ResponseBody::from_bytes(""),
        );
        assert_eq!(response.status_code(), 543);
        assert_eq!(response.status_message(), Some("message"));
    }
}
