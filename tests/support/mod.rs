//! In-process fixtures: an axum echo server that records what it receives
//! and replays a configured reply, plus raw TCP fixtures for wire-level
//! cases axum cannot express (custom reason phrases, stalled replies).

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, Response, StatusCode, Uri};
use tokio::net::TcpListener;

/// What the echo fixture observed, and what it should reply with.
#[derive(Debug)]
pub struct EchoState {
    pub request_method: Option<String>,
    pub request_uri: Option<String>,
    pub request_headers: Vec<(String, String)>,
    pub request_body: Vec<u8>,

    pub response_status: u16,
    pub response_headers: Vec<(String, String)>,
    pub response_body: Option<String>,
}

impl Default for EchoState {
    fn default() -> Self {
        Self {
            request_method: None,
            request_uri: None,
            request_headers: Vec::new(),
            request_body: Vec::new(),
            response_status: 200,
            response_headers: Vec::new(),
            response_body: None,
        }
    }
}

type SharedState = Arc<Mutex<EchoState>>;

pub struct EchoServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl EchoServer {
    pub fn start() -> Self {
        let state: SharedState = Arc::new(Mutex::new(EchoState::default()));
        let app_state = Arc::clone(&state);
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("fixture runtime");
            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture");
                addr_tx
                    .send(listener.local_addr().expect("fixture addr"))
                    .expect("report addr");
                let app = Router::new().fallback(echo).with_state(app_state);
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        drop(shutdown_rx.await);
                    })
                    .await
                    .expect("serve fixture");
            });
        });

        let addr = addr_rx.recv().expect("fixture addr");
        Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            drop(shutdown.send(()));
        }
        if let Some(thread) = self.thread.take() {
            drop(thread.join());
        }
    }
}

async fn echo(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response<Body> {
    let mut state = state.lock().expect("fixture state");

    state.request_method = Some(method.to_string());
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    state.request_uri = Some(format!("http://{host}{uri}"));
    state.request_headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                value.to_str().unwrap_or_default().to_owned(),
            )
        })
        .collect();
    state.request_body = body.to_vec();

    let status = StatusCode::from_u16(state.response_status).expect("fixture status");
    let mut builder = Response::builder().status(status);
    for (name, value) in &state.response_headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(state.response_body.clone().unwrap_or_default()))
        .expect("fixture response")
}

/// Fixture that answers every connection with a fixed pre-rendered reply.
pub struct RawServer {
    addr: SocketAddr,
}

impl RawServer {
    /// Reply to each request with `head` verbatim (must be a complete
    /// HTTP/1.1 message).
    pub fn respond_with(head: &'static str) -> Self {
        Self::spawn(move |mut stream| {
            read_request_head(&mut stream);
            drop(stream.write_all(head.as_bytes()));
            drop(stream.flush());
        })
    }

    /// Accept connections and never reply, holding each socket open.
    pub fn stall() -> Self {
        Self::spawn(|mut stream| {
            read_request_head(&mut stream);
            std::thread::sleep(Duration::from_secs(300));
        })
    }

    /// Bind a port, then refuse all connections by closing the listener.
    pub fn refused_addr() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
        listener.local_addr().expect("probe addr")
    }

    fn spawn<F>(handler: F) -> Self
    where
        F: Fn(std::net::TcpStream) + Send + Sync + 'static,
    {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind raw fixture");
        let addr = listener.local_addr().expect("raw fixture addr");
        let handler = Arc::new(handler);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let handler = Arc::clone(&handler);
                std::thread::spawn(move || handler(stream));
            }
        });
        Self { addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

fn read_request_head(stream: &mut std::net::TcpStream) {
    drop(stream.set_read_timeout(Some(Duration::from_secs(5))));
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                head.extend_from_slice(&buf[..n]);
                if head.windows(4).any(|window| window == b"\r\n\r\n") {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}
