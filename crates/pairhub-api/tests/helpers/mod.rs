//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use pairhub_api::app::{build_app, build_state};
use pairhub_api::state::AppState;
use pairhub_core::config::AppConfig;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, including the engine
    pub state: AppState,
}

/// Response from a test request
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response body as JSON (`Null` if empty or not JSON)
    pub body: Value,
}

impl TestApp {
    /// Create a new test application with default configuration
    pub fn new() -> Self {
        let state = build_state(AppConfig::default()).expect("Failed to build state");
        Self {
            router: build_app(state.clone()),
            state,
        }
    }

    /// Make an HTTP request against the router
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("Failed to build request"))
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Serve the app on an ephemeral local port
    pub async fn spawn(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let app = build_app(self.state.clone());
        tokio::spawn(axum::serve(listener, app).into_future());
        addr
    }

    /// Wait until `check` holds, failing after two seconds
    pub async fn eventually(&self, mut check: impl FnMut(&AppState) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !check(&self.state) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached in time"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// WebSocket test client
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connect to `/ws` on a running test server
    pub async fn connect(addr: SocketAddr) -> Self {
        let (stream, _response) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .expect("WebSocket handshake failed");
        Self { stream }
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .expect("Failed to send frame");
    }

    /// Send a `{channel, message}` envelope
    pub async fn send_envelope(&mut self, channel: &str, message: Value) {
        let envelope = serde_json::json!({ "channel": channel, "message": message });
        self.send_text(&envelope.to_string()).await;
    }

    /// Receive the next text frame as JSON
    pub async fn recv_json(&mut self) -> Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), self.stream.next())
                .await
                .expect("Timed out waiting for frame")
                .expect("Stream ended")
                .expect("Read failed");

            match frame {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).expect("Frame is not JSON");
                }
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("Unexpected frame: {other:?}"),
            }
        }
    }

    /// Close the connection from the client side
    pub async fn close(mut self) {
        self.stream.close(None).await.expect("Failed to close");
    }
}
