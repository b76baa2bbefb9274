//! Mock remote debugging server
//!
//! Serves a one-tab `/json` listing over HTTP and a scripted debug socket
//! over WebSocket, so the real transport can be tested without a browser.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Mock browser debug server
pub struct MockChromeServer {
    ws_addr: String,
    http_addr: String,
    shutdown_tx: Option<tokio::sync::watch::Sender<bool>>,
}

impl MockChromeServer {
    /// Start both listeners on ephemeral loopback ports
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let ws_listener = TcpListener::bind("127.0.0.1:0").await?;
        let http_listener = TcpListener::bind("127.0.0.1:0").await?;
        let ws_addr = format!("ws://{}", ws_listener.local_addr()?);
        let http_addr = format!("http://{}", http_listener.local_addr()?);

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let mut ws_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = ws_listener.accept() => match result {
                        Ok((stream, _)) => {
                            tokio::spawn(Self::handle_socket(stream));
                        }
                        Err(e) => {
                            tracing::error!("Mock server: accept error: {}", e);
                            break;
                        }
                    },
                    _ = ws_shutdown.changed() => break,
                }
            }
        });

        let listing = Self::tab_listing(&ws_addr);
        let mut http_shutdown = shutdown_rx;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = http_listener.accept() => match result {
                        Ok((stream, _)) => {
                            tokio::spawn(Self::handle_http(stream, listing.clone()));
                        }
                        Err(_) => break,
                    },
                    _ = http_shutdown.changed() => break,
                }
            }
        });

        Ok(Self {
            ws_addr,
            http_addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Debug socket URL of the single tab
    pub fn ws_endpoint(&self) -> String {
        format!("{}/devtools/page/1", self.ws_addr)
    }

    /// Base URL of the HTTP listing
    pub fn http_endpoint(&self) -> &str {
        &self.http_addr
    }

    /// Tab listing served at `/json`
    pub fn tab_listing(ws_addr: &str) -> Value {
        json!([
            {
                "id": "1",
                "type": "page",
                "title": "Test Page",
                "url": "about:blank",
                "webSocketDebuggerUrl": format!("{}/devtools/page/1", ws_addr),
            },
            {
                "id": "2",
                "type": "page",
                "title": "Attached Page",
                "url": "http://busy/",
            }
        ])
    }

    async fn handle_http(mut stream: TcpStream, listing: Value) {
        let mut buf = [0u8; 4096];
        if stream.read(&mut buf).await.is_err() {
            return;
        }

        let body = listing.to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    async fn handle_socket(stream: TcpStream) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                tracing::error!("Mock server: handshake error: {}", e);
                return;
            }
        };
        let (mut sender, mut receiver) = ws_stream.split();

        while let Some(result) = receiver.next().await {
            let text = match result {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };
            let Ok(request) = serde_json::from_str::<Value>(&text) else {
                continue;
            };

            let method = request["method"].as_str().unwrap_or_default().to_string();
            if method == "Test.hangUp" {
                let _ = sender.close().await;
                break;
            }

            for frame in Self::script(&request) {
                if sender.send(Message::Text(frame.to_string())).await.is_err() {
                    return;
                }
            }
        }
    }

    /// Frames sent back for one request, in order
    fn script(request: &Value) -> Vec<Value> {
        let id = request["id"].as_u64().unwrap_or(0);
        let method = request["method"].as_str().unwrap_or_default();

        match method {
            "Page.enable" | "Console.enable" | "Network.enable" | "Runtime.releaseObjectGroup"
            | "Runtime.releaseObject" => vec![json!({ "id": id, "result": {} })],
            // Events interleaved before and after the response.
            "Page.navigate" => vec![
                json!({ "method": "Page.frameNavigated", "params": { "frame": { "id": "F1" } } }),
                json!({ "id": id, "result": { "frameId": "F1" } }),
                json!({ "method": "Page.loadEventFired", "params": { "timestamp": 12.5 } }),
            ],
            "Runtime.evaluate" => {
                let expression = request["params"]["expression"].as_str().unwrap_or_default();
                if expression == "window" {
                    vec![json!({ "id": id, "result": {
                        "result": { "type": "object", "objectId": "win-1", "className": "Window" }
                    }})]
                } else {
                    vec![json!({ "id": id, "result": { "result": { "type": "string", "value": "test-result" } } })]
                }
            }
            "Test.outOfSequence" => vec![json!({ "id": id + 100, "result": {} })],
            _ => vec![json!({
                "id": id,
                "error": { "code": -32601, "message": format!("'{}' wasn't found", method) }
            })],
        }
    }
}

impl Drop for MockChromeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_startup() {
        let server = MockChromeServer::start().await.unwrap();
        assert!(server.ws_endpoint().starts_with("ws://127.0.0.1:"));
        assert!(server.http_endpoint().starts_with("http://127.0.0.1:"));
    }

    #[test]
    fn test_navigate_script_interleaves_events() {
        let frames = MockChromeServer::script(&json!({ "id": 3, "method": "Page.navigate" }));
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1]["id"], 3);
    }
}
