//! WebSocket transport over `tokio-tungstenite`.
//!
//! The game server speaks JSON text frames. Binary frames carrying valid
//! UTF-8 are accepted as text; anything else is skipped with a warning.
//! Both `ws://` and `wss://` URLs work.
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), scribble_client::ScribbleError> {
//! use scribble_client::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:8000/ws").await?;
//! if let Some(Ok(frame)) = transport.recv().await {
//!     println!("server sent: {frame}");
//! }
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use crate::error::ScribbleError;
use crate::transport::Transport;

/// The underlying WebSocket stream, exposed for [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// [`Transport`] backed by a single WebSocket connection.
///
/// [`recv`](Transport::recv) is cancel-safe: a message is only taken off the
/// stream once the future resolves.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Connect to the game server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::Io`] if the URL is invalid or the handshake
    /// fails. I/O error kinds are preserved.
    pub async fn connect(url: &str) -> Result<Self, ScribbleError> {
        debug!(url = %url, "connecting to game server");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            ScribbleError::Io(std::io::Error::new(kind, e))
        })?;

        info!(url = %url, "connected to game server");
        Ok(Self::from_stream(stream))
    }

    /// Like [`connect`](Self::connect), bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::Timeout`] if the deadline elapses first.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, ScribbleError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| ScribbleError::Timeout)?
    }

    /// Wrap a stream set up elsewhere (custom TLS, headers, proxies).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), ScribbleError> {
        if self.closed {
            return Err(ScribbleError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| ScribbleError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ScribbleError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(ScribbleError::TransportReceive(e.to_string()))),
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => warn!(len = bytes.len(), "skipping non-UTF-8 binary frame"),
                },
                Message::Close(frame) => {
                    debug!(?frame, "server sent close frame");
                    return None;
                }
                // tungstenite answers pings itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), ScribbleError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| ScribbleError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Accept one connection on a local port and hand it to `server`.
    async fn serve_once<F, Fut>(server: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            server(ws).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn invalid_url_is_io_error() {
        let err = WebSocketTransport::connect("not a url").await.unwrap_err();
        assert!(matches!(err, ScribbleError::Io(_)));
    }

    #[tokio::test]
    async fn unroutable_host_times_out() {
        let err = WebSocketTransport::connect_with_timeout(
            "ws://192.0.2.1:1",
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScribbleError::Timeout));
    }

    #[tokio::test]
    async fn text_and_utf8_binary_frames_are_delivered() {
        let url = serve_once(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"ping"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Binary(br#"{"type":"skipping_turn"}"#.to_vec().into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), r#"{"type":"ping"}"#);
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"skipping_turn"}"#
        );
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn non_utf8_binary_frames_are_skipped() {
        let url = serve_once(|mut ws| async move {
            ws.send(Message::Binary(vec![0xff, 0xfe].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"clear_modal"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"clear_modal"}"#
        );
    }

    #[tokio::test]
    async fn word_chosen_reaches_the_server() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let url = serve_once(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = tx.send(text.to_string());
            }
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let frame = r#"{"type":"word_chosen","word":"cat","name":"alice"}"#;
        transport.send(frame.to_string()).await.unwrap();
        assert_eq!(rx.await.unwrap(), frame);
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn send_after_close_is_rejected_and_close_is_idempotent() {
        let url = serve_once(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
            .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("late".to_string()).await.unwrap_err();
        assert!(matches!(err, ScribbleError::TransportClosed));
    }
}
