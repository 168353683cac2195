//! Text-frame transport for the realtime link.
//!
//! [`Transport`] opens sockets; [`Socket`] moves text frames. The link task
//! only ever holds one socket. Tests plug in channel-backed sockets; with the
//! `transport` feature, [`WsTransport`] speaks WebSocket.

use std::{future::Future, pin::Pin};

use thiserror::Error;
use url::Url;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket could not be opened.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Socket failed after opening.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Future resolving to a freshly opened socket.
pub type OpenFuture<S> = Pin<Box<dyn Future<Output = Result<S, TransportError>> + Send>>;

/// Opens sockets to the realtime endpoint.
pub trait Transport: Send + Sync + 'static {
    /// Socket type produced by this transport.
    type Socket: Socket;

    /// Start opening a socket to `url`.
    ///
    /// The returned future owns everything it needs, so the link task can
    /// drop it to abandon the attempt.
    fn open(&self, url: &Url) -> OpenFuture<Self::Socket>;
}

/// Bidirectional text-frame socket.
pub trait Socket: Send + 'static {
    /// Write one text frame.
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Next inbound text frame. `None` once the peer has closed.
    ///
    /// Must be cancel safe: the link task polls it inside `select!`.
    fn recv(&mut self) -> impl Future<Output = Option<Result<String, TransportError>>> + Send;

    /// Close the socket. Errors are ignored.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

#[cfg(feature = "transport")]
pub use ws::{WsSocket, WsTransport};

#[cfg(feature = "transport")]
mod ws {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
    use url::Url;

    use super::{OpenFuture, Socket, Transport, TransportError};

    /// Time allowed for the TCP/TLS/WebSocket handshake.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// WebSocket transport over tokio-tungstenite.
    #[derive(Debug, Clone)]
    pub struct WsTransport {
        connect_timeout: Duration,
    }

    impl Default for WsTransport {
        fn default() -> Self {
            Self { connect_timeout: DEFAULT_CONNECT_TIMEOUT }
        }
    }

    impl WsTransport {
        /// Transport with a custom handshake timeout.
        pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
            Self { connect_timeout }
        }
    }

    impl Transport for WsTransport {
        type Socket = WsSocket;

        fn open(&self, url: &Url) -> OpenFuture<WsSocket> {
            let url = url.to_string();
            let timeout = self.connect_timeout;
            Box::pin(async move {
                let (stream, _response) =
                    tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url.as_str()))
                        .await
                        .map_err(|_| {
                            TransportError::Connection(format!("handshake timed out after {timeout:?}"))
                        })?
                        .map_err(|e| TransportError::Connection(e.to_string()))?;
                Ok(WsSocket { stream })
            })
        }
    }

    /// Open WebSocket connection.
    pub struct WsSocket {
        stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    }

    impl Socket for WsSocket {
        async fn send(&mut self, text: String) -> Result<(), TransportError> {
            self.stream
                .send(Message::Text(text.into()))
                .await
                .map_err(|e| TransportError::Stream(format!("write failed: {e}")))
        }

        async fn recv(&mut self) -> Option<Result<String, TransportError>> {
            while let Some(message) = self.stream.next().await {
                match message {
                    Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                    Ok(Message::Close(frame)) => {
                        tracing::debug!(?frame, "peer closed websocket");
                        return None;
                    },
                    // Control and binary frames carry nothing for us.
                    Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {},
                    Err(e) => return Some(Err(TransportError::Stream(e.to_string()))),
                }
            }
            None
        }

        async fn close(&mut self) {
            if let Err(e) = self.stream.close(None).await {
                tracing::debug!(error = %e, "websocket close failed");
            }
        }
    }
}
