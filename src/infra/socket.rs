//! Per-language socket transport
//!
//! An [`LspSocket`] is handed out as soon as it is constructed; the opening
//! handshake runs in the background on its [`SocketDriver`]. Text frames are
//! passed through untouched in both directions.

use std::sync::{Mutex, PoisonError};

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

use crate::error::ConnectionError;

/// Frames buffered for the client before the reader applies backpressure
const INCOMING_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SocketState {
    Connecting,
    Open,
    Failed(String),
    Closed,
}

impl SocketState {
    /// Anything but `Connecting`
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Connecting)
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

/// Opens one connection per language
pub trait SocketFactory: Send + Sync {
    fn open(&self, language: &str, url: Url) -> LspSocket;
}

/// Client end of a language's connection
#[derive(Debug)]
pub struct LspSocket {
    language: String,
    url: Url,
    state: watch::Receiver<SocketState>,
    outgoing: mpsc::UnboundedSender<String>,
    incoming: Mutex<Option<mpsc::Receiver<String>>>,
}

/// Transport end of a language's connection
#[derive(Debug)]
pub struct SocketDriver {
    language: String,
    url: Url,
    state: watch::Sender<SocketState>,
    outgoing: mpsc::UnboundedReceiver<String>,
    incoming: mpsc::Sender<String>,
}

impl LspSocket {
    /// Create a connected socket/driver pair in the `Connecting` state
    pub fn pair(language: &str, url: Url) -> (Self, SocketDriver) {
        let (state_tx, state_rx) = watch::channel(SocketState::Connecting);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::channel(INCOMING_CAPACITY);

        let socket = Self {
            language: language.to_string(),
            url: url.clone(),
            state: state_rx,
            outgoing: out_tx,
            incoming: Mutex::new(Some(in_rx)),
        };
        let driver = SocketDriver {
            language: language.to_string(),
            url,
            state: state_tx,
            outgoing: out_rx,
            incoming: in_tx,
        };
        (socket, driver)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> SocketState {
        self.state.borrow().clone()
    }

    /// Wait until the handshake has either succeeded or failed
    pub async fn settled(&self) -> SocketState {
        let mut state = self.state.clone();
        match state.wait_for(SocketState::is_settled).await {
            Ok(settled) => settled.clone(),
            Err(_) => self.state(),
        }
    }

    /// Queue a text frame; frames sent while connecting go out once open
    pub fn send(&self, text: String) -> Result<(), ConnectionError> {
        let state = self.state();
        if !state.is_usable() {
            return Err(match state {
                SocketState::Failed(message) => ConnectionError::Failed {
                    language: self.language.clone(),
                    message,
                },
                _ => self.closed(),
            });
        }
        self.outgoing.send(text).map_err(|_| self.closed())
    }

    /// Incoming text frames; only one reader may take them
    ///
    /// Up to `INCOMING_CAPACITY` frames are held until a reader attaches;
    /// past that the connection stops reading from the server.
    pub fn take_incoming(&self) -> Option<mpsc::Receiver<String>> {
        self.incoming
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn closed(&self) -> ConnectionError {
        ConnectionError::Closed {
            language: self.language.clone(),
        }
    }
}

impl SocketDriver {
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_state(&self, state: SocketState) {
        self.state.send_replace(state);
    }

    /// Next frame the client queued for the server
    pub async fn recv_outgoing(&mut self) -> Option<String> {
        self.outgoing.recv().await
    }

    /// Deliver a frame to the client without waiting; `false` when nobody
    /// is listening or the buffer is full
    pub fn push_incoming(&self, text: String) -> bool {
        self.incoming.try_send(text).is_ok()
    }

    /// Drive a WebSocket connection until either side closes
    pub async fn run_websocket(mut self) {
        let stream = match tokio_tungstenite::connect_async(self.url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                tracing::warn!(
                    "{} language server connection to {} failed: {}",
                    self.language,
                    self.url,
                    e
                );
                self.set_state(SocketState::Failed(e.to_string()));
                return;
            }
        };

        tracing::info!("{} language server connected at {}", self.language, self.url);
        self.set_state(SocketState::Open);

        let (mut sink, mut source) = stream.split();
        let final_state = loop {
            tokio::select! {
                outgoing = self.outgoing.recv() => match outgoing {
                    Some(text) => {
                        tracing::trace!("{} LSP -> {}", self.language, text);
                        if let Err(e) = sink.send(WsMessage::Text(text)).await {
                            break SocketState::Failed(e.to_string());
                        }
                    }
                    None => {
                        let _ = sink.send(WsMessage::Close(None)).await;
                        break SocketState::Closed;
                    }
                },
                frame = source.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        tracing::trace!("{} LSP <- {}", self.language, text);
                        // Waits while the buffer is full, pausing reads
                        let _ = self.incoming.send(text).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break SocketState::Closed,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break SocketState::Failed(e.to_string()),
                },
            }
        };

        match &final_state {
            SocketState::Failed(reason) => {
                tracing::warn!("{} language server connection lost: {}", self.language, reason)
            }
            _ => tracing::debug!("{} language server connection closed", self.language),
        }
        self.set_state(final_state);
    }
}

/// Opens real WebSocket connections; must be used inside a Tokio runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketFactory;

impl SocketFactory for WebSocketFactory {
    fn open(&self, language: &str, url: Url) -> LspSocket {
        tracing::debug!("Opening {} connection to {}", language, url);
        let (socket, driver) = LspSocket::pair(language, url);
        tokio::spawn(driver.run_websocket());
        socket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(id: &str) -> Url {
        Url::parse(&format!("ws://127.0.0.1:9000/lsp/{id}")).unwrap()
    }

    #[tokio::test]
    async fn test_frames_queue_while_connecting() {
        let (socket, mut driver) = LspSocket::pair("python", url("python"));
        assert_eq!(socket.state(), SocketState::Connecting);

        socket.send("first".to_string()).unwrap();
        driver.set_state(SocketState::Open);
        socket.send("second".to_string()).unwrap();

        assert_eq!(driver.recv_outgoing().await.as_deref(), Some("first"));
        assert_eq!(driver.recv_outgoing().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_send_after_failure_is_rejected() {
        let (socket, driver) = LspSocket::pair("cpp", url("cpp"));
        driver.set_state(SocketState::Failed("refused".to_string()));

        let err = socket.send("{}".to_string()).unwrap_err();
        assert_eq!(err.affected_language(), Some("cpp"));
        assert!(matches!(err, ConnectionError::Failed { message, .. } if message == "refused"));
    }

    #[tokio::test]
    async fn test_settled_waits_for_handshake() {
        let (socket, driver) = LspSocket::pair("python", url("python"));
        let settle = tokio::spawn(async move { socket.settled().await });

        tokio::task::yield_now().await;
        driver.set_state(SocketState::Open);

        assert_eq!(settle.await.unwrap(), SocketState::Open);
    }

    #[test]
    fn test_incoming_taken_once() {
        let (socket, driver) = LspSocket::pair("python", url("python"));
        let mut incoming = socket.take_incoming().unwrap();
        assert!(socket.take_incoming().is_none());

        assert!(driver.push_incoming("hello".to_string()));
        assert_eq!(incoming.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_unread_frames_are_bounded() {
        let (socket, driver) = LspSocket::pair("python", url("python"));
        for i in 0..INCOMING_CAPACITY {
            assert!(driver.push_incoming(format!("frame {i}")));
        }
        assert!(!driver.push_incoming("overflow".to_string()));

        let mut incoming = socket.take_incoming().unwrap();
        assert_eq!(incoming.try_recv().unwrap(), "frame 0");
        assert!(driver.push_incoming("after drain".to_string()));
    }

    #[test]
    fn test_send_after_close_is_rejected() {
        let (socket, driver) = LspSocket::pair("python", url("python"));
        driver.set_state(SocketState::Closed);
        assert!(matches!(
            socket.send("{}".to_string()),
            Err(ConnectionError::Closed { .. })
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_marks_socket_failed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let target = Url::parse(&format!("ws://127.0.0.1:{port}/lsp/python")).unwrap();
        let socket = WebSocketFactory.open("python", target);
        assert_eq!(socket.state(), SocketState::Connecting);

        let state = tokio::time::timeout(std::time::Duration::from_secs(5), socket.settled())
            .await
            .unwrap();
        assert!(matches!(state, SocketState::Failed(_)));
        assert!(socket.send("{}".to_string()).is_err());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(SocketState::Failed("refused".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"state": "failed", "reason": "refused"}));
        let json = serde_json::to_value(SocketState::Open).unwrap();
        assert_eq!(json, serde_json::json!({"state": "open"}));
    }
}
