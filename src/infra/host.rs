//! Host API collaborators
//!
//! The host process owns language configuration and the language-server
//! endpoint. The bridge only needs a readiness signal plus two discovery
//! calls, captured by [`HostApi`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};

use super::protocol::{Message, Request, Response};
use crate::error::HostError;
use crate::models::config::BridgeConfig;
use crate::models::language::LanguageDescriptor;

const EVENT_CAPACITY: usize = 16;

/// Events pushed by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Ready,
    Closed,
}

#[async_trait]
pub trait HostApi: Send + Sync {
    /// Synchronous presence check for the host API surface
    fn is_ready(&self) -> bool;

    /// Whether the host connection is gone for good
    fn is_closed(&self) -> bool {
        false
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent>;

    async fn get_langs(&self) -> Result<Vec<LanguageDescriptor>, HostError>;

    async fn get_port(&self) -> Result<u16, HostError>;
}

/// Host backed by the bridge's own configuration; ready from the start
pub struct StaticHost {
    languages: Vec<LanguageDescriptor>,
    port: Option<u16>,
    events: broadcast::Sender<HostEvent>,
}

impl StaticHost {
    pub fn new(languages: Vec<LanguageDescriptor>, port: Option<u16>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            languages,
            port,
            events,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.languages.clone(), config.endpoint.port)
    }
}

#[async_trait]
impl HostApi for StaticHost {
    fn is_ready(&self) -> bool {
        true
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    async fn get_langs(&self) -> Result<Vec<LanguageDescriptor>, HostError> {
        Ok(self.languages.clone())
    }

    async fn get_port(&self) -> Result<u16, HostError> {
        self.port.ok_or_else(|| {
            HostError::Protocol("no endpoint port configured for the static host".to_string())
        })
    }
}

type PendingCall = oneshot::Sender<Response>;
type HostWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct HostShared {
    pending: Mutex<HashMap<u64, PendingCall>>,
    ready: AtomicBool,
    closed: AtomicBool,
    events: broadcast::Sender<HostEvent>,
}

impl HostShared {
    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<u64, PendingCall>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_ready(&self) {
        if !self.ready.swap(true, Ordering::AcqRel) {
            tracing::info!("Host reported ready");
        }
        let _ = self.events.send(HostEvent::Ready);
    }

    fn mark_closed(&self) {
        let dropped = {
            // Flag under the lock so no call can register after the clear
            let mut pending = self.pending();
            self.closed.store(true, Ordering::Release);
            let count = pending.len();
            pending.clear();
            count
        };
        if dropped > 0 {
            tracing::debug!("Host closed with {} calls in flight", dropped);
        }
        let _ = self.events.send(HostEvent::Closed);
    }

    fn dispatch(&self, message: Message) {
        match message {
            Message::Response(response) => {
                let sender = response
                    .id
                    .as_number()
                    .and_then(|id| self.pending().remove(&id));
                match sender {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => tracing::debug!("Host response for unknown id {:?}", response.id),
                }
            }
            Message::Notification(notification) => match notification.method.as_str() {
                "ready" => self.mark_ready(),
                other => tracing::trace!("Ignoring host notification '{}'", other),
            },
            Message::Request(request) => {
                tracing::debug!("Ignoring host request '{}'", request.method);
            }
        }
    }
}

/// Host process reached over newline-delimited JSON-RPC
///
/// The host answers `get_langs` and `get_port` and pushes a `ready`
/// notification once its API is usable.
pub struct RpcHost {
    writer: tokio::sync::Mutex<HostWriter>,
    shared: Arc<HostShared>,
    next_id: AtomicU64,
}

impl RpcHost {
    pub async fn connect(address: &str) -> Result<Self, HostError> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| HostError::Connect {
                address: address.to_string(),
                source,
            })?;
        tracing::debug!("Connected to host at {}", address);
        Ok(Self::from_stream(stream))
    }

    /// Must be called from within a Tokio runtime
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(HostShared {
            pending: Mutex::new(HashMap::new()),
            ready: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            events,
        });

        tokio::spawn(read_host_messages(
            BufReader::new(reader),
            Arc::clone(&shared),
        ));

        Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            shared,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str) -> Result<Value, HostError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.shared.pending();
            if self.shared.closed.load(Ordering::Acquire) {
                return Err(HostError::Closed);
            }
            pending.insert(id, tx);
        }

        let mut line = serde_json::to_string(&Request::new(id, method, None))?;
        line.push('\n');
        tracing::trace!("host -> {}", line.trim_end());

        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(line.as_bytes()).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.shared.pending().remove(&id);
            return Err(e.into());
        }

        let response = rx.await.map_err(|_| HostError::Closed)?;
        response.into_result().map_err(|e| HostError::Rpc {
            code: e.code,
            message: e.message,
        })
    }
}

async fn read_host_messages<R>(mut reader: BufReader<R>, shared: Arc<HostShared>)
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                tracing::trace!("host <- {}", text);
                match Message::parse(text) {
                    Ok(message) => shared.dispatch(message),
                    Err(e) => tracing::warn!("Malformed host message: {}", e),
                }
            }
            Err(e) => {
                tracing::warn!("Host read error: {}", e);
                break;
            }
        }
    }
    shared.mark_closed();
}

#[async_trait]
impl HostApi for RpcHost {
    fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.shared.events.subscribe()
    }

    async fn get_langs(&self) -> Result<Vec<LanguageDescriptor>, HostError> {
        let value = self.call("get_langs").await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_port(&self) -> Result<u16, HostError> {
        let value = self.call("get_port").await?;
        value
            .as_u64()
            .and_then(|port| u16::try_from(port).ok())
            .ok_or_else(|| HostError::Protocol(format!("invalid endpoint port: {}", value)))
    }
}
