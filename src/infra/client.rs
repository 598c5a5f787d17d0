//! JSON-RPC client over a language's socket
//!
//! Correlates responses with requests by id. Payloads are opaque; the
//! language-server protocol itself is the editor's business.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::protocol::{Message, Notification, Request, Response, RpcError};
use super::socket::LspSocket;
use crate::error::ConnectionError;

type PendingRequest = oneshot::Sender<Response>;
type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;

const NOTIFICATION_CAPACITY: usize = 64;

fn lock_pending(pending: &PendingMap) -> MutexGuard<'_, HashMap<u64, PendingRequest>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct LanguageClient {
    language: String,
    socket: Arc<LspSocket>,
    next_id: AtomicU64,
    pending: PendingMap,
    notifications: broadcast::Sender<Notification>,
}

impl LanguageClient {
    /// Take over the socket's incoming frames and start dispatching them
    pub fn attach(socket: Arc<LspSocket>) -> Result<Arc<Self>, ConnectionError> {
        let language = socket.language().to_string();
        let incoming = socket
            .take_incoming()
            .ok_or_else(|| ConnectionError::AlreadyAttached {
                language: language.clone(),
            })?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        tokio::spawn(dispatch_frames(
            incoming,
            Arc::clone(&socket),
            Arc::clone(&pending),
            notifications.clone(),
        ));

        tracing::debug!("{} language client attached", language);
        Ok(Arc::new(Self {
            language,
            socket,
            next_id: AtomicU64::new(1),
            pending,
            notifications,
        }))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Send a request and wait for the matching response
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ConnectionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let text = serde_json::to_string(&Request::new(id, method, params))?;

        let (tx, rx) = oneshot::channel();
        lock_pending(&self.pending).insert(id, tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        tracing::trace!("{} request {}: {}", self.language, id, method);
        self.socket.send(text)?;

        let response = rx.await.map_err(|_| ConnectionError::Closed {
            language: self.language.clone(),
        })?;
        response
            .into_result()
            .map_err(|e| ConnectionError::Server {
                language: self.language.clone(),
                code: e.code,
                message: e.message,
            })
    }

    /// Server-initiated notifications (diagnostics, progress, ...)
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }
}

/// Drops a request's pending entry when the request finishes or is cancelled
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock_pending(self.pending).remove(&self.id);
    }
}

async fn dispatch_frames(
    mut incoming: mpsc::Receiver<String>,
    socket: Arc<LspSocket>,
    pending: PendingMap,
    notifications: broadcast::Sender<Notification>,
) {
    let language = socket.language().to_string();

    while let Some(frame) = incoming.recv().await {
        let message = match Message::parse(&frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("{} sent a malformed message: {}", language, e);
                continue;
            }
        };

        match message {
            Message::Response(response) => {
                let sender = response
                    .id
                    .as_number()
                    .and_then(|id| lock_pending(&pending).remove(&id));
                match sender {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => tracing::debug!(
                        "{} response for unknown request {:?}",
                        language,
                        response.id
                    ),
                }
            }
            Message::Notification(notification) => {
                let _ = notifications.send(notification);
            }
            Message::Request(request) => {
                // Server requests are answered by the editor, not here
                let reply = Response::error(request.id, RpcError::method_not_found(&request.method));
                match serde_json::to_string(&reply) {
                    Ok(text) => {
                        let _ = socket.send(text);
                    }
                    Err(e) => tracing::warn!("{} reply encoding failed: {}", language, e),
                }
            }
        }
    }

    let dropped = {
        let mut pending = lock_pending(&pending);
        let count = pending.len();
        pending.clear();
        count
    };
    if dropped > 0 {
        tracing::debug!("{} connection ended with {} requests in flight", language, dropped);
    }
}

/// Lazily builds the language client for a connection, once
#[derive(Debug, Default)]
pub struct ClientLoader {
    client: Mutex<Option<Arc<LanguageClient>>>,
}

impl ClientLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn load(&self, socket: &Arc<LspSocket>) -> Result<Arc<LanguageClient>, ConnectionError> {
        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }
        let client = LanguageClient::attach(Arc::clone(socket))?;
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }
}
