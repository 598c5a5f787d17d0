//! Test doubles for the host and the socket transport

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;
use url::Url;

use crate::error::HostError;
use crate::infra::host::{HostApi, HostEvent};
use crate::infra::socket::{LspSocket, SocketDriver, SocketFactory, SocketState};
use crate::models::language::LanguageDescriptor;

enum LangsBehavior {
    Return(Vec<LanguageDescriptor>),
    Fail(String),
    Hang,
}

pub struct FakeHost {
    ready: AtomicBool,
    events: Mutex<Option<broadcast::Sender<HostEvent>>>,
    langs: LangsBehavior,
    port: Result<u16, String>,
    pub langs_calls: AtomicUsize,
    pub port_calls: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(8);
        Self {
            ready: AtomicBool::new(false),
            events: Mutex::new(Some(events)),
            langs: LangsBehavior::Return(Vec::new()),
            port: Ok(9000),
            langs_calls: AtomicUsize::new(0),
            port_calls: AtomicUsize::new(0),
        }
    }

    pub fn ready(self) -> Self {
        self.ready.store(true, Ordering::Release);
        self
    }

    pub fn with_langs(mut self, langs: Vec<LanguageDescriptor>) -> Self {
        self.langs = LangsBehavior::Return(langs);
        self
    }

    pub fn failing_langs(mut self, message: &str) -> Self {
        self.langs = LangsBehavior::Fail(message.to_string());
        self
    }

    pub fn hanging_langs(mut self) -> Self {
        self.langs = LangsBehavior::Hang;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Ok(port);
        self
    }

    pub fn failing_port(mut self, message: &str) -> Self {
        self.port = Err(message.to_string());
        self
    }

    pub fn emit_ready(&self) {
        self.ready.store(true, Ordering::Release);
        if let Some(events) = self.events.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            let _ = events.send(HostEvent::Ready);
        }
    }

    pub fn close_events(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

#[async_trait]
impl HostApi for FakeHost {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        match self.events.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(events) => events.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    async fn get_langs(&self) -> Result<Vec<LanguageDescriptor>, HostError> {
        self.langs_calls.fetch_add(1, Ordering::SeqCst);
        match &self.langs {
            LangsBehavior::Return(langs) => Ok(langs.clone()),
            LangsBehavior::Fail(message) => Err(HostError::Rpc {
                code: -32000,
                message: message.clone(),
            }),
            LangsBehavior::Hang => std::future::pending().await,
        }
    }

    async fn get_port(&self) -> Result<u16, HostError> {
        self.port_calls.fetch_add(1, Ordering::SeqCst);
        self.port.clone().map_err(|message| HostError::Rpc {
            code: -32000,
            message,
        })
    }
}

/// Socket factory that records every connection it is asked to open
///
/// Sockets for languages listed in `failing` are put straight into the
/// failed state; the rest are reported open. Drivers are kept so tests can
/// play the server side.
#[derive(Default)]
pub struct RecordingSocketFactory {
    failing: HashSet<String>,
    opened: Mutex<Vec<(String, Url)>>,
    drivers: Mutex<Vec<SocketDriver>>,
}

impl RecordingSocketFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, language: &str) -> Self {
        self.failing.insert(language.to_string());
        self
    }

    pub fn opened(&self) -> Vec<(String, Url)> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take_driver(&self, language: &str) -> Option<SocketDriver> {
        let mut drivers = self.drivers.lock().unwrap_or_else(PoisonError::into_inner);
        let index = drivers.iter().position(|d| d.language() == language)?;
        Some(drivers.remove(index))
    }
}

impl SocketFactory for RecordingSocketFactory {
    fn open(&self, language: &str, url: Url) -> LspSocket {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((language.to_string(), url.clone()));

        let (socket, driver) = LspSocket::pair(language, url);
        if self.failing.contains(language) {
            driver.set_state(SocketState::Failed("connection refused".to_string()));
        } else {
            driver.set_state(SocketState::Open);
        }
        self.drivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(driver);
        socket
    }
}
