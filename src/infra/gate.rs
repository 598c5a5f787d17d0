//! Host readiness gate
//!
//! A one-shot, process-wide signal that flips from closed to open exactly
//! once. Arming the gate against a host subscribes to the host's `ready`
//! event *before* checking whether the host is already up, so an event that
//! lands between the two steps cannot be missed.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tokio::sync::broadcast::error::RecvError;

use super::host::{HostApi, HostEvent};
use crate::error::HostError;

#[derive(Debug, Default)]
pub struct ReadinessGate {
    open: AtomicBool,
    notify: Notify,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate. Returns `true` only for the call that opened it.
    pub fn fire(&self) -> bool {
        let fired = self
            .open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if fired {
            tracing::debug!("Host readiness gate opened");
            self.notify.notify_waiters();
        }
        fired
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Wait until the gate is open
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent fire wakes us
            notified.as_mut().enable();
            if self.is_open() {
                return;
            }
            notified.await;
        }
    }

    /// Open the gate once `host` reports readiness
    ///
    /// Resolves immediately when the host is already up. Otherwise listens
    /// for the first `ready` event only; later events are never observed.
    /// Fails if the host's event stream ends before it ever became ready.
    pub async fn arm(&self, host: &dyn HostApi) -> Result<(), HostError> {
        if self.is_open() {
            return Ok(());
        }

        let mut events = host.subscribe();
        if host.is_ready() {
            self.fire();
            return Ok(());
        }
        if host.is_closed() {
            return Err(HostError::ClosedBeforeReady);
        }

        tracing::debug!("Host not ready yet, waiting for ready event");
        loop {
            match events.recv().await {
                Ok(HostEvent::Ready) => {
                    self.fire();
                    return Ok(());
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Missed {} host events while waiting", skipped);
                    if host.is_ready() {
                        self.fire();
                        return Ok(());
                    }
                }
                Ok(HostEvent::Closed) | Err(RecvError::Closed) => {
                    // Someone else may have opened the gate from another source
                    if self.is_open() || host.is_ready() {
                        self.fire();
                        return Ok(());
                    }
                    return Err(HostError::ClosedBeforeReady);
                }
            }
        }
    }
}
