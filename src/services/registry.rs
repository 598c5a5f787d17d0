//! Deferred publication of the language provider
//!
//! Consumers may ask for the provider before it exists. Requests made
//! before publication are queued and resolved in the order they were made;
//! requests made afterwards resolve immediately. Every request sees the same
//! instance.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::RegistryError;

enum RegistryState<T> {
    Unpublished(VecDeque<oneshot::Sender<Arc<T>>>),
    Published(Arc<T>),
}

pub struct ProviderRegistry<T> {
    state: Mutex<RegistryState<T>>,
}

impl<T> Default for ProviderRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ProviderRegistry<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::Unpublished(VecDeque::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Provider if already published
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.lock() {
            RegistryState::Published(value) => Some(Arc::clone(value)),
            RegistryState::Unpublished(_) => None,
        }
    }

    /// Number of requests still waiting for publication
    pub fn pending_len(&self) -> usize {
        match &*self.lock() {
            RegistryState::Unpublished(waiters) => waiters.len(),
            RegistryState::Published(_) => 0,
        }
    }

    /// Request the provider
    ///
    /// The request is registered when this is called, not when the
    /// returned future is first polled. If the provider is never published
    /// the future never resolves.
    pub fn request(&self) -> impl Future<Output = Arc<T>> + Send + 'static
    where
        T: Send + Sync + 'static,
    {
        let waiter = match &mut *self.lock() {
            RegistryState::Published(value) => Ok(Arc::clone(value)),
            RegistryState::Unpublished(waiters) => {
                let (tx, rx) = oneshot::channel();
                waiters.push_back(tx);
                Err(rx)
            }
        };

        async move {
            match waiter {
                Ok(value) => value,
                Err(rx) => match rx.await {
                    Ok(value) => value,
                    // Registry dropped unpublished
                    Err(_) => std::future::pending().await,
                },
            }
        }
    }

    /// Like [`request`](Self::request) but gives up after `timeout`
    pub async fn request_within(&self, timeout: Duration) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
    {
        tokio::time::timeout(timeout, self.request())
            .await
            .map_err(|_| RegistryError::Timeout(timeout))
    }

    /// Store the provider and release every queued request, oldest first
    pub fn publish(&self, value: T) -> Result<Arc<T>, RegistryError> {
        let value = Arc::new(value);
        let mut state = self.lock();

        let waiters = match &mut *state {
            RegistryState::Published(_) => {
                tracing::error!("Language provider published twice");
                return Err(RegistryError::AlreadyPublished);
            }
            RegistryState::Unpublished(waiters) => std::mem::take(waiters),
        };
        *state = RegistryState::Published(Arc::clone(&value));

        let count = waiters.len();
        for waiter in waiters {
            // Receiver may have been dropped by a cancelled caller
            let _ = waiter.send(Arc::clone(&value));
        }
        drop(state);

        tracing::debug!("Provider published, released {} waiting requests", count);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use tokio_test::task::spawn;
    use tokio_test::{assert_pending, assert_ready};

    use super::*;

    #[derive(Debug)]
    struct Provider(&'static str);

    #[test]
    fn test_requests_before_publish_are_pending() {
        let registry = ProviderRegistry::<Provider>::new();
        let mut first = spawn(registry.request());
        let mut second = spawn(registry.request());

        assert_pending!(first.poll());
        assert_pending!(second.poll());
        assert_eq!(registry.pending_len(), 2);

        registry.publish(Provider("bridge")).unwrap();

        assert!(first.is_woken());
        let a = assert_ready!(first.poll());
        let b = assert_ready!(second.poll());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.0, "bridge");
        assert_eq!(registry.pending_len(), 0);
    }

    #[test]
    fn test_request_after_publish_resolves_immediately() {
        let registry = ProviderRegistry::new();
        let published = registry.publish(Provider("bridge")).unwrap();

        let mut late = spawn(registry.request());
        let value = assert_ready!(late.poll());
        assert!(Arc::ptr_eq(&value, &published));
        assert!(Arc::ptr_eq(&registry.get().unwrap(), &published));
    }

    #[test]
    fn test_second_publish_is_rejected() {
        let registry = ProviderRegistry::new();
        let first = registry.publish(Provider("first")).unwrap();

        assert_eq!(
            registry.publish(Provider("second")).unwrap_err(),
            RegistryError::AlreadyPublished
        );
        assert!(Arc::ptr_eq(&registry.get().unwrap(), &first));
        assert_eq!(registry.get().unwrap().0, "first");
    }

    #[tokio::test]
    async fn test_waiters_resolve_in_registration_order() {
        let registry = Arc::new(ProviderRegistry::<Provider>::new());
        let order = Arc::new(StdMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let request = registry.request();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _ = request.await;
                order.lock().unwrap().push(i);
            }));
        }

        registry.publish(Provider("bridge")).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        // Single-threaded runtime: wake order follows send order
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_dropped_request_does_not_block_others() {
        let registry = ProviderRegistry::<Provider>::new();
        let abandoned = registry.request();
        let kept = registry.request();
        drop(abandoned);

        registry.publish(Provider("bridge")).unwrap();
        assert_eq!(kept.await.0, "bridge");
    }

    #[tokio::test]
    async fn test_request_within_times_out_when_unpublished() {
        let registry = ProviderRegistry::<Provider>::new();
        let result = registry.request_within(Duration::from_millis(20)).await;
        assert_eq!(result.unwrap_err(), RegistryError::Timeout(Duration::from_millis(20)));
    }

    #[test]
    fn test_request_stays_pending_when_registry_dropped() {
        let registry = ProviderRegistry::<Provider>::new();
        let mut request = spawn(registry.request());
        drop(registry);
        assert_pending!(request.poll());
    }
}
