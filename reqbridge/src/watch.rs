//! Configuration change notifications with disposable subscriptions.
//!
//! [`ConfigWatchers::publish`] stores the new snapshot and drives every live
//! subscriber concurrently, returning once all of them finished. Subscribers
//! get no ordering guarantee relative to each other.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{BoxFuture, FutureExt, join_all};
use tracing::{debug, instrument};

use crate::io::config::BridgeConfig;

type Callback = Arc<dyn Fn(Arc<BridgeConfig>) -> BoxFuture<'static, ()> + Send + Sync>;

struct Subscriber {
    id: u64,
    callback: Callback,
}

struct Inner {
    current: Mutex<Arc<BridgeConfig>>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn is_subscribed(&self, id: u64) -> bool {
        lock(&self.subscribers).iter().any(|sub| sub.id == id)
    }

    fn unsubscribe(&self, id: u64) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|sub| sub.id != id);
        before != subscribers.len()
    }
}

#[derive(Clone)]
pub struct ConfigWatchers {
    inner: Arc<Inner>,
}

impl ConfigWatchers {
    pub fn new(initial: BridgeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                current: Mutex::new(Arc::new(initial)),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Latest published snapshot.
    pub fn current(&self) -> Arc<BridgeConfig> {
        lock(&self.inner.current).clone()
    }

    /// Register `callback` for future publishes. It does not fire for the
    /// current snapshot; see [`ConfigWatchers::notify_current`].
    pub fn subscribe<F, Fut>(&self, callback: F) -> WatcherHandle
    where
        F: Fn(Arc<BridgeConfig>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback = Arc::new(move |config| callback(config).boxed());
        lock(&self.inner.subscribers).push(Subscriber { id, callback });
        WatcherHandle {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Replace the snapshot and notify every live subscriber.
    #[instrument(skip_all)]
    pub async fn publish(&self, config: BridgeConfig) {
        let config = Arc::new(config);
        *lock(&self.inner.current) = config.clone();
        self.notify(config).await;
    }

    /// Notify every live subscriber of the current snapshot again.
    pub async fn notify_current(&self) {
        self.notify(self.current()).await;
    }

    async fn notify(&self, config: Arc<BridgeConfig>) {
        let targets: Vec<(u64, Callback)> = lock(&self.inner.subscribers)
            .iter()
            .map(|sub| (sub.id, sub.callback.clone()))
            .collect();
        debug!(subscribers = targets.len(), "notifying config watchers");

        let inner = self.inner.clone();
        let runs = targets.into_iter().map(|(id, callback)| {
            let inner = inner.clone();
            let config = config.clone();
            async move {
                // A subscriber disposed by an earlier one in this round is skipped.
                if inner.is_subscribed(id) {
                    callback(config).await;
                }
            }
        });
        join_all(runs).await;
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }
}

/// Subscription returned by [`ConfigWatchers::subscribe`].
///
/// Dropping the handle keeps the subscription alive; call
/// [`WatcherHandle::dispose`] to end it. Work already started by an earlier
/// notification is not cancelled.
#[derive(Debug)]
pub struct WatcherHandle {
    id: u64,
    inner: Weak<Inner>,
}

impl WatcherHandle {
    /// Stop future notifications. Idempotent.
    pub fn dispose(&self) {
        if let Some(inner) = self.inner.upgrade()
            && inner.unsubscribe(self.id)
        {
            debug!(id = self.id, "config watcher disposed");
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.is_subscribed(self.id))
    }
}
