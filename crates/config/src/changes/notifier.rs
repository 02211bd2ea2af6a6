//! Subscriber registry and broadcast channel for change notifications

use super::event::ChangeNotification;
use parking_lot::RwLock;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

/// Callback invoked for each committed change batch
pub type ChangeCallback = Arc<dyn Fn(&ChangeNotification) + Send + Sync>;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(u64, ChangeCallback)>>,
}

impl Registry {
    fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }
}

/// Delivers change batches to callbacks (in subscription order) and to
/// channel receivers
///
/// A panicking callback is caught and logged; later callbacks still run.
pub struct ChangeNotifier {
    registry: Arc<Registry>,
    sender: broadcast::Sender<Arc<ChangeNotification>>,
    delivered: AtomicU64,
}

impl ChangeNotifier {
    /// Create a notifier with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a notifier whose channel buffers `capacity` batches
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            registry: Arc::new(Registry::default()),
            sender,
            delivered: AtomicU64::new(0),
        }
    }

    /// Register a callback; it stays registered while the handle lives
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChangeNotification) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .subscribers
            .write()
            .push((id, Arc::new(callback)));
        folio_log::debug!(subscriber = id, "Change subscriber registered");
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Receiver for the channel-based alternative
    pub fn channel(&self) -> ChangeReceiver {
        ChangeReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Deliver one batch; returns how many callbacks completed
    pub fn notify(&self, notification: ChangeNotification) -> usize {
        if notification.events.is_empty() {
            return 0;
        }

        // Snapshot so callbacks may (un)subscribe without deadlocking
        let subscribers: Vec<(u64, ChangeCallback)> = self.registry.subscribers.read().clone();

        let mut completed = 0;
        for (id, callback) in &subscribers {
            match catch_unwind(AssertUnwindSafe(|| callback(&notification))) {
                Ok(()) => completed += 1,
                Err(payload) => {
                    folio_log::error!(
                        subscriber = id,
                        panic = %panic_message(payload.as_ref()),
                        "Change subscriber panicked; continuing delivery"
                    );
                }
            }
        }

        self.delivered.fetch_add(1, Ordering::Relaxed);
        // No receivers is fine
        let _ = self.sender.send(Arc::new(notification));
        completed
    }

    /// Number of registered callbacks
    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.read().len()
    }

    /// Number of batches delivered so far
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Drop every registered callback
    pub fn clear(&self) {
        self.registry.subscribers.write().clear();
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .field("receivers", &self.sender.receiver_count())
            .field("delivered", &self.delivered())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Handle tying a callback to the notifier
///
/// Dropping it, or calling [`Subscription::unsubscribe`], removes the
/// callback.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Identifier used in logs
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the callback is still registered
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry
                .subscribers
                .read()
                .iter()
                .any(|(id, _)| *id == self.id)
        })
    }

    /// Remove the callback now
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade()
            && registry.remove(self.id)
        {
            folio_log::debug!(subscriber = self.id, "Change subscriber removed");
        }
    }
}

/// Channel receiver for change batches
pub struct ChangeReceiver {
    receiver: broadcast::Receiver<Arc<ChangeNotification>>,
}

impl ChangeReceiver {
    /// Wait for the next batch
    ///
    /// Skips batches missed while lagging; returns `None` once the notifier
    /// is gone.
    pub async fn recv(&mut self) -> Option<Arc<ChangeNotification>> {
        loop {
            match self.receiver.recv().await {
                Ok(batch) => return Some(batch),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    folio_log::warn!(skipped, "Change receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take a batch if one is ready
    pub fn try_recv(&mut self) -> Option<Arc<ChangeNotification>> {
        loop {
            match self.receiver.try_recv() {
                Ok(batch) => return Some(batch),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }
}

impl std::fmt::Debug for ChangeReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeReceiver").finish_non_exhaustive()
    }
}
