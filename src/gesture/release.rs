use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Listener = Arc<dyn Fn() + Send + Sync>;
type Listeners = Mutex<Vec<(u64, Listener)>>;

/// Document-wide "pointer released" signal (mouse-up / touch-end anywhere).
///
/// The host calls `release()` for every release, whatever element it happened
/// on. Listeners only exist while someone holds a `ReleaseSubscription`.
#[derive(Default)]
pub struct ReleaseSource {
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
}

impl ReleaseSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a listener. It is removed when the returned guard is dropped.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> ReleaseSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        ReleaseSubscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver a release to every installed listener.
    pub fn release(&self) {
        // Listeners may drop their own subscription, so call them unlocked
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl std::fmt::Debug for ReleaseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseSource")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Guard for one installed release listener.
#[must_use = "the listener is removed as soon as the subscription is dropped"]
pub struct ReleaseSubscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Drop for ReleaseSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
