//! Bookkeeping for session-change listeners.
//!
//! Providers keep a `ListenerRegistry` and hand out a `Subscription` per
//! registered listener. Releasing the subscription (explicitly or by drop)
//! removes the listener: any notification that reaches it after the release
//! returned skips it, including one already fanning out. A call that had
//! started on another thread before the release may still finish.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::debug;
use uuid::Uuid;

use crate::models::Session;

/// Callback invoked with the new session (or `None` on sign-out/expiry).
pub type AuthChangeListener = Arc<dyn Fn(Option<Session>) + Send + Sync>;

type Listeners = RwLock<Vec<(Uuid, AuthChangeListener)>>;

#[derive(Default, Clone)]
pub struct ListenerRegistry {
    listeners: Arc<Listeners>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: AuthChangeListener) -> Subscription {
        let id = Uuid::new_v4();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        debug!(
            event_name = "providers.listeners.registered",
            event_domain = "providers",
            subscription_id = %id,
            "session listener registered"
        );
        Subscription {
            id,
            registry: Some(Arc::downgrade(&self.listeners)),
        }
    }

    /// Deliver `session` to every live listener, in registration order.
    pub fn notify(&self, session: Option<Session>) {
        // Listeners run outside the lock so they may (un)register freely.
        let listeners: Vec<(Uuid, AuthChangeListener)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        debug!(
            event_name = "providers.listeners.notify",
            event_domain = "providers",
            listener_count = listeners.len(),
            signed_in = session.is_some(),
            "notifying session listeners"
        );
        for (id, listener) in listeners {
            // An earlier listener may have released this one.
            if self.is_registered(id) {
                listener(session.clone());
            }
        }
    }

    fn is_registered(&self, id: Uuid) -> bool {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(registered, _)| *registered == id)
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for a registered listener.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: Uuid,
    registry: Option<Weak<Listeners>>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(registry) = self.registry.take() else {
            return;
        };
        let own_id = self.id;
        // The provider may already be gone, in which case there is nothing to remove.
        if let Some(listeners) = registry.upgrade() {
            listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != own_id);
            debug!(
                event_name = "providers.listeners.released",
                event_domain = "providers",
                subscription_id = %own_id,
                "session listener released"
            );
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.registry.is_some())
            .finish()
    }
}
