use crate::domain::models::AuthSession;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

type Listener = Arc<dyn Fn(SessionEvent, Option<&AuthSession>) + Send + Sync>;

#[derive(Default)]
struct ContextState {
    session: Option<AuthSession>,
    listeners: Vec<(u64, Listener)>,
}

#[derive(Default)]
struct ContextInner {
    state: Mutex<ContextState>,
    next_listener_id: AtomicU64,
}

impl ContextInner {
    fn state(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove_listener(&self, id: u64) -> bool {
        let mut state = self.state();
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        state.listeners.len() != before
    }
}

/// The signed-in session shared by every view, passed explicitly.
///
/// Clones share the same session and listener list.
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        formatter
            .debug_struct("SessionContext")
            .field("user_id", &state.session.as_ref().map(AuthSession::user_id))
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.inner.state().session.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner.state().session.is_some()
    }

    /// Replaces the session and notifies listeners after the lock is released.
    pub fn set(&self, event: SessionEvent, session: Option<AuthSession>) {
        let listeners = {
            let mut state = self.inner.state();
            state.session = session.clone();
            state
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect::<Vec<_>>()
        };
        for listener in listeners {
            listener(event, session.as_ref());
        }
    }

    /// Registers a listener and immediately replays the current session as
    /// `InitialSession`.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(SessionEvent, Option<&AuthSession>) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed) + 1;
        let listener: Listener = Arc::new(listener);
        let current = {
            let mut state = self.inner.state();
            state.listeners.push((id, Arc::clone(&listener)));
            state.session.clone()
        };
        listener(SessionEvent::InitialSession, current.as_ref());
        Subscription {
            id,
            context: Arc::downgrade(&self.inner),
        }
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        self.inner.remove_listener(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.state().listeners.len()
    }
}

/// Handle returned by [`SessionContext::subscribe`]; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    context: Weak<ContextInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.context.upgrade() {
            inner.remove_listener(self.id);
        }
    }
}
