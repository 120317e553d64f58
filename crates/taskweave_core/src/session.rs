//! Session boundary consumed by the task service.
//!
//! # Responsibility
//! - Report the owner whose tasks are currently visible.
//! - Publish sign-in/sign-out transitions to subscribers.
//!
//! # Invariants
//! - `current_owner()` is `None` exactly while signed out.
//! - Every state change publishes one event; repeated sign-outs publish
//!   nothing.

use crate::model::task::OwnerId;
use log::info;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 16;

/// Session transition observed by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(OwnerId),
    SignedOut,
}

/// Identity source for owner-scoped persistence.
pub trait SessionProvider: Send + Sync {
    /// Owner of the active session, if any.
    fn current_owner(&self) -> Option<OwnerId>;

    /// Receiver for subsequent session transitions.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

/// Session with a fixed owner that never signs out.
///
/// Used for the local backend (with [`OwnerId::local`]) and for command-line
/// runs where the owner comes from configuration.
pub struct StaticSession {
    owner: OwnerId,
    events: broadcast::Sender<SessionEvent>,
}

impl StaticSession {
    pub fn new(owner: OwnerId) -> Self {
        let (events, _) = broadcast::channel(1);
        Self { owner, events }
    }

    pub fn local() -> Self {
        Self::new(OwnerId::local())
    }
}

impl SessionProvider for StaticSession {
    fn current_owner(&self) -> Option<OwnerId> {
        Some(self.owner)
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Mutable session state fed by an external authentication flow.
pub struct SessionHub {
    owner: RwLock<Option<OwnerId>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHub {
    /// Creates a signed-out hub.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            owner: RwLock::new(None),
            events,
        }
    }

    /// Records a successful sign-in and notifies subscribers.
    ///
    /// Signing in as the current owner again is a no-op.
    pub fn sign_in(&self, owner: OwnerId) {
        {
            let mut current = self.owner.write().unwrap_or_else(PoisonError::into_inner);
            if *current == Some(owner) {
                return;
            }
            *current = Some(owner);
        }
        info!("event=session_sign_in module=session status=ok");
        // No subscribers is fine; state is still readable via current_owner.
        let _ = self.events.send(SessionEvent::SignedIn(owner));
    }

    /// Ends the session and notifies subscribers.
    pub fn sign_out(&self) {
        {
            let mut current = self.owner.write().unwrap_or_else(PoisonError::into_inner);
            if current.take().is_none() {
                return;
            }
        }
        info!("event=session_sign_out module=session status=ok");
        let _ = self.events.send(SessionEvent::SignedOut);
    }
}

impl SessionProvider for SessionHub {
    fn current_owner(&self) -> Option<OwnerId> {
        *self.owner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionEvent, SessionHub, SessionProvider, StaticSession};
    use crate::model::task::OwnerId;
    use uuid::Uuid;

    #[test]
    fn hub_publishes_each_transition_once() {
        let hub = SessionHub::new();
        let mut events = hub.subscribe();
        let owner = OwnerId::new(Uuid::new_v4());

        hub.sign_in(owner);
        hub.sign_in(owner);
        hub.sign_out();
        hub.sign_out();

        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn(owner));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);
        assert!(events.try_recv().is_err());
        assert_eq!(hub.current_owner(), None);
    }

    #[test]
    fn static_local_session_is_always_signed_in() {
        let session = StaticSession::local();
        assert_eq!(session.current_owner(), Some(OwnerId::local()));
    }
}
