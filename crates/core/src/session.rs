use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

/// What input the bot expects next from a given user.
///
/// `Idle` and an absent store entry mean the same thing: no active
/// conversation. Terminal actions clear the entry rather than writing `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingTicketNumber,
    AwaitingErrorInfo,
    AwaitingTicketCreationAfterError,
    AwaitingNewTicketAfterError,
    AwaitingTicketDetails,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Per-user conversation state, keyed by sender identity (email).
///
/// Concurrent requests for different users must not interfere; ordering of
/// concurrent requests for the *same* user is undefined (known limitation,
/// not a guarantee). No eviction, no persistence: state resets with the
/// process.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, identity: &str) -> Option<SessionState>;
    async fn set(&self, identity: &str, state: SessionState);
    async fn clear(&self, identity: &str);
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|sessions| sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, identity: &str) -> Option<SessionState> {
        self.sessions.read().ok().and_then(|sessions| sessions.get(identity).copied())
    }

    async fn set(&self, identity: &str, state: SessionState) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(identity.to_owned(), state);
        }
    }

    async fn clear(&self, identity: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(identity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemorySessionStore, SessionState, SessionStore};

    #[tokio::test]
    async fn set_get_clear_round_trip() {
        let store = InMemorySessionStore::new();

        assert_eq!(store.get("a@x.com").await, None);

        store.set("a@x.com", SessionState::AwaitingTicketNumber).await;
        assert_eq!(store.get("a@x.com").await, Some(SessionState::AwaitingTicketNumber));

        store.clear("a@x.com").await;
        assert_eq!(store.get("a@x.com").await, None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn entries_are_isolated_per_identity() {
        let store = InMemorySessionStore::new();

        store.set("a@x.com", SessionState::AwaitingErrorInfo).await;
        store.set("b@x.com", SessionState::AwaitingTicketDetails).await;
        store.clear("a@x.com").await;

        assert_eq!(store.get("a@x.com").await, None);
        assert_eq!(store.get("b@x.com").await, Some(SessionState::AwaitingTicketDetails));
    }

    #[tokio::test]
    async fn set_replaces_existing_state() {
        let store = InMemorySessionStore::new();

        store.set("a@x.com", SessionState::AwaitingErrorInfo).await;
        store.set("a@x.com", SessionState::AwaitingNewTicketAfterError).await;

        assert_eq!(store.get("a@x.com").await, Some(SessionState::AwaitingNewTicketAfterError));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn idle_is_not_an_active_session() {
        assert!(!SessionState::Idle.is_active());
        assert!(SessionState::AwaitingTicketNumber.is_active());
    }
}
