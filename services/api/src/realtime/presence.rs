//! Connection registry mapping authenticated users to live sockets
//!
//! One connection per user: a new socket for an already-registered user
//! replaces the previous sender, so stale connections stop receiving
//! events as soon as the client reconnects.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::ServerEvent;

/// Handle for pushing events to one connected client
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Presence tracking and event fan-out
pub trait ConnectionRegistry: Send + Sync {
    /// Register a user's connection, replacing any previous one
    fn register(&self, user_id: Uuid, sender: EventSender);

    /// Remove a user's connection if the given sender still owns it
    fn unregister(&self, user_id: Uuid, sender: &EventSender);

    /// Deliver an event to one user; false when the user is offline
    fn send_to(&self, user_id: Uuid, event: ServerEvent) -> bool;

    /// Deliver an event to every connected user
    fn broadcast(&self, event: ServerEvent);

    /// IDs of all currently connected users
    fn online_users(&self) -> Vec<Uuid>;

    fn is_online(&self, user_id: Uuid) -> bool;
}

/// In-process registry backed by a mutex-guarded map
#[derive(Default)]
pub struct InMemoryRegistry {
    connections: Mutex<HashMap<Uuid, EventSender>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConnectionRegistry for InMemoryRegistry {
    fn register(&self, user_id: Uuid, sender: EventSender) {
        let mut connections = self.connections.lock().unwrap();
        connections.insert(user_id, sender);
    }

    fn unregister(&self, user_id: Uuid, sender: &EventSender) {
        let mut connections = self.connections.lock().unwrap();
        // A reconnect may have replaced this entry already
        if connections
            .get(&user_id)
            .is_some_and(|current| current.same_channel(sender))
        {
            connections.remove(&user_id);
        }
    }

    fn send_to(&self, user_id: Uuid, event: ServerEvent) -> bool {
        let connections = self.connections.lock().unwrap();
        match connections.get(&user_id) {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        let connections = self.connections.lock().unwrap();
        for sender in connections.values() {
            let _ = sender.send(event.clone());
        }
    }

    fn online_users(&self) -> Vec<Uuid> {
        let connections = self.connections.lock().unwrap();
        connections.keys().copied().collect()
    }

    fn is_online(&self, user_id: Uuid) -> bool {
        let connections = self.connections.lock().unwrap();
        connections.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::PresenceStatus;
    use chrono::Utc;

    fn status_event(user_id: Uuid) -> ServerEvent {
        ServerEvent::UserStatusChange {
            user_id,
            status: PresenceStatus::Online,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_register_and_send() {
        let registry = InMemoryRegistry::new();
        let user_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.register(user_id, tx);
        assert!(registry.is_online(user_id));
        assert_eq!(registry.online_users(), vec![user_id]);

        assert!(registry.send_to(user_id, status_event(user_id)));
        assert!(rx.try_recv().is_ok());

        assert!(!registry.send_to(Uuid::new_v4(), status_event(user_id)));
    }

    #[test]
    fn test_broadcast_reaches_every_connection() {
        let registry = InMemoryRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.register(Uuid::new_v4(), tx_a);
        registry.register(Uuid::new_v4(), tx_b);

        registry.broadcast(status_event(Uuid::new_v4()));
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_unregister_ignores_replaced_connection() {
        let registry = InMemoryRegistry::new();
        let user_id = Uuid::new_v4();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        registry.register(user_id, old_tx.clone());
        registry.register(user_id, new_tx);

        // The stale connection's teardown must not evict the new one
        registry.unregister(user_id, &old_tx);
        assert!(registry.is_online(user_id));
        assert!(registry.send_to(user_id, status_event(user_id)));
        assert!(new_rx.try_recv().is_ok());
    }

    #[test]
    fn test_unregister_removes_connection() {
        let registry = InMemoryRegistry::new();
        let user_id = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();

        registry.register(user_id, tx.clone());
        registry.unregister(user_id, &tx);
        assert!(!registry.is_online(user_id));
        assert!(registry.online_users().is_empty());
    }
}
