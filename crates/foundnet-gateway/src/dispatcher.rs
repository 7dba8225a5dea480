use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, mpsc};

use foundnet_types::events::ChatEvent;

/// Deterministic room id for a pair of users: the two ids sorted ascending,
/// so both participants resolve the same room regardless of who initiated.
pub fn pair_room(user_a: i64, user_b: i64) -> String {
    format!("chat_{}_{}", user_a.min(user_b), user_a.max(user_b))
}

struct Member {
    user_id: i64,
    tx: mpsc::UnboundedSender<ChatEvent>,
}

/// Tracks room membership and relays events to connected clients.
///
/// Handlers receive the dispatcher through the shared server state rather
/// than a process-global, so delivery is an injected capability.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// room id -> (connection id -> member)
    rooms: RwLock<HashMap<String, HashMap<u64, Member>>>,
    next_conn_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                rooms: RwLock::new(HashMap::new()),
                next_conn_id: AtomicU64::new(1),
            }),
        }
    }

    /// Allocate an id for a new WebSocket connection.
    pub fn next_conn_id(&self) -> u64 {
        self.inner.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn join(
        &self,
        room: &str,
        conn_id: u64,
        user_id: i64,
        tx: mpsc::UnboundedSender<ChatEvent>,
    ) {
        self.inner
            .rooms
            .write()
            .await
            .entry(room.to_string())
            .or_default()
            .insert(conn_id, Member { user_id, tx });
    }

    pub async fn leave(&self, room: &str, conn_id: u64) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(members) = rooms.get_mut(room) {
            members.remove(&conn_id);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Drop a connection from every room it joined. Used on disconnect.
    pub async fn leave_all(&self, conn_id: u64) {
        let mut rooms = self.inner.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Publish an event to every connection in the room. Fire-and-forget:
    /// a member whose channel is gone is simply skipped.
    pub async fn publish(&self, room: &str, event: ChatEvent) {
        let rooms = self.inner.rooms.read().await;
        if let Some(members) = rooms.get(room) {
            for member in members.values() {
                let _ = member.tx.send(event.clone());
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_room_is_symmetric() {
        assert_eq!(pair_room(3, 7), "chat_3_7");
        assert_eq!(pair_room(7, 3), "chat_3_7");
        assert_eq!(pair_room(3, 7), pair_room(7, 3));
    }

    #[tokio::test]
    async fn publish_reaches_room_members_only() {
        let dispatcher = Dispatcher::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        let conn_a = dispatcher.next_conn_id();
        let conn_b = dispatcher.next_conn_id();
        dispatcher.join(&pair_room(1, 2), conn_a, 1, tx_a).await;
        dispatcher.join(&pair_room(3, 4), conn_b, 3, tx_b).await;

        dispatcher
            .publish(&pair_room(2, 1), ChatEvent::Status { msg: "hi".into() })
            .await;

        assert!(matches!(rx_a.try_recv(), Ok(ChatEvent::Status { .. })));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_all_clears_membership() {
        let dispatcher = Dispatcher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = dispatcher.next_conn_id();

        dispatcher.join(&pair_room(1, 2), conn, 1, tx.clone()).await;
        dispatcher.join(&pair_room(1, 5), conn, 1, tx).await;

        dispatcher.leave_all(conn).await;
        dispatcher
            .publish(&pair_room(1, 2), ChatEvent::Status { msg: "a".into() })
            .await;
        dispatcher
            .publish(&pair_room(1, 5), ChatEvent::Status { msg: "b".into() })
            .await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_to_dead_channel_is_ignored() {
        let dispatcher = Dispatcher::new();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let conn = dispatcher.next_conn_id();
        dispatcher.join(&pair_room(1, 2), conn, 1, tx).await;

        // must not panic or error
        dispatcher
            .publish(&pair_room(1, 2), ChatEvent::Status { msg: "gone".into() })
            .await;
    }
}
