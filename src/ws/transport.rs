//! Outbound message routing to sockets and match rooms

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::game::{ConnId, MatchId};
use crate::ws::protocol::ServerMsg;

/// Where the matchmaker sends what the simulation produces
pub trait Transport: Send + Sync + 'static {
    fn send_to(&self, conn: ConnId, msg: &ServerMsg);

    /// Everyone in the match room, optionally minus one
    fn broadcast(&self, room: MatchId, msg: &ServerMsg, except: Option<ConnId>);

    fn join_room(&self, room: MatchId, conn: ConnId);

    fn leave_room(&self, room: MatchId, conn: ConnId);

    fn close_room(&self, room: MatchId);
}

/// Frames are serialized once and shared between recipients
pub type Frame = Arc<str>;

/// Live socket writers and room membership
#[derive(Default)]
pub struct ConnectionHub {
    conns: DashMap<ConnId, mpsc::UnboundedSender<Frame>>,
    rooms: DashMap<MatchId, HashSet<ConnId>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a socket; the receiver feeds its writer task
    pub fn register(&self, conn: ConnId) -> mpsc::UnboundedReceiver<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.conns.insert(conn, tx);
        rx
    }

    pub fn unregister(&self, conn: ConnId) {
        self.conns.remove(&conn);
    }

    pub fn connection_count(&self) -> usize {
        self.conns.len()
    }

    pub fn room_size(&self, room: MatchId) -> usize {
        self.rooms.get(&room).map(|r| r.len()).unwrap_or(0)
    }

    fn encode(msg: &ServerMsg) -> Option<Frame> {
        match serde_json::to_string(msg) {
            Ok(json) => Some(json.into()),
            Err(e) => {
                warn!(error = %e, "Failed to serialize server message");
                None
            }
        }
    }

    fn push(&self, conn: &ConnId, frame: &Frame) {
        if let Some(tx) = self.conns.get(conn) {
            if tx.send(Arc::clone(frame)).is_err() {
                debug!(conn_id = %conn, "Dropped frame for closed connection");
            }
        }
    }
}

impl Transport for ConnectionHub {
    fn send_to(&self, conn: ConnId, msg: &ServerMsg) {
        if let Some(frame) = Self::encode(msg) {
            self.push(&conn, &frame);
        }
    }

    fn broadcast(&self, room: MatchId, msg: &ServerMsg, except: Option<ConnId>) {
        let Some(members) = self.rooms.get(&room) else {
            return;
        };
        let Some(frame) = Self::encode(msg) else {
            return;
        };
        for conn in members.iter().filter(|c| Some(**c) != except) {
            self.push(conn, &frame);
        }
    }

    fn join_room(&self, room: MatchId, conn: ConnId) {
        self.rooms.entry(room).or_default().insert(conn);
    }

    fn leave_room(&self, room: MatchId, conn: ConnId) {
        if let Some(mut members) = self.rooms.get_mut(&room) {
            members.remove(&conn);
        }
    }

    fn close_room(&self, room: MatchId) {
        self.rooms.remove(&room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn msg() -> ServerMsg {
        ServerMsg::PickupGone { id: 7 }
    }

    #[test]
    fn broadcast_reaches_room_except_excluded() {
        let hub = ConnectionHub::new();
        let (a, b, outsider) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut rx_a = hub.register(a);
        let mut rx_b = hub.register(b);
        let mut rx_out = hub.register(outsider);
        hub.join_room(1, a);
        hub.join_room(1, b);

        hub.broadcast(1, &msg(), Some(b));
        assert_eq!(&*rx_a.try_recv().unwrap(), r#"{"type":"pickupGone","id":7}"#);
        assert!(rx_b.try_recv().is_err());
        assert!(rx_out.try_recv().is_err());

        hub.send_to(outsider, &msg());
        assert!(rx_out.try_recv().is_ok());
    }

    #[test]
    fn closed_rooms_stop_broadcasting() {
        let hub = ConnectionHub::new();
        let a = Uuid::new_v4();
        let mut rx = hub.register(a);
        hub.join_room(3, a);
        assert_eq!(hub.room_size(3), 1);

        hub.close_room(3);
        hub.broadcast(3, &msg(), None);
        assert!(rx.try_recv().is_err());
        assert_eq!(hub.room_size(3), 0);
    }

    #[test]
    fn unregistered_connections_are_skipped() {
        let hub = ConnectionHub::new();
        let a = Uuid::new_v4();
        let rx = hub.register(a);
        hub.join_room(1, a);
        hub.unregister(a);
        drop(rx);

        hub.broadcast(1, &msg(), None);
        hub.leave_room(1, a);
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.room_size(1), 0);
    }
}
