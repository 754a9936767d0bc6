//! # Client Connection Management
//!
//! The tick thread's view of connected sockets. Each connection owns the
//! sending half of its socket task's outbound queue; the tick thread never
//! awaits on it, so a slow client cannot stall a tick.

use std::collections::BTreeMap;

use frontier_shared::ClientId;
use tokio::sync::mpsc::UnboundedSender;

use crate::protocol::OutboundFrame;

/// Identifier the transport assigns to each accepted socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u32);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Where a connection is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket open, no join yet.
    #[default]
    Connected,
    /// Joined the game; receives turns.
    Joined,
    /// Outbound queue closed; pending cleanup.
    Closed,
}

/// One connected socket.
#[derive(Debug)]
pub struct ClientConnection {
    /// Connection id.
    pub id: ConnectionId,
    /// Lifecycle state.
    pub state: ConnectionState,
    /// Client bound by the join message.
    pub client_id: Option<ClientId>,
    /// Tick of the last snapshot sent.
    pub last_snapshot_tick: Option<u64>,
    /// Frames queued so far.
    pub frames_sent: u64,
    outbound: UnboundedSender<OutboundFrame>,
}

impl ClientConnection {
    /// A freshly accepted socket.
    #[must_use]
    pub const fn new(id: ConnectionId, outbound: UnboundedSender<OutboundFrame>) -> Self {
        Self {
            id,
            state: ConnectionState::Connected,
            client_id: None,
            last_snapshot_tick: None,
            frames_sent: 0,
            outbound,
        }
    }

    /// Whether this connection receives turns.
    #[inline]
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.state == ConnectionState::Joined
    }

    /// Whether `client` is the client joined on this connection.
    #[must_use]
    pub fn is_bound_to(&self, client: &ClientId) -> bool {
        self.is_joined() && self.client_id.as_ref() == Some(client)
    }

    /// Queues a frame. Returns `false` and marks the connection closed if the
    /// socket task is gone.
    pub fn send(&mut self, frame: OutboundFrame) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }
        if self.outbound.send(frame).is_err() {
            self.state = ConnectionState::Closed;
            return false;
        }
        self.frames_sent += 1;
        true
    }
}

/// All live connections, iterated in id order.
#[derive(Debug)]
pub struct Connections {
    max: usize,
    slots: BTreeMap<ConnectionId, ClientConnection>,
}

impl Connections {
    /// Registry holding at most `max` connections.
    #[must_use]
    pub const fn new(max: usize) -> Self {
        Self {
            max,
            slots: BTreeMap::new(),
        }
    }

    /// Registers a connection. Returns it back if the registry is full or the
    /// id is taken.
    pub fn add(&mut self, connection: ClientConnection) -> Result<(), ClientConnection> {
        if self.slots.len() >= self.max || self.slots.contains_key(&connection.id) {
            return Err(connection);
        }
        self.slots.insert(connection.id, connection);
        Ok(())
    }

    /// Forgets a connection.
    pub fn remove(&mut self, id: ConnectionId) -> Option<ClientConnection> {
        self.slots.remove(&id)
    }

    /// Connection by id.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<&ClientConnection> {
        self.slots.get(&id)
    }

    /// Connection by id, mutably.
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut ClientConnection> {
        self.slots.get_mut(&id)
    }

    /// Number of connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if nobody is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of joined connections.
    #[must_use]
    pub fn joined(&self) -> usize {
        self.slots.values().filter(|c| c.is_joined()).count()
    }

    /// Sends one frame to every joined connection; returns how many took it.
    pub fn broadcast(&mut self, frame: &OutboundFrame) -> usize {
        self.slots
            .values_mut()
            .filter(|c| c.is_joined())
            .map(|c| c.send(frame.clone()))
            .filter(|&sent| sent)
            .count()
    }

    /// Drops connections whose socket task has gone away.
    pub fn sweep_closed(&mut self) -> Vec<ConnectionId> {
        let closed: Vec<ConnectionId> = self
            .slots
            .values()
            .filter(|c| c.state == ConnectionState::Closed)
            .map(|c| c.id)
            .collect();
        for id in &closed {
            self.slots.remove(id);
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_capacity_enforced() {
        let mut conns = Connections::new(1);
        let (tx, _rx) = unbounded_channel();
        assert!(conns.add(ClientConnection::new(ConnectionId(1), tx.clone())).is_ok());
        assert!(conns.add(ClientConnection::new(ConnectionId(2), tx)).is_err());
        assert_eq!(conns.len(), 1);
    }

    #[test]
    fn test_broadcast_reaches_joined_only() {
        let mut conns = Connections::new(4);
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        conns.add(ClientConnection::new(ConnectionId(1), tx1)).unwrap();
        conns.add(ClientConnection::new(ConnectionId(2), tx2)).unwrap();
        conns.get_mut(ConnectionId(1)).unwrap().state = ConnectionState::Joined;

        let sent = conns.broadcast(&OutboundFrame::Text("x".into()));
        assert_eq!(sent, 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_dead_socket_swept() {
        let mut conns = Connections::new(4);
        let (tx, rx) = unbounded_channel();
        conns.add(ClientConnection::new(ConnectionId(7), tx)).unwrap();
        conns.get_mut(ConnectionId(7)).unwrap().state = ConnectionState::Joined;
        drop(rx);
        assert_eq!(conns.broadcast(&OutboundFrame::Text("x".into())), 0);
        assert_eq!(conns.sweep_closed(), vec![ConnectionId(7)]);
        assert!(conns.is_empty());
    }
}
