// src/core/hub/hub.rs

//! Connection registry and message fan-out (spec §4.13). Grounded on the
//! teacher's `core::pubsub::PubSubManager`: a `DashMap` registry consulted
//! under no single global lock, with non-blocking per-destination sends.

use super::connection::{ClientInfo, ConnectionHandle};
use super::message::Envelope;
use crate::core::metrics;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::warn;

/// An inbound message paired with the connection and identity it arrived
/// on, as delivered to the host server via `Hub::recv_message` (spec
/// §4.13 "Messages()").
#[derive(Debug, Clone)]
pub struct ClientMessage {
    pub conn_id: String,
    pub client_info: ClientInfo,
    pub message: Envelope,
}

/// The websocket connection registry (spec §4.13). `register`/`unregister`
/// are idempotent; `send_message` and `broadcast_filtered` are
/// non-blocking and drop on a full or closed queue.
pub struct Hub {
    connections: DashMap<String, ConnectionHandle>,
    inbound_tx: mpsc::Sender<ClientMessage>,
    inbound_rx: Mutex<mpsc::Receiver<ClientMessage>>,
}

impl Hub {
    pub fn new(inbound_buffer: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(inbound_buffer);
        Self {
            connections: DashMap::new(),
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
        }
    }

    /// Registers a connection, replacing any prior registration under the
    /// same id.
    pub fn register(&self, handle: ConnectionHandle) {
        self.connections.insert(handle.conn_id.clone(), handle);
    }

    /// Unregisters a connection. A no-op if the id is already absent.
    pub fn unregister(&self, conn_id: &str) {
        self.connections.remove(conn_id);
    }

    pub fn is_registered(&self, conn_id: &str) -> bool {
        self.connections.contains_key(conn_id)
    }

    /// Non-blocking enqueue to one connection. Drops with a warning if the
    /// queue is full or closed (spec §4.13).
    pub fn send_message(&self, conn_id: &str, message: Envelope) -> bool {
        let delivered = match self.connections.get(conn_id) {
            Some(handle) => handle.try_send(message),
            None => false,
        };
        if delivered {
            metrics::hub_sent();
        } else {
            warn!(conn_id, "dropping hub message: queue full, closed, or unknown connection");
            metrics::hub_dropped();
        }
        delivered
    }

    /// Evaluates `predicate` against every connected client and enqueues
    /// `message` to those that accept (spec §4.13). `predicate` receives
    /// the full connection handle (id and client info) so callers can
    /// exclude the sender by connection as well as filter on identity.
    /// Returns the number of connections the message was enqueued to.
    pub fn broadcast_filtered<P>(&self, message: &Envelope, predicate: P) -> usize
    where
        P: Fn(&ConnectionHandle) -> bool,
    {
        let mut delivered = 0;
        for entry in self.connections.iter() {
            if !predicate(&entry) {
                continue;
            }
            if entry.try_send(message.clone()) {
                delivered += 1;
                metrics::hub_sent();
            } else {
                warn!(conn_id = %entry.conn_id, "dropping broadcast message: queue full or closed");
                metrics::hub_dropped();
            }
        }
        delivered
    }

    /// Delivers an inbound message from a connection's read loop into the
    /// hub's inbound stream.
    pub async fn push_inbound(&self, message: ClientMessage) {
        let _ = self.inbound_tx.send(message).await;
    }

    /// Reads the next inbound message (spec §4.13 "Messages()").
    pub async fn recv_message(&self) -> Option<ClientMessage> {
        self.inbound_rx.lock().await.recv().await
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Main loop: waits for cancellation, then drains registered
    /// connections (spec §4.13/§5).
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let _ = shutdown_rx.recv().await;
        self.shutdown();
    }

    /// Drains and stops: clears the connection registry, closing each
    /// connection's send queue as its handle is dropped.
    pub fn shutdown(&self) {
        self.connections.clear();
    }
}
