// src/core/hub/connection.rs

//! A registered connection's identity and outbound send queue (spec
//! §4.13).

use super::message::Envelope;
use tokio::sync::mpsc;

/// Per-connection identifying info carried alongside the send queue.
/// `BroadcastFiltered`'s predicate is evaluated against this.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub user: String,
}

/// A registered connection: its id, identity, and a bounded outbound
/// queue. Enqueues are non-blocking; a full or closed queue drops the
/// message rather than applying backpressure to the sender (spec §4.13).
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub conn_id: String,
    pub client_info: ClientInfo,
    sender: mpsc::Sender<Envelope>,
}

impl ConnectionHandle {
    pub fn new(conn_id: impl Into<String>, user: impl Into<String>, sender: mpsc::Sender<Envelope>) -> Self {
        Self {
            conn_id: conn_id.into(),
            client_info: ClientInfo { user: user.into() },
            sender,
        }
    }

    /// Non-blocking enqueue. Returns `false` if the queue was full or the
    /// receiving end has been dropped.
    pub fn try_send(&self, message: Envelope) -> bool {
        self.sender.try_send(message).is_ok()
    }
}
