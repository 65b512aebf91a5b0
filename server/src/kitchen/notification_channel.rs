//! Registry of the live WebSocket connections of kitchen workers.
//!
//! Each connection is represented by the sending half of an unbounded channel. The receiving half
//! is drained by the WebSocket session task of the connection (see [crate::web::kitchen_socket]),
//! which forwards the events to the client.

use crate::data_store::UserId;
use dashmap::DashMap;
use log::{debug, info};
use roombook_api_types::KitchenServerEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub type ConnectionId = u64;

struct KitchenConnection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<KitchenServerEvent>,
}

/// Shared handle to the registry. Clones refer to the same set of connections.
///
/// A kitchen worker may have any number of connections (e.g. multiple browser tabs). Events are
/// delivered to all of them. Events for workers without any connection are dropped.
#[derive(Clone, Default)]
pub struct KitchenNotificationChannel {
    connections: Arc<DashMap<UserId, Vec<KitchenConnection>>>,
    next_connection_id: Arc<AtomicU64>,
}

impl KitchenNotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection of the kitchen worker `worker_id`. Returns an id for unregistering the
    /// connection later.
    pub fn register(
        &self,
        worker_id: UserId,
        sender: mpsc::UnboundedSender<KitchenServerEvent>,
    ) -> ConnectionId {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        self.connections
            .entry(worker_id)
            .or_default()
            .push(KitchenConnection { id, sender });
        info!("Kitchen worker {} connected (connection {}).", worker_id, id);
        id
    }

    /// Remove the connection from the registry, regardless of the worker it has been registered
    /// for. Workers without remaining connections are removed completely.
    pub fn unregister(&self, connection_id: ConnectionId) {
        self.connections.retain(|worker_id, connections| {
            let count_before = connections.len();
            connections.retain(|c| c.id != connection_id);
            if connections.len() != count_before {
                info!(
                    "Kitchen worker {} disconnected (connection {}).",
                    worker_id, connection_id
                );
            }
            !connections.is_empty()
        });
    }

    /// Send the event to all open connections of the kitchen worker.
    ///
    /// Returns the number of connections, the event has been handed to. Connections which have
    /// been closed in the meantime are skipped silently.
    pub fn notify(&self, worker_id: UserId, event: &KitchenServerEvent) -> usize {
        let Some(connections) = self.connections.get(&worker_id) else {
            debug!("Kitchen worker {} has no open connection.", worker_id);
            return 0;
        };
        connections
            .iter()
            .filter(|c| !c.sender.is_closed())
            .filter(|c| c.sender.send(event.clone()).is_ok())
            .count()
    }

    /// Check if the kitchen worker has at least one registered connection
    pub fn is_connected(&self, worker_id: UserId) -> bool {
        self.connections
            .get(&worker_id)
            .is_some_and(|connections| !connections.is_empty())
    }

    /// Drop all registered connections. Their session tasks will notice the closed channel and
    /// terminate.
    pub fn shutdown(&self) {
        let count: usize = self.connections.iter().map(|e| e.value().len()).sum();
        self.connections.clear();
        info!("Kitchen notification channel shut down, {} connections dropped.", count);
    }
}
