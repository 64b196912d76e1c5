use crate::models::Quote;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

pub type ConnectionId = Uuid;

struct Connection {
    symbols: HashSet<String>,
    tx: mpsc::UnboundedSender<Vec<Quote>>,
}

/// Tracks which connection wants which symbols and fans published batches
/// out to the interested ones. The only mutable state shared between the
/// broadcaster and the WebSocket tasks.
#[derive(Default)]
pub struct SubscriptionRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection with an empty symbol set. Called on WebSocket
    /// connect, before any subscribe message arrives.
    pub async fn register(&self, id: ConnectionId, tx: mpsc::UnboundedSender<Vec<Quote>>) {
        let mut connections = self.connections.write().await;
        connections.insert(
            id,
            Connection {
                symbols: HashSet::new(),
                tx,
            },
        );
        tracing::info!("connection {} registered, total {}", id, connections.len());
    }

    /// Replace the connection's symbol set. Last call wins; sets are never
    /// unioned across calls.
    pub async fn subscribe(&self, id: ConnectionId, symbols: Vec<String>) {
        let mut connections = self.connections.write().await;
        match connections.get_mut(&id) {
            Some(conn) => {
                conn.symbols = symbols.into_iter().map(|s| s.to_uppercase()).collect();
                tracing::debug!("connection {} subscribed to {:?}", id, conn.symbols);
            }
            // Subscribe racing a disconnect. Nothing to do.
            None => tracing::warn!("subscribe from unknown connection {}", id),
        }
    }

    pub async fn unregister(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if connections.remove(&id).is_some() {
            tracing::info!("connection {} removed, total {}", id, connections.len());
        }
    }

    /// Deliver the batch to every connection whose symbol set intersects it.
    /// Connections whose receiver is already gone are pruned. Returns the
    /// number of connections that got an event.
    pub async fn publish(&self, batch: &[Quote]) -> usize {
        let mut delivered = 0;
        let mut stale = Vec::new();
        {
            let connections = self.connections.read().await;
            for (id, conn) in connections.iter() {
                let filtered: Vec<Quote> = batch
                    .iter()
                    .filter(|q| conn.symbols.contains(&q.symbol))
                    .cloned()
                    .collect();
                if filtered.is_empty() {
                    continue;
                }
                if conn.tx.send(filtered).is_ok() {
                    delivered += 1;
                } else {
                    stale.push(*id);
                }
            }
        }

        if !stale.is_empty() {
            let mut connections = self.connections.write().await;
            for id in stale {
                if connections.remove(&id).is_some() {
                    tracing::debug!("pruned dead connection {}", id);
                }
            }
        }
        delivered
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
