use crate::history::{PurchaseHistory, PurchaseRecord};
use crate::index::{within_distance, SocialGraph};
use spendgraph_core::model::{FriendshipEvent, PurchaseEvent, UserId};
use std::collections::HashSet;
use tracing::debug;

/// Friendship graph and purchase history, mutated together in arrival order.
#[derive(Debug, Clone, Default)]
pub struct SocialNetwork {
    graph: SocialGraph,
    history: PurchaseHistory,
}

impl SocialNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: PurchaseHistory) -> Self {
        Self {
            graph: SocialGraph::new(),
            history,
        }
    }

    pub fn graph(&self) -> &SocialGraph {
        &self.graph
    }

    pub fn history(&self) -> &PurchaseHistory {
        &self.history
    }

    pub fn befriend(&mut self, event: &FriendshipEvent) -> bool {
        let added = self.graph.add_edge(&event.id1, &event.id2);
        debug!(id1 = %event.id1, id2 = %event.id2, added, "befriend");
        added
    }

    pub fn unfriend(&mut self, event: &FriendshipEvent) -> bool {
        // Unknown users still become vertices, like any other mention.
        self.graph.add_vertex(&event.id1);
        self.graph.add_vertex(&event.id2);
        let removed = self.graph.remove_edge(&event.id1, &event.id2);
        debug!(id1 = %event.id1, id2 = %event.id2, removed, "unfriend");
        removed
    }

    /// Append a purchase to the buyer's history, registering the buyer.
    pub fn record_purchase(&mut self, purchase: &PurchaseEvent) -> PurchaseRecord {
        self.graph.add_vertex(&purchase.id);
        self.history
            .record(&purchase.id, purchase.amount.clone(), purchase.timestamp.clone())
    }

    /// Users within `degree` hops of `user`, excluding `user`.
    pub fn network_of(&self, user: &UserId, degree: usize) -> HashSet<UserId> {
        within_distance(&self.graph, user, degree)
    }

    /// The `limit` most recent purchases made inside `user`'s network.
    pub fn recent_in_network(&self, user: &UserId, degree: usize, limit: usize) -> Vec<&PurchaseRecord> {
        let network = self.network_of(user, degree);
        self.history.recent_across_set(&network, limit)
    }
}
