use spendgraph_core::model::UserId;
use std::collections::{HashMap, HashSet};

/// Undirected friendship graph stored as a symmetric adjacency map.
///
/// Every known user has an entry, isolated users map to an empty set.
#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    adjacency: HashMap<UserId, HashSet<UserId>>,
}

impl SocialGraph {
    pub fn new() -> Self {
        Self {
            adjacency: HashMap::new(),
        }
    }

    /// Register a user. Returns `true` if the user was not known before.
    pub fn add_vertex(&mut self, id: &UserId) -> bool {
        if self.adjacency.contains_key(id) {
            return false;
        }
        self.adjacency.insert(id.clone(), HashSet::new());
        true
    }

    /// Add the friendship `a <-> b`, registering both users.
    /// Self-loops and existing edges are no-ops. Returns whether an edge was added.
    pub fn add_edge(&mut self, a: &UserId, b: &UserId) -> bool {
        self.add_vertex(a);
        self.add_vertex(b);
        if a == b {
            return false;
        }

        let added = self
            .adjacency
            .get_mut(a)
            .map(|friends| friends.insert(b.clone()))
            .unwrap_or(false);
        if let Some(friends) = self.adjacency.get_mut(b) {
            friends.insert(a.clone());
        }
        added
    }

    /// Remove the friendship `a <-> b` if present. Users are never removed.
    pub fn remove_edge(&mut self, a: &UserId, b: &UserId) -> bool {
        let removed = self
            .adjacency
            .get_mut(a)
            .map(|friends| friends.remove(b))
            .unwrap_or(false);
        if let Some(friends) = self.adjacency.get_mut(b) {
            friends.remove(a);
        }
        removed
    }

    /// Direct friends of `id`; empty for unknown or isolated users.
    pub fn neighbors<'a>(&'a self, id: &UserId) -> impl Iterator<Item = &'a UserId> + 'a {
        self.adjacency.get(id).into_iter().flatten()
    }

    pub fn are_friends(&self, a: &UserId, b: &UserId) -> bool {
        self.adjacency
            .get(a)
            .map(|friends| friends.contains(b))
            .unwrap_or(false)
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.adjacency.contains_key(id)
    }

    pub fn is_new(&self, id: &UserId) -> bool {
        !self.contains(id)
    }

    pub fn degree(&self, id: &UserId) -> usize {
        self.adjacency.get(id).map(HashSet::len).unwrap_or(0)
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected friendships.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(HashSet::len).sum::<usize>() / 2
    }
}
