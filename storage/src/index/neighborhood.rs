use super::graph::SocialGraph;
use spendgraph_core::model::UserId;
use std::collections::{HashMap, HashSet, VecDeque};

/// Breadth-first expansion from `origin` up to `max_hops` levels.
///
/// Returns each reachable user (excluding `origin`) with its shortest hop
/// distance. Recomputed on every call so edge churn is always observed.
pub fn expand(graph: &SocialGraph, origin: &UserId, max_hops: usize) -> HashMap<UserId, usize> {
    let mut hops: HashMap<UserId, usize> = HashMap::new();
    if max_hops == 0 || !graph.contains(origin) {
        return hops;
    }

    let mut visited: HashSet<&UserId> = HashSet::new();
    visited.insert(origin);
    let mut frontier: VecDeque<(&UserId, usize)> = VecDeque::new();
    frontier.push_back((origin, 0));

    while let Some((current, depth)) = frontier.pop_front() {
        if depth == max_hops {
            continue;
        }
        for friend in graph.neighbors(current) {
            if visited.insert(friend) {
                hops.insert(friend.clone(), depth + 1);
                frontier.push_back((friend, depth + 1));
            }
        }
    }

    hops
}

/// Users within 1..=`max_hops` edges of `origin`, excluding `origin`.
pub fn within_distance(graph: &SocialGraph, origin: &UserId, max_hops: usize) -> HashSet<UserId> {
    expand(graph, origin, max_hops).into_keys().collect()
}
