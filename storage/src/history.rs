use spendgraph_core::model::{Amount, UserId};
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub user: UserId,
    pub amount: Amount,
    pub timestamp: String,
    /// Arrival order across all users; higher is more recent.
    pub sequence: u64,
}

/// Append-only purchase log, indexed by user.
#[derive(Debug, Clone, Default)]
pub struct PurchaseHistory {
    by_user: HashMap<UserId, VecDeque<PurchaseRecord>>,
    next_sequence: u64,
    retention: Option<usize>,
}

impl PurchaseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `per_user` records for each user.
    ///
    /// With `per_user >= T`, `recent_across_set(_, T)` is unchanged: every
    /// record in the joint top-T is also within its own user's top-T.
    pub fn with_retention(per_user: usize) -> Self {
        Self {
            retention: Some(per_user),
            ..Self::default()
        }
    }

    pub fn record(&mut self, user: &UserId, amount: Amount, timestamp: impl Into<String>) -> PurchaseRecord {
        let record = PurchaseRecord {
            user: user.clone(),
            amount,
            timestamp: timestamp.into(),
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;

        let entries = self.by_user.entry(user.clone()).or_default();
        entries.push_back(record.clone());
        if let Some(cap) = self.retention {
            while entries.len() > cap {
                entries.pop_front();
            }
        }
        record
    }

    /// Up to `limit` most recent records of a single user, newest first.
    pub fn recent(&self, user: &UserId, limit: usize) -> Vec<&PurchaseRecord> {
        self.by_user
            .get(user)
            .map(|entries| entries.iter().rev().take(limit).collect())
            .unwrap_or_default()
    }

    /// Up to `limit` most recent records across all of `users`, newest first.
    ///
    /// The users' histories are merged jointly by arrival order before the
    /// window is applied.
    pub fn recent_across_set(&self, users: &HashSet<UserId>, limit: usize) -> Vec<&PurchaseRecord> {
        if limit == 0 {
            return Vec::new();
        }

        let histories: Vec<&VecDeque<PurchaseRecord>> = users
            .iter()
            .filter_map(|user| self.by_user.get(user))
            .filter(|entries| !entries.is_empty())
            .collect();

        // Max-heap of (sequence, history slot, index of that history's next candidate).
        let mut heap: BinaryHeap<(u64, usize, usize)> = histories
            .iter()
            .enumerate()
            .filter_map(|(slot, entries)| {
                entries
                    .back()
                    .map(|newest| (newest.sequence, slot, entries.len() - 1))
            })
            .collect();

        let total: usize = histories.iter().map(|entries| entries.len()).sum();
        let mut out = Vec::with_capacity(limit.min(total));
        while out.len() < limit {
            let Some((_, slot, index)) = heap.pop() else {
                break;
            };
            let entries = histories[slot];
            out.push(&entries[index]);
            if index > 0 {
                heap.push((entries[index - 1].sequence, slot, index - 1));
            }
        }
        out
    }

    pub fn purchases_of(&self, user: &UserId) -> usize {
        self.by_user.get(user).map(VecDeque::len).unwrap_or(0)
    }

    /// Total records currently held.
    pub fn len(&self) -> usize {
        self.by_user.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
