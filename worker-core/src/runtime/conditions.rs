//! Blocked workflow conditions and the fixed-point unblocker.

use std::collections::BTreeMap;

use tokio::sync::oneshot;

pub(crate) type ConditionPredicate = Box<dyn Fn() -> bool>;

struct BlockedCondition {
    predicate: ConditionPredicate,
    sender: oneshot::Sender<()>,
}

/// Suspended predicates keyed by condition sequence. Iteration order is the
/// key order, and entries may be removed mid-pass, which is what allows the
/// unblocker to delete while it walks.
#[derive(Default)]
pub(crate) struct BlockedConditions {
    entries: BTreeMap<u32, BlockedCondition>,
}

impl BlockedConditions {
    pub fn insert(&mut self, seq: u32, predicate: ConditionPredicate, sender: oneshot::Sender<()>) {
        self.entries.insert(seq, BlockedCondition { predicate, sender });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evaluate every blocked predicate to a fixed point: resolving one
    /// condition may make another true, so passes repeat until a full pass
    /// makes no progress. Returns the total number unblocked.
    pub fn try_unblock(&mut self) -> usize {
        let mut unblocked = 0;
        loop {
            let ready: Vec<u32> = self
                .entries
                .iter()
                .filter(|(_, condition)| (condition.predicate)())
                .map(|(seq, _)| *seq)
                .collect();
            if ready.is_empty() {
                break;
            }
            for seq in ready {
                if let Some(condition) = self.entries.remove(&seq) {
                    tracing::trace!(seq, "condition unblocked");
                    let _ = condition.sender.send(());
                    unblocked += 1;
                }
            }
        }
        unblocked
    }
}
