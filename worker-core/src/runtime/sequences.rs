//! Per-kind sequence numbers and the pending-completion registry.
//!
//! Every asynchronous resource a workflow touches is correlated with the
//! orchestration service through a `(kind, seq)` pair. Sequence numbers are
//! strictly increasing per kind within a run and never reused; the stored
//! completion is a one-shot sender, so resolving it a second time is
//! unrepresentable.

use std::collections::HashMap;

use tokio::sync::oneshot;
use weft_core::{CoreError, CoreResult, Payload};

use crate::workflow::failure::WorkflowFailure;

/// Value delivered to a registered completion when its event arrives.
pub type CompletionValue = Result<Payload, WorkflowFailure>;

pub(crate) type CompletionSender = oneshot::Sender<CompletionValue>;

/// Resource kinds with independent sequence number spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqKind {
    Timer,
    Activity,
    ChildWorkflow,
    Signal,
    Dependency,
    CancelWorkflowExternal,
    SignalWorkflowExternal,
    Condition,
}

impl SeqKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timer => "timer",
            Self::Activity => "activity",
            Self::ChildWorkflow => "child_workflow",
            Self::Signal => "signal",
            Self::Dependency => "dependency",
            Self::CancelWorkflowExternal => "cancel_workflow_external",
            Self::SignalWorkflowExternal => "signal_workflow_external",
            Self::Condition => "condition",
        }
    }
}

#[derive(Default)]
pub(crate) struct SequenceRegistry {
    next: HashMap<SeqKind, u32>,
    completions: HashMap<(SeqKind, u32), CompletionSender>,
}

impl SequenceRegistry {
    /// Allocate the next sequence number for a kind.
    pub fn next(&mut self, kind: SeqKind) -> u32 {
        let counter = self.next.entry(kind).or_insert(0);
        let seq = *counter;
        *counter += 1;
        seq
    }

    /// Store the completion awaiting `(kind, seq)`.
    pub fn register(&mut self, kind: SeqKind, seq: u32, sender: CompletionSender) {
        self.completions.insert((kind, seq), sender);
    }

    /// Remove and return the completion for `(kind, seq)`. A missing entry
    /// means a protocol bug or a duplicate resolution.
    pub fn consume(&mut self, kind: SeqKind, seq: u32) -> CoreResult<CompletionSender> {
        self.completions.remove(&(kind, seq)).ok_or_else(|| {
            CoreError::illegal_state(format!(
                "no pending completion for {} sequence {}",
                kind.as_str(),
                seq
            ))
        })
    }

    /// Drop a completion without resolving it. Returns whether an entry was
    /// present. Used by timer cancellation, where the waiter is silently
    /// left suspended.
    pub fn discard(&mut self, kind: SeqKind, seq: u32) -> bool {
        self.completions.remove(&(kind, seq)).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.completions.len()
    }

    pub fn clear(&mut self) {
        self.completions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_start_at_zero_and_increment() {
        let mut registry = SequenceRegistry::default();
        assert_eq!(registry.next(SeqKind::Timer), 0);
        assert_eq!(registry.next(SeqKind::Timer), 1);
        assert_eq!(registry.next(SeqKind::Timer), 2);
    }

    #[test]
    fn test_sequence_counters_are_independent_per_kind() {
        let mut registry = SequenceRegistry::default();
        assert_eq!(registry.next(SeqKind::Timer), 0);
        assert_eq!(registry.next(SeqKind::Activity), 0);
        assert_eq!(registry.next(SeqKind::Timer), 1);
        assert_eq!(registry.next(SeqKind::Activity), 1);
        assert_eq!(registry.next(SeqKind::Condition), 0);
    }

    #[test]
    fn test_consume_returns_entry_exactly_once() {
        let mut registry = SequenceRegistry::default();
        let seq = registry.next(SeqKind::Activity);
        let (tx, _rx) = oneshot::channel();
        registry.register(SeqKind::Activity, seq, tx);

        assert!(registry.consume(SeqKind::Activity, seq).is_ok());
        let err = registry.consume(SeqKind::Activity, seq).unwrap_err();
        assert!(matches!(err, CoreError::IllegalState(_)));
    }

    #[test]
    fn test_consume_unknown_seq_is_illegal_state() {
        let mut registry = SequenceRegistry::default();
        let err = registry.consume(SeqKind::Timer, 42).unwrap_err();
        assert!(err.to_string().contains("timer sequence 42"));
    }

    #[test]
    fn test_discard_drops_without_resolving() {
        let mut registry = SequenceRegistry::default();
        let seq = registry.next(SeqKind::Timer);
        let (tx, mut rx) = oneshot::channel::<CompletionValue>();
        registry.register(SeqKind::Timer, seq, tx);

        assert!(registry.discard(SeqKind::Timer, seq));
        assert!(!registry.discard(SeqKind::Timer, seq));
        // the receiver observes a dropped sender, not a value
        assert!(rx.try_recv().is_err());
    }
}
