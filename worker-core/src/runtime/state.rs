//! Mutable state of a single workflow run.
//!
//! One `RuntimeState` exists per sandboxed run. The runtime owns it behind
//! an `Rc<RefCell<..>>` shared with every [`crate::workflow::WorkflowEnv`]
//! handle; all access happens on the scheduler thread.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use weft_core::{Alea, Payload, WorkflowCommand};

use crate::runtime::commands::CommandSink;
use crate::runtime::conditions::BlockedConditions;
use crate::runtime::dependencies::DependencyRegistry;
use crate::runtime::sequences::SequenceRegistry;
use crate::workflow::failure::WorkflowFailure;
use crate::workflow::WorkflowInfo;

pub(crate) type SignalHandler = Rc<dyn Fn(Payload)>;
pub(crate) type QueryHandler = Rc<dyn Fn(Payload) -> Result<Payload, WorkflowFailure>>;

pub(crate) struct RuntimeState {
    pub initialized: bool,
    pub info: WorkflowInfo,
    pub now: DateTime<Utc>,
    pub random: Alea,
    pub commands: CommandSink,
    pub sequences: SequenceRegistry,
    pub conditions: BlockedConditions,
    pub dependencies: DependencyRegistry,
    pub completed: bool,
    pub cancellation_requested: bool,
    pub cancellation_waiters: Vec<oneshot::Sender<()>>,
    pub signal_handlers: HashMap<String, SignalHandler>,
    /// Signal waiters by name, oldest first; values are `Signal` sequences
    /// registered in the completion registry.
    pub signal_waiters: HashMap<String, VecDeque<u32>>,
    pub buffered_signals: HashMap<String, VecDeque<Payload>>,
    pub query_handlers: HashMap<String, QueryHandler>,
    pub notified_patches: HashSet<String>,
    pub globals_installed: bool,
}

impl RuntimeState {
    pub fn new() -> Self {
        Self {
            initialized: false,
            info: WorkflowInfo::default(),
            now: DateTime::<Utc>::UNIX_EPOCH,
            random: Alea::from_seed(&[]),
            commands: CommandSink::default(),
            sequences: SequenceRegistry::default(),
            conditions: BlockedConditions::default(),
            dependencies: DependencyRegistry::default(),
            completed: false,
            cancellation_requested: false,
            cancellation_waiters: Vec::new(),
            signal_handlers: HashMap::new(),
            signal_waiters: HashMap::new(),
            buffered_signals: HashMap::new(),
            query_handlers: HashMap::new(),
            notified_patches: HashSet::new(),
            globals_installed: false,
        }
    }

    /// Record the workflow's result and mark the run complete. A run that
    /// already completed (e.g. via continue-as-new) keeps its first outcome.
    pub fn record_workflow_completion(&mut self, result: Payload) {
        if self.completed {
            return;
        }
        tracing::debug!(run_id = %self.info.run_id, "workflow completed");
        self.commands
            .push(WorkflowCommand::complete_workflow(Some(result)));
        self.completed = true;
    }

    /// Record a terminal failure command and mark the run complete.
    pub fn record_workflow_failure(&mut self, failure: WorkflowFailure) {
        if self.completed {
            return;
        }
        tracing::warn!(
            run_id = %self.info.run_id,
            failure_type = %failure.failure_type,
            message = %failure.message,
            "workflow failed"
        );
        self.commands
            .push(WorkflowCommand::fail_workflow(failure.to_proto()));
        self.completed = true;
    }
}
