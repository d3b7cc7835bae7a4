//! The surface workflow code programs against.
//!
//! Workflow functions receive a [`WorkflowEnv`] and an input payload and run
//! on the runtime's single-threaded scheduler. Everything observable through
//! the environment is deterministic under replay.

pub mod env;
pub mod failure;
pub mod module;

use serde::{Deserialize, Serialize};

pub use env::{
    ActivityFuture, CancellationFuture, ChildWorkflowFuture, ConditionFuture, ExternalCallFuture,
    SignalExternalFuture, SignalFuture, TimerFuture, WeakMap, WeakRef, WeakSet, WorkflowEnv,
};
pub use failure::{FailureKind, WorkflowFailure};
pub use module::{
    InterceptorFactory, ModuleLoader, WorkflowFunction, WorkflowFuture, WorkflowModule,
    MAIN_MODULE,
};

/// Identity record for a single workflow run.
///
/// Immutable for the lifetime of the run except `is_replaying`, which the
/// dispatcher refreshes from every activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub workflow_type: String,
    pub run_id: String,
    pub workflow_id: String,
    pub task_queue: String,
    pub namespace: String,
    pub is_replaying: bool,
}

impl WorkflowInfo {
    pub fn new(
        workflow_type: impl Into<String>,
        run_id: impl Into<String>,
        workflow_id: impl Into<String>,
    ) -> Self {
        Self {
            workflow_type: workflow_type.into(),
            run_id: run_id.into(),
            workflow_id: workflow_id.into(),
            task_queue: "default".to_string(),
            namespace: "default".to_string(),
            is_replaying: false,
        }
    }

    pub fn with_task_queue(mut self, task_queue: impl Into<String>) -> Self {
        self.task_queue = task_queue.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

impl Default for WorkflowInfo {
    fn default() -> Self {
        Self::new("", "", "")
    }
}
