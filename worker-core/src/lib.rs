//! # Weft Worker Core
//!
//! The deterministic workflow execution runtime of the weft durable-execution
//! worker. A [`runtime::WorkflowRuntime`] hosts exactly one workflow run: the
//! host feeds it encoded activations, the runtime drives user workflow code
//! on a single-threaded cooperative scheduler, and every effect the workflow
//! produces leaves as a command inside an encoded completion.
//!
//! Determinism is the organizing principle. Workflow code never touches the
//! host clock, host RNG, or host I/O; it sees only the
//! [`workflow::WorkflowEnv`] capability handle, whose clock and randomness
//! are seeded from the activation stream and whose suspension points (timers,
//! activities, conditions, external-dependency calls) are correlated by
//! per-kind sequence numbers so that a replay of the same history reproduces
//! byte-identical command sequences.
//!
//! ## Modules
//!
//! - [`runtime`] - The runtime: activation dispatcher, sequence registry,
//!   command sink, condition unblocker, external-dependency bridge,
//!   interceptor chain, and the cooperative scheduler
//! - [`workflow`] - The surface workflow code programs against: environment
//!   handle, info record, failure types, and code modules

pub mod runtime;
pub mod workflow;

// Re-export the host-facing runtime surface
pub use runtime::dependencies::{
    ApplyMode, DependencyCall, DependencyResolution, PendingExternalCall, SyncHandler,
};
pub use runtime::interceptors::{
    ActivateNext, ConcludeNext, InboundInterceptor, InternalsInterceptor, OutboundInterceptor,
    WorkflowInterceptors,
};
pub use runtime::scheduler::TaskHook;
pub use runtime::sequences::SeqKind;
pub use runtime::{ActivationConclusion, ActivationResponse, WorkflowRuntime};

// Re-export the workflow-facing surface
pub use workflow::{
    FailureKind, ModuleLoader, WorkflowEnv, WorkflowFailure, WorkflowFunction, WorkflowInfo,
    WorkflowModule, MAIN_MODULE,
};

// Shared error types come from weft-core
pub use weft_core::{CoreError, CoreResult};
