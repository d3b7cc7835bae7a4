//! Shared fixtures for runtime integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use weft_core::protocol::codec::{decode_completion, encode_activation};
use weft_core::{CoreError, WorkflowActivation, WorkflowCommand};
use weft_worker_core::{
    ActivationConclusion, ActivationResponse, WorkflowInfo, WorkflowModule, WorkflowRuntime,
    MAIN_MODULE,
};

/// Build a runtime whose loader serves the given module factory at
/// [`MAIN_MODULE`] and rejects every other path.
pub fn make_runtime<F>(module: F) -> WorkflowRuntime
where
    F: Fn() -> WorkflowModule + 'static,
{
    let mut runtime = WorkflowRuntime::new();
    runtime.set_module_loader(Box::new(move |path| {
        if path == MAIN_MODULE {
            Ok(module())
        } else {
            Err(CoreError::type_mismatch(format!("unknown module '{path}'")))
        }
    }));
    runtime
}

/// Initialize against a fixed run identity at the epoch.
pub fn init(runtime: &mut WorkflowRuntime, workflow_type: &str, seed: &[u8]) {
    runtime
        .init_runtime(
            WorkflowInfo::new(workflow_type, "run-1", "wf-1"),
            &[],
            seed,
            DateTime::<Utc>::UNIX_EPOCH,
            None,
        )
        .unwrap();
}

/// Run a batch-0 activation through the encoded host path.
pub fn activate(runtime: &mut WorkflowRuntime, activation: WorkflowActivation) -> ActivationResponse {
    runtime
        .activate(&encode_activation(&activation), 0)
        .unwrap()
}

/// Conclude, expecting a completion, and return its decoded commands.
pub fn conclude_commands(runtime: &mut WorkflowRuntime) -> Vec<WorkflowCommand> {
    match runtime.conclude_activation().unwrap() {
        ActivationConclusion::Complete { encoded } => decode_completion(&encoded)
            .unwrap()
            .successful
            .unwrap()
            .commands,
        ActivationConclusion::Pending { .. } => panic!("expected a complete conclusion"),
    }
}

/// Variant names of a command list, for order assertions.
pub fn command_names(commands: &[WorkflowCommand]) -> Vec<&'static str> {
    commands
        .iter()
        .map(|c| c.variant.as_ref().expect("command variant set").name())
        .collect()
}
