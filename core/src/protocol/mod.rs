//! Wire protocol spoken with the orchestration service.
//!
//! Activations flow in, completions flow out, both framed as length-delimited
//! protobuf messages. The message set here is a hand-maintained mirror of the
//! service ABI: this crate carries no transport, so the definitions are kept
//! as plain `prost` derives instead of build-time generated code.

pub mod activation;
pub mod codec;
pub mod command;
pub mod common;

pub use activation::{
    workflow_activation_job, ActivityResolution, ChildWorkflowResolution, WorkflowActivation,
    WorkflowActivationJob,
};
pub use codec::{decode_activation, decode_completion, encode_activation, encode_completion};
pub use command::{
    workflow_command, Success, WorkflowActivationCompletion, WorkflowCommand,
};
pub use common::{Failure, Payload};
