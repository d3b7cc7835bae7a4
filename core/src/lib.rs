//! # Weft Core
//!
//! Language-agnostic core library for the weft durable-execution worker.
//!
//! This crate defines the pieces of the workflow runtime that are independent
//! of any particular execution environment: the wire protocol spoken with the
//! orchestration service, and the determinism primitives that replayed
//! workflow code is allowed to observe.
//!
//! ## What's in Core vs Worker-Core
//!
//! **Core** contains:
//! - Activation, job, command, and completion messages plus their
//!   length-delimited codec
//! - Payload and failure wire types with JSON helpers
//! - The seeded `alea` PRNG used for replay-safe randomness
//! - Shared error types
//!
//! **Worker-Core** contains the deterministic runtime itself: the activation
//! dispatcher, sequence registry, condition unblocker, external-dependency
//! bridge, and the cooperative task scheduler.
//!
//! ## Modules
//!
//! - [`protocol`] - Wire messages and the delimited codec
//! - [`random`] - The `alea` deterministic PRNG
//! - [`error`] - Core error types

pub mod error;
pub mod protocol;
pub mod random;

// Re-export error types
pub use error::{CoreError, CoreResult};

// Re-export the PRNG
pub use random::Alea;

// Re-export the commonly used wire types
pub use protocol::{
    decode_activation, encode_completion, Failure, Payload, WorkflowActivation,
    WorkflowActivationCompletion, WorkflowActivationJob, WorkflowCommand,
};
