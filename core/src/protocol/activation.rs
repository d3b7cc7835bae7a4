//! Inbound activation messages.
//!
//! An activation is the unit of work the orchestration service hands to the
//! runtime: a timestamp, the replay flag, and an ordered list of jobs. Each
//! job sets exactly one variant; a job with no variant set is malformed.

use crate::protocol::common::{Failure, Payload};

/// A workflow activation delivered by the host.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WorkflowActivation {
    #[prost(string, tag = "1")]
    pub run_id: String,
    /// Wall clock observed by the orchestration service. Absent on
    /// query-only activations, which must not advance workflow time.
    #[prost(int64, optional, tag = "2")]
    pub timestamp_ms: Option<i64>,
    #[prost(bool, tag = "3")]
    pub is_replaying: bool,
    #[prost(message, repeated, tag = "4")]
    pub jobs: Vec<WorkflowActivationJob>,
}

/// A single job inside an activation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WorkflowActivationJob {
    #[prost(
        oneof = "workflow_activation_job::Variant",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11"
    )]
    pub variant: Option<workflow_activation_job::Variant>,
}

pub mod workflow_activation_job {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "1")]
        StartWorkflow(super::StartWorkflow),
        #[prost(message, tag = "2")]
        FireTimer(super::FireTimer),
        #[prost(message, tag = "3")]
        ResolveActivity(super::ResolveActivity),
        #[prost(message, tag = "4")]
        ResolveChildWorkflowExecution(super::ResolveChildWorkflowExecution),
        #[prost(message, tag = "5")]
        SignalWorkflow(super::SignalWorkflow),
        #[prost(message, tag = "6")]
        QueryWorkflow(super::QueryWorkflow),
        #[prost(message, tag = "7")]
        NotifyHasPatch(super::NotifyHasPatch),
        #[prost(message, tag = "8")]
        CancelWorkflow(super::CancelWorkflow),
        #[prost(message, tag = "9")]
        RemoveFromCache(super::RemoveFromCache),
        #[prost(message, tag = "10")]
        ResolveSignalExternalWorkflow(super::ResolveSignalExternalWorkflow),
        #[prost(message, tag = "11")]
        ResolveRequestCancelExternalWorkflow(super::ResolveRequestCancelExternalWorkflow),
    }

    impl Variant {
        /// Stable name of the variant, used in logs and error messages.
        pub fn name(&self) -> &'static str {
            match self {
                Self::StartWorkflow(_) => "start_workflow",
                Self::FireTimer(_) => "fire_timer",
                Self::ResolveActivity(_) => "resolve_activity",
                Self::ResolveChildWorkflowExecution(_) => "resolve_child_workflow_execution",
                Self::SignalWorkflow(_) => "signal_workflow",
                Self::QueryWorkflow(_) => "query_workflow",
                Self::NotifyHasPatch(_) => "notify_has_patch",
                Self::CancelWorkflow(_) => "cancel_workflow",
                Self::RemoveFromCache(_) => "remove_from_cache",
                Self::ResolveSignalExternalWorkflow(_) => "resolve_signal_external_workflow",
                Self::ResolveRequestCancelExternalWorkflow(_) => {
                    "resolve_request_cancel_external_workflow"
                }
            }
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartWorkflow {
    #[prost(string, tag = "1")]
    pub workflow_type: String,
    #[prost(string, tag = "2")]
    pub workflow_id: String,
    #[prost(message, optional, tag = "3")]
    pub input: Option<Payload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FireTimer {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResolveActivity {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
    #[prost(message, optional, tag = "2")]
    pub result: Option<ActivityResolution>,
}

/// Terminal status of an activity, delivered back to the awaiting workflow.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActivityResolution {
    #[prost(oneof = "activity_resolution::Status", tags = "1, 2, 3")]
    pub status: Option<activity_resolution::Status>,
}

pub mod activity_resolution {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Status {
        #[prost(message, tag = "1")]
        Completed(super::Payload),
        #[prost(message, tag = "2")]
        Failed(super::Failure),
        #[prost(message, tag = "3")]
        Cancelled(super::Failure),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResolveChildWorkflowExecution {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
    #[prost(message, optional, tag = "2")]
    pub result: Option<ChildWorkflowResolution>,
}

/// Terminal status of a child workflow execution.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChildWorkflowResolution {
    #[prost(oneof = "child_workflow_resolution::Status", tags = "1, 2, 3")]
    pub status: Option<child_workflow_resolution::Status>,
}

pub mod child_workflow_resolution {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Status {
        #[prost(message, tag = "1")]
        Completed(super::Payload),
        #[prost(message, tag = "2")]
        Failed(super::Failure),
        #[prost(message, tag = "3")]
        Cancelled(super::Failure),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignalWorkflow {
    #[prost(string, tag = "1")]
    pub signal_name: String,
    #[prost(message, optional, tag = "2")]
    pub input: Option<Payload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryWorkflow {
    #[prost(string, tag = "1")]
    pub query_id: String,
    #[prost(string, tag = "2")]
    pub query_type: String,
    #[prost(message, optional, tag = "3")]
    pub arguments: Option<Payload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotifyHasPatch {
    #[prost(string, tag = "1")]
    pub patch_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CancelWorkflow {
    #[prost(string, tag = "1")]
    pub reason: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoveFromCache {
    #[prost(string, tag = "1")]
    pub message: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResolveSignalExternalWorkflow {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
    /// Absent on success.
    #[prost(message, optional, tag = "2")]
    pub failure: Option<Failure>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResolveRequestCancelExternalWorkflow {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
    /// Absent on success.
    #[prost(message, optional, tag = "2")]
    pub failure: Option<Failure>,
}

// Constructors used by hosts and tests to assemble activations without
// spelling out the oneof plumbing.
impl WorkflowActivationJob {
    pub fn start_workflow(
        workflow_type: impl Into<String>,
        workflow_id: impl Into<String>,
        input: Option<Payload>,
    ) -> Self {
        Self {
            variant: Some(workflow_activation_job::Variant::StartWorkflow(
                StartWorkflow {
                    workflow_type: workflow_type.into(),
                    workflow_id: workflow_id.into(),
                    input,
                },
            )),
        }
    }

    pub fn fire_timer(seq: u32) -> Self {
        Self {
            variant: Some(workflow_activation_job::Variant::FireTimer(FireTimer {
                seq,
            })),
        }
    }

    pub fn resolve_activity(seq: u32, status: activity_resolution::Status) -> Self {
        Self {
            variant: Some(workflow_activation_job::Variant::ResolveActivity(
                ResolveActivity {
                    seq,
                    result: Some(ActivityResolution {
                        status: Some(status),
                    }),
                },
            )),
        }
    }

    pub fn resolve_child_workflow(seq: u32, status: child_workflow_resolution::Status) -> Self {
        Self {
            variant: Some(
                workflow_activation_job::Variant::ResolveChildWorkflowExecution(
                    ResolveChildWorkflowExecution {
                        seq,
                        result: Some(ChildWorkflowResolution {
                            status: Some(status),
                        }),
                    },
                ),
            ),
        }
    }

    pub fn signal(signal_name: impl Into<String>, input: Option<Payload>) -> Self {
        Self {
            variant: Some(workflow_activation_job::Variant::SignalWorkflow(
                SignalWorkflow {
                    signal_name: signal_name.into(),
                    input,
                },
            )),
        }
    }

    pub fn query(
        query_id: impl Into<String>,
        query_type: impl Into<String>,
        arguments: Option<Payload>,
    ) -> Self {
        Self {
            variant: Some(workflow_activation_job::Variant::QueryWorkflow(
                QueryWorkflow {
                    query_id: query_id.into(),
                    query_type: query_type.into(),
                    arguments,
                },
            )),
        }
    }

    pub fn notify_has_patch(patch_id: impl Into<String>) -> Self {
        Self {
            variant: Some(workflow_activation_job::Variant::NotifyHasPatch(
                NotifyHasPatch {
                    patch_id: patch_id.into(),
                },
            )),
        }
    }

    pub fn cancel_workflow(reason: impl Into<String>) -> Self {
        Self {
            variant: Some(workflow_activation_job::Variant::CancelWorkflow(
                CancelWorkflow {
                    reason: reason.into(),
                },
            )),
        }
    }

    pub fn remove_from_cache(message: impl Into<String>) -> Self {
        Self {
            variant: Some(workflow_activation_job::Variant::RemoveFromCache(
                RemoveFromCache {
                    message: message.into(),
                },
            )),
        }
    }

    pub fn resolve_signal_external_workflow(seq: u32, failure: Option<Failure>) -> Self {
        Self {
            variant: Some(
                workflow_activation_job::Variant::ResolveSignalExternalWorkflow(
                    ResolveSignalExternalWorkflow { seq, failure },
                ),
            ),
        }
    }

    pub fn resolve_request_cancel_external_workflow(seq: u32, failure: Option<Failure>) -> Self {
        Self {
            variant: Some(
                workflow_activation_job::Variant::ResolveRequestCancelExternalWorkflow(
                    ResolveRequestCancelExternalWorkflow { seq, failure },
                ),
            ),
        }
    }
}

impl WorkflowActivation {
    /// Assemble an activation with a timestamp (the common case).
    pub fn new(
        run_id: impl Into<String>,
        timestamp_ms: i64,
        jobs: Vec<WorkflowActivationJob>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            timestamp_ms: Some(timestamp_ms),
            is_replaying: false,
            jobs,
        }
    }

    /// Assemble a query-only activation, which carries no timestamp.
    pub fn query_only(run_id: impl Into<String>, jobs: Vec<WorkflowActivationJob>) -> Self {
        Self {
            run_id: run_id.into(),
            timestamp_ms: None,
            is_replaying: false,
            jobs,
        }
    }

    pub fn with_replaying(mut self, is_replaying: bool) -> Self {
        self.is_replaying = is_replaying;
        self
    }
}
