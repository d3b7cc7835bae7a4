//! Outbound command and completion messages.
//!
//! Commands are workflow-originated directives accumulated during an
//! activation and flushed atomically inside a completion when the activation
//! concludes.

use crate::protocol::common::{Failure, Payload};

/// A single command emitted by workflow code.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WorkflowCommand {
    #[prost(
        oneof = "workflow_command::Variant",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11"
    )]
    pub variant: Option<workflow_command::Variant>,
}

pub mod workflow_command {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "1")]
        StartTimer(super::StartTimer),
        #[prost(message, tag = "2")]
        CancelTimer(super::CancelTimer),
        #[prost(message, tag = "3")]
        ScheduleActivity(super::ScheduleActivity),
        #[prost(message, tag = "4")]
        RequestCancelActivity(super::RequestCancelActivity),
        #[prost(message, tag = "5")]
        StartChildWorkflowExecution(super::StartChildWorkflowExecution),
        #[prost(message, tag = "6")]
        SignalExternalWorkflowExecution(super::SignalExternalWorkflowExecution),
        #[prost(message, tag = "7")]
        RequestCancelExternalWorkflowExecution(super::RequestCancelExternalWorkflowExecution),
        #[prost(message, tag = "8")]
        CompleteWorkflowExecution(super::CompleteWorkflowExecution),
        #[prost(message, tag = "9")]
        FailWorkflowExecution(super::FailWorkflowExecution),
        #[prost(message, tag = "10")]
        ContinueAsNewWorkflowExecution(super::ContinueAsNewWorkflowExecution),
        #[prost(message, tag = "11")]
        RespondToQuery(super::QueryResult),
    }

    impl Variant {
        /// Stable name of the variant, used in logs and error messages.
        pub fn name(&self) -> &'static str {
            match self {
                Self::StartTimer(_) => "start_timer",
                Self::CancelTimer(_) => "cancel_timer",
                Self::ScheduleActivity(_) => "schedule_activity",
                Self::RequestCancelActivity(_) => "request_cancel_activity",
                Self::StartChildWorkflowExecution(_) => "start_child_workflow_execution",
                Self::SignalExternalWorkflowExecution(_) => "signal_external_workflow_execution",
                Self::RequestCancelExternalWorkflowExecution(_) => {
                    "request_cancel_external_workflow_execution"
                }
                Self::CompleteWorkflowExecution(_) => "complete_workflow_execution",
                Self::FailWorkflowExecution(_) => "fail_workflow_execution",
                Self::ContinueAsNewWorkflowExecution(_) => "continue_as_new_workflow_execution",
                Self::RespondToQuery(_) => "respond_to_query",
            }
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartTimer {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
    #[prost(uint64, tag = "2")]
    pub duration_ms: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CancelTimer {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScheduleActivity {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
    #[prost(string, tag = "2")]
    pub activity_type: String,
    #[prost(message, optional, tag = "3")]
    pub arguments: Option<Payload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestCancelActivity {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartChildWorkflowExecution {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
    #[prost(string, tag = "2")]
    pub workflow_type: String,
    #[prost(string, tag = "3")]
    pub workflow_id: String,
    #[prost(message, optional, tag = "4")]
    pub input: Option<Payload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignalExternalWorkflowExecution {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
    #[prost(string, tag = "2")]
    pub workflow_id: String,
    #[prost(string, tag = "3")]
    pub signal_name: String,
    #[prost(message, optional, tag = "4")]
    pub arguments: Option<Payload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestCancelExternalWorkflowExecution {
    #[prost(uint32, tag = "1")]
    pub seq: u32,
    #[prost(string, tag = "2")]
    pub workflow_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CompleteWorkflowExecution {
    #[prost(message, optional, tag = "1")]
    pub result: Option<Payload>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FailWorkflowExecution {
    #[prost(message, optional, tag = "1")]
    pub failure: Option<Failure>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContinueAsNewWorkflowExecution {
    #[prost(string, tag = "1")]
    pub workflow_type: String,
    #[prost(message, optional, tag = "2")]
    pub input: Option<Payload>,
}

/// Answer to a `query_workflow` job.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResult {
    #[prost(string, tag = "1")]
    pub query_id: String,
    #[prost(oneof = "query_result::Status", tags = "2, 3")]
    pub status: Option<query_result::Status>,
}

pub mod query_result {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Status {
        #[prost(message, tag = "2")]
        Succeeded(super::Payload),
        #[prost(message, tag = "3")]
        Failed(super::Failure),
    }
}

/// Completion returned to the host once an activation concludes. Commands
/// are flushed atomically: a completion carries every command the activation
/// produced, and producing it empties the runtime's buffer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WorkflowActivationCompletion {
    #[prost(string, tag = "1")]
    pub run_id: String,
    #[prost(message, optional, tag = "2")]
    pub successful: Option<Success>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Success {
    #[prost(message, repeated, tag = "1")]
    pub commands: Vec<WorkflowCommand>,
}

impl WorkflowCommand {
    pub fn start_timer(seq: u32, duration_ms: u64) -> Self {
        Self {
            variant: Some(workflow_command::Variant::StartTimer(StartTimer {
                seq,
                duration_ms,
            })),
        }
    }

    pub fn cancel_timer(seq: u32) -> Self {
        Self {
            variant: Some(workflow_command::Variant::CancelTimer(CancelTimer { seq })),
        }
    }

    pub fn schedule_activity(
        seq: u32,
        activity_type: impl Into<String>,
        arguments: Option<Payload>,
    ) -> Self {
        Self {
            variant: Some(workflow_command::Variant::ScheduleActivity(
                ScheduleActivity {
                    seq,
                    activity_type: activity_type.into(),
                    arguments,
                },
            )),
        }
    }

    pub fn request_cancel_activity(seq: u32) -> Self {
        Self {
            variant: Some(workflow_command::Variant::RequestCancelActivity(
                RequestCancelActivity { seq },
            )),
        }
    }

    pub fn start_child_workflow(
        seq: u32,
        workflow_type: impl Into<String>,
        workflow_id: impl Into<String>,
        input: Option<Payload>,
    ) -> Self {
        Self {
            variant: Some(workflow_command::Variant::StartChildWorkflowExecution(
                StartChildWorkflowExecution {
                    seq,
                    workflow_type: workflow_type.into(),
                    workflow_id: workflow_id.into(),
                    input,
                },
            )),
        }
    }

    pub fn signal_external_workflow(
        seq: u32,
        workflow_id: impl Into<String>,
        signal_name: impl Into<String>,
        arguments: Option<Payload>,
    ) -> Self {
        Self {
            variant: Some(workflow_command::Variant::SignalExternalWorkflowExecution(
                SignalExternalWorkflowExecution {
                    seq,
                    workflow_id: workflow_id.into(),
                    signal_name: signal_name.into(),
                    arguments,
                },
            )),
        }
    }

    pub fn request_cancel_external_workflow(seq: u32, workflow_id: impl Into<String>) -> Self {
        Self {
            variant: Some(
                workflow_command::Variant::RequestCancelExternalWorkflowExecution(
                    RequestCancelExternalWorkflowExecution {
                        seq,
                        workflow_id: workflow_id.into(),
                    },
                ),
            ),
        }
    }

    pub fn complete_workflow(result: Option<Payload>) -> Self {
        Self {
            variant: Some(workflow_command::Variant::CompleteWorkflowExecution(
                CompleteWorkflowExecution { result },
            )),
        }
    }

    pub fn fail_workflow(failure: Failure) -> Self {
        Self {
            variant: Some(workflow_command::Variant::FailWorkflowExecution(
                FailWorkflowExecution {
                    failure: Some(failure),
                },
            )),
        }
    }

    pub fn continue_as_new(workflow_type: impl Into<String>, input: Option<Payload>) -> Self {
        Self {
            variant: Some(workflow_command::Variant::ContinueAsNewWorkflowExecution(
                ContinueAsNewWorkflowExecution {
                    workflow_type: workflow_type.into(),
                    input,
                },
            )),
        }
    }

    pub fn respond_to_query(query_id: impl Into<String>, status: query_result::Status) -> Self {
        Self {
            variant: Some(workflow_command::Variant::RespondToQuery(QueryResult {
                query_id: query_id.into(),
                status: Some(status),
            })),
        }
    }
}
