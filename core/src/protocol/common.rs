//! Payload and failure wire types shared by jobs and commands.

use crate::error::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An opaque value crossing the sandbox boundary. The data bytes are
/// JSON-encoded; the helpers below keep that convention in one place.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payload {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
}

impl Payload {
    /// Encode a serializable value into a payload.
    pub fn json<T: Serialize>(value: &T) -> CoreResult<Self> {
        Ok(Self {
            data: serde_json::to_vec(value)?,
        })
    }

    /// Decode the payload into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> CoreResult<T> {
        serde_json::from_slice(&self.data).map_err(CoreError::from)
    }

    /// True when the payload carries no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A failure crossing the sandbox boundary, either attached to a
/// `fail_workflow_execution` command or delivered inside a resolution job.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Failure {
    #[prost(string, tag = "1")]
    pub message: String,
    /// Failure category label, e.g. `ApplicationFailure`, `CancelledFailure`,
    /// `DeterminismViolationError`, `ReferenceError`.
    #[prost(string, tag = "2")]
    pub failure_type: String,
    #[prost(string, tag = "3")]
    pub stack_trace: String,
    #[prost(bool, tag = "4")]
    pub non_retryable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: u32,
        total: f64,
    }

    #[test]
    fn test_payload_json_round_trip() {
        let order = Order { id: 7, total: 12.5 };
        let payload = Payload::json(&order).unwrap();
        assert!(!payload.is_empty());

        let decoded: Order = payload.deserialize().unwrap();
        assert_eq!(decoded, order);
    }

    #[test]
    fn test_payload_deserialize_rejects_garbage() {
        let payload = Payload {
            data: b"not json".to_vec(),
        };
        assert!(payload.deserialize::<Order>().is_err());
    }
}
