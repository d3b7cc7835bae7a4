//! Length-delimited framing for activations and completions.

use crate::error::CoreResult;
use crate::protocol::activation::WorkflowActivation;
use crate::protocol::command::WorkflowActivationCompletion;
use prost::Message;

/// Decode a length-delimited activation message.
pub fn decode_activation(buf: &[u8]) -> CoreResult<WorkflowActivation> {
    Ok(WorkflowActivation::decode_length_delimited(buf)?)
}

/// Encode a completion as a length-delimited message.
pub fn encode_completion(completion: &WorkflowActivationCompletion) -> Vec<u8> {
    completion.encode_length_delimited_to_vec()
}

/// Encode an activation as a length-delimited message. Hosts and replay
/// tooling use this to assemble the inbound stream.
pub fn encode_activation(activation: &WorkflowActivation) -> Vec<u8> {
    activation.encode_length_delimited_to_vec()
}

/// Decode a length-delimited completion message.
pub fn decode_completion(buf: &[u8]) -> CoreResult<WorkflowActivationCompletion> {
    Ok(WorkflowActivationCompletion::decode_length_delimited(buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::activation::WorkflowActivationJob;
    use crate::protocol::command::{Success, WorkflowCommand};

    #[test]
    fn test_activation_round_trip() {
        let activation = WorkflowActivation::new(
            "run-1",
            1_700_000_000_000,
            vec![
                WorkflowActivationJob::start_workflow("sleeper", "wf-1", None),
                WorkflowActivationJob::fire_timer(0),
            ],
        );

        let encoded = encode_activation(&activation);
        let decoded = decode_activation(&encoded).unwrap();

        assert_eq!(decoded, activation);
    }

    #[test]
    fn test_completion_round_trip() {
        let completion = WorkflowActivationCompletion {
            run_id: "run-1".to_string(),
            successful: Some(Success {
                commands: vec![
                    WorkflowCommand::start_timer(0, 1000),
                    WorkflowCommand::complete_workflow(None),
                ],
            }),
        };

        let encoded = encode_completion(&completion);
        let decoded = WorkflowActivationCompletion::decode_length_delimited(&encoded[..]).unwrap();

        assert_eq!(decoded, completion);
    }

    #[test]
    fn test_decode_garbage_fails() {
        // A delimiter promising more bytes than the buffer carries.
        let bogus = [0xff, 0x01, 0x02];
        assert!(decode_activation(&bogus).is_err());
    }
}
