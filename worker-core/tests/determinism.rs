//! Determinism properties: identical history in, identical commands out.

mod common;

use chrono::{DateTime, Utc};
use common::*;
use proptest::prelude::*;
use weft_core::protocol::command::workflow_command;
use weft_core::protocol::{WorkflowActivation, WorkflowActivationJob};
use weft_core::{Payload, WorkflowCommand};
use weft_worker_core::{WorkflowInfo, WorkflowModule};

fn roll_module() -> WorkflowModule {
    WorkflowModule::new().with_workflow("roll", |env, _input| {
        Box::pin(async move {
            let rolls = [env.random(), env.random(), env.random()];
            Ok(Payload::json(&rolls)?)
        })
    })
}

fn run_roll(seed: &[u8]) -> Vec<WorkflowCommand> {
    let mut runtime = make_runtime(roll_module);
    init(&mut runtime, "roll", seed);
    activate(
        &mut runtime,
        WorkflowActivation::new(
            "run-1",
            0,
            vec![WorkflowActivationJob::start_workflow("roll", "wf-1", None)],
        ),
    );
    conclude_commands(&mut runtime)
}

// =========================================================================
// Time
// =========================================================================

#[test]
fn test_workflow_clock_reads_activation_timestamp() {
    let mut runtime = make_runtime(|| {
        WorkflowModule::new().with_workflow("clock", |env, _input| {
            Box::pin(async move { Ok(Payload::json(&env.now().timestamp_millis())?) })
        })
    });
    init(&mut runtime, "clock", &[1]);

    activate(
        &mut runtime,
        WorkflowActivation::new(
            "run-1",
            12_345,
            vec![WorkflowActivationJob::start_workflow("clock", "wf-1", None)],
        ),
    );
    let commands = conclude_commands(&mut runtime);
    match commands[0].variant.as_ref().unwrap() {
        workflow_command::Variant::CompleteWorkflowExecution(c) => {
            let observed: i64 = c.result.as_ref().unwrap().deserialize().unwrap();
            assert_eq!(observed, 12_345);
        }
        other => panic!("unexpected command: {}", other.name()),
    }
}

#[test]
fn test_replay_flag_is_copied_from_activation() {
    let mut runtime = make_runtime(|| {
        WorkflowModule::new().with_workflow("probe", |env, _input| {
            Box::pin(async move { Ok(Payload::json(&env.is_replaying())?) })
        })
    });
    init(&mut runtime, "probe", &[1]);

    activate(
        &mut runtime,
        WorkflowActivation::new(
            "run-1",
            0,
            vec![WorkflowActivationJob::start_workflow("probe", "wf-1", None)],
        )
        .with_replaying(true),
    );
    let commands = conclude_commands(&mut runtime);
    match commands[0].variant.as_ref().unwrap() {
        workflow_command::Variant::CompleteWorkflowExecution(c) => {
            let replaying: bool = c.result.as_ref().unwrap().deserialize().unwrap();
            assert!(replaying);
        }
        other => panic!("unexpected command: {}", other.name()),
    }
}

// =========================================================================
// Randomness
// =========================================================================

#[test]
fn test_same_seed_produces_identical_commands() {
    let a = run_roll(&[1, 2, 3, 4]);
    let b = run_roll(&[1, 2, 3, 4]);
    assert_eq!(a, b);
}

#[test]
fn test_different_seeds_produce_different_results() {
    let a = run_roll(&[1, 2, 3, 4]);
    let b = run_roll(&[4, 3, 2, 1]);
    assert_ne!(a, b);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_runs_with_equal_seeds_are_byte_identical(
        seed in proptest::collection::vec(any::<u8>(), 1..32)
    ) {
        prop_assert_eq!(run_roll(&seed), run_roll(&seed));
    }
}

// =========================================================================
// Sequences
// =========================================================================

#[test]
fn test_sequence_numbers_are_monotonic_per_kind() {
    let mut runtime = make_runtime(|| {
        WorkflowModule::new().with_workflow("fanout", |env, _input| {
            Box::pin(async move {
                let t0 = env.sleep(std::time::Duration::from_millis(10));
                let t1 = env.sleep(std::time::Duration::from_millis(20));
                let a0 = env.schedule_activity("op-a", None);
                let a1 = env.schedule_activity("op-b", None);
                t0.await;
                t1.await;
                a0.await?;
                a1.await?;
                Ok(Payload::default())
            })
        })
    });
    init(&mut runtime, "fanout", &[2]);

    activate(
        &mut runtime,
        WorkflowActivation::new(
            "run-1",
            0,
            vec![WorkflowActivationJob::start_workflow("fanout", "wf-1", None)],
        ),
    );
    let commands = conclude_commands(&mut runtime);
    assert_eq!(
        command_names(&commands),
        vec![
            "start_timer",
            "start_timer",
            "schedule_activity",
            "schedule_activity"
        ]
    );

    let mut timer_seqs = Vec::new();
    let mut activity_seqs = Vec::new();
    for command in &commands {
        match command.variant.as_ref().unwrap() {
            workflow_command::Variant::StartTimer(t) => timer_seqs.push(t.seq),
            workflow_command::Variant::ScheduleActivity(a) => activity_seqs.push(a.seq),
            _ => {}
        }
    }
    // independent counters, each starting from zero
    assert_eq!(timer_seqs, vec![0, 1]);
    assert_eq!(activity_seqs, vec![0, 1]);
}

// =========================================================================
// Command buffer
// =========================================================================

#[test]
fn test_command_buffer_is_empty_after_conclusion() {
    let mut runtime = make_runtime(|| {
        WorkflowModule::new().with_workflow("noop", |_env, _input| {
            Box::pin(async move { Ok(Payload::default()) })
        })
    });
    init(&mut runtime, "noop", &[3]);

    activate(
        &mut runtime,
        WorkflowActivation::new(
            "run-1",
            0,
            vec![WorkflowActivationJob::start_workflow("noop", "wf-1", None)],
        ),
    );
    let first = conclude_commands(&mut runtime);
    assert_eq!(first.len(), 1);

    // a second conclusion flushes nothing
    let second = conclude_commands(&mut runtime);
    assert!(second.is_empty());
}

// =========================================================================
// Run identity
// =========================================================================

#[test]
fn test_completion_carries_run_id_from_info() {
    let run_id = uuid::Uuid::new_v4().to_string();
    let mut runtime = make_runtime(|| {
        WorkflowModule::new().with_workflow("noop", |_env, _input| {
            Box::pin(async move { Ok(Payload::default()) })
        })
    });
    runtime
        .init_runtime(
            WorkflowInfo::new("noop", run_id.clone(), "wf-1"),
            &[],
            &[4],
            DateTime::<Utc>::UNIX_EPOCH,
            None,
        )
        .unwrap();

    activate(
        &mut runtime,
        WorkflowActivation::new(
            run_id.clone(),
            0,
            vec![WorkflowActivationJob::start_workflow("noop", "wf-1", None)],
        ),
    );
    match runtime.conclude_activation().unwrap() {
        weft_worker_core::ActivationConclusion::Complete { encoded } => {
            let completion =
                weft_core::protocol::codec::decode_completion(&encoded).unwrap();
            assert_eq!(completion.run_id, run_id);
        }
        weft_worker_core::ActivationConclusion::Pending { .. } => {
            panic!("expected a complete conclusion")
        }
    }
}
