//! Interceptor module loading and chain composition around the runtime.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::*;
use weft_core::protocol::{WorkflowActivation, WorkflowActivationJob};
use weft_core::{CoreError, CoreResult, Payload, WorkflowCommand};
use weft_worker_core::{
    ActivateNext, ConcludeNext, InternalsInterceptor, WorkflowInfo, WorkflowInterceptors,
    WorkflowModule, WorkflowRuntime, MAIN_MODULE,
};

struct ActivationCounter {
    count: Rc<Cell<u32>>,
}

impl InternalsInterceptor for ActivationCounter {
    fn activate(
        &self,
        activation: WorkflowActivation,
        batch_index: u32,
        next: ActivateNext<'_>,
    ) -> CoreResult<weft_worker_core::ActivationResponse> {
        self.count.set(self.count.get() + 1);
        next.run(activation, batch_index)
    }
}

struct CommandStamp;

impl InternalsInterceptor for CommandStamp {
    fn conclude(
        &self,
        mut commands: Vec<WorkflowCommand>,
        next: ConcludeNext<'_>,
    ) -> CoreResult<Vec<WorkflowCommand>> {
        commands.push(WorkflowCommand::start_timer(77, 1));
        next.run(commands)
    }
}

fn noop_main_module() -> WorkflowModule {
    WorkflowModule::new().with_workflow("noop", |_env, _input| {
        Box::pin(async move { Ok(Payload::default()) })
    })
}

fn runtime_with_interceptor_module(count: Rc<Cell<u32>>) -> WorkflowRuntime {
    let mut runtime = WorkflowRuntime::new();
    runtime.set_module_loader(Box::new(move |path| match path {
        MAIN_MODULE => Ok(noop_main_module()),
        "observability" => {
            let count = Rc::clone(&count);
            Ok(WorkflowModule::new().with_interceptors(move || {
                WorkflowInterceptors::new()
                    .with_internals(ActivationCounter {
                        count: Rc::clone(&count),
                    })
                    .with_internals(CommandStamp)
            }))
        }
        other => Err(CoreError::type_mismatch(format!("unknown module '{other}'"))),
    }));
    runtime
}

#[test]
fn test_interceptor_modules_wrap_activate_and_conclude() {
    let count = Rc::new(Cell::new(0));
    let mut runtime = runtime_with_interceptor_module(Rc::clone(&count));
    runtime
        .init_runtime(
            WorkflowInfo::new("noop", "run-1", "wf-1"),
            &["observability".to_string()],
            &[1],
            chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            None,
        )
        .unwrap();

    activate(
        &mut runtime,
        WorkflowActivation::new(
            "run-1",
            0,
            vec![WorkflowActivationJob::start_workflow("noop", "wf-1", None)],
        ),
    );
    assert_eq!(count.get(), 1);

    let commands = conclude_commands(&mut runtime);
    // the stamp interceptor appended its marker before the base handler
    assert_eq!(
        command_names(&commands),
        vec!["complete_workflow_execution", "start_timer"]
    );
}

#[test]
fn test_interceptor_module_without_factory_is_type_mismatch() {
    let mut runtime = WorkflowRuntime::new();
    runtime.set_module_loader(Box::new(|path| match path {
        MAIN_MODULE => Ok(noop_main_module()),
        // a module that forgets to export `interceptors`
        "broken" => Ok(WorkflowModule::new()),
        other => Err(CoreError::type_mismatch(format!("unknown module '{other}'"))),
    }));

    let err = runtime
        .init_runtime(
            WorkflowInfo::new("noop", "run-1", "wf-1"),
            &["broken".to_string()],
            &[1],
            chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::TypeMismatch(_)));
}

#[test]
fn test_unresolvable_interceptor_module_fails_init() {
    let mut runtime = make_runtime(noop_main_module);
    let err = runtime
        .init_runtime(
            WorkflowInfo::new("noop", "run-1", "wf-1"),
            &["missing-module".to_string()],
            &[1],
            chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::TypeMismatch(_)));
}

#[test]
fn test_init_without_module_loader_is_illegal_state() {
    let mut runtime = WorkflowRuntime::new();
    let err = runtime
        .init_runtime(
            WorkflowInfo::new("noop", "run-1", "wf-1"),
            &[],
            &[1],
            chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::IllegalState(_)));
}
