//! The deterministic workflow runtime.
//!
//! One [`WorkflowRuntime`] hosts one workflow run for its whole lifetime,
//! potentially across many activations. The host drives it through a small
//! surface: install a module loader, `init_runtime`, then per activation
//! `activate` / service external calls / `conclude_activation`.
//!
//! Every operation takes the runtime by exclusive reference; there is no
//! global state. Jobs are dispatched in activation order, the cooperative
//! scheduler drains after each job, and blocked conditions are re-evaluated
//! to a fixed point between jobs, so command emission order is a pure
//! function of the activation history.

pub mod commands;
pub mod conditions;
pub mod dependencies;
pub mod interceptors;
pub mod scheduler;
pub mod sequences;
pub(crate) mod state;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use weft_core::protocol::activation::{
    activity_resolution, child_workflow_resolution, workflow_activation_job, CancelWorkflow,
    FireTimer, QueryWorkflow, RemoveFromCache, ResolveActivity, ResolveChildWorkflowExecution,
    ResolveRequestCancelExternalWorkflow, ResolveSignalExternalWorkflow, SignalWorkflow,
    StartWorkflow,
};
use weft_core::protocol::command::query_result;
use weft_core::protocol::{Success, WorkflowActivationCompletion};
use weft_core::{Alea, CoreError, CoreResult, Payload, WorkflowActivation, WorkflowCommand};

use crate::runtime::dependencies::{
    ApplyMode, DependencyResolution, PendingExternalCall, SyncHandler,
};
use crate::runtime::interceptors::{ActivateNext, ConcludeNext, WorkflowInterceptors};
use crate::runtime::scheduler::{Scheduler, TaskHook};
use crate::runtime::sequences::SeqKind;
use crate::runtime::state::RuntimeState;
use crate::workflow::env::WorkflowEnv;
use crate::workflow::failure::WorkflowFailure;
use crate::workflow::module::{ModuleLoader, WorkflowFunction, MAIN_MODULE};
use crate::workflow::WorkflowInfo;

/// What `activate` hands back to the host: calls awaiting host service and
/// the number of still-blocked conditions.
#[derive(Debug)]
pub struct ActivationResponse {
    pub external_calls: Vec<PendingExternalCall>,
    pub num_blocked_conditions: u32,
}

/// Outcome of `conclude_activation`.
pub enum ActivationConclusion {
    /// External calls still need servicing; the host must resolve them and
    /// ask for conclusion again.
    Pending {
        external_calls: Vec<PendingExternalCall>,
        num_blocked_conditions: u32,
    },
    /// The encoded completion carrying every command of this activation.
    /// Producing it emptied the command buffer.
    Complete { encoded: Vec<u8> },
}

/// Deterministic runtime for a single workflow run.
pub struct WorkflowRuntime {
    state: Rc<RefCell<RuntimeState>>,
    scheduler: Scheduler,
    workflow: Option<WorkflowFunction>,
    interceptors: WorkflowInterceptors,
    module_loader: Option<ModuleLoader>,
}

impl Default for WorkflowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRuntime {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(RuntimeState::new())),
            scheduler: Scheduler::new(),
            workflow: None,
            interceptors: WorkflowInterceptors::new(),
            module_loader: None,
        }
    }

    /// Install the loader used to resolve the workflow bundle and
    /// interceptor modules. Must happen before [`Self::init_runtime`].
    pub fn set_module_loader(&mut self, loader: ModuleLoader) {
        self.module_loader = Some(loader);
    }

    /// Install the deterministic globals. Idempotent; also re-asserted at
    /// init because snapshot restoration can drop them.
    pub fn override_globals(&mut self) {
        let mut state = self.state.borrow_mut();
        if !state.globals_installed {
            tracing::debug!("deterministic globals installed");
            state.globals_installed = true;
        }
    }

    /// Seed the run: identity, clock, randomness, interceptors, and the
    /// workflow function itself.
    ///
    /// An unresolvable workflow type does not fail init: it records a
    /// non-retryable `ReferenceError` workflow failure and returns
    /// normally. Interceptor-module load errors, by contrast, surface to
    /// the host as init-time failures.
    pub fn init_runtime(
        &mut self,
        info: WorkflowInfo,
        interceptor_modules: &[String],
        randomness_seed: &[u8],
        now: DateTime<Utc>,
        hook: Option<Arc<dyn TaskHook>>,
    ) -> CoreResult<()> {
        self.override_globals();
        {
            let mut state = self.state.borrow_mut();
            state.info = info;
            state.now = now;
            state.random = Alea::from_seed(randomness_seed);
            state.initialized = true;
        }
        self.scheduler.set_hook(hook);

        let loader = self.module_loader.as_ref().ok_or_else(|| {
            CoreError::illegal_state(
                "module loader not installed; call set_module_loader before init_runtime",
            )
        })?;

        for path in interceptor_modules {
            let module = loader(path)?;
            let factory = module.interceptors.ok_or_else(|| {
                CoreError::type_mismatch(format!(
                    "interceptor module '{path}' does not export an interceptors factory"
                ))
            })?;
            self.interceptors.extend(factory());
        }

        let workflow_type = self.state.borrow().info.workflow_type.clone();
        let lookup = loader(MAIN_MODULE)
            .ok()
            .and_then(|module| module.workflows.get(&workflow_type).cloned());
        match lookup {
            Some(workflow) => self.workflow = Some(workflow),
            None => {
                let failure = WorkflowFailure::reference_error(format!(
                    "'{workflow_type}' is not a registered workflow function"
                ));
                self.state.borrow_mut().record_workflow_failure(failure);
            }
        }
        Ok(())
    }

    /// Register an external dependency stub callable from workflow code.
    pub fn inject(
        &mut self,
        iface_name: &str,
        fn_name: &str,
        apply_mode: ApplyMode,
        handler: Option<SyncHandler>,
    ) {
        self.state
            .borrow_mut()
            .dependencies
            .inject(iface_name, fn_name, apply_mode, handler);
    }

    /// Decode and process one activation batch.
    pub fn activate(&mut self, encoded: &[u8], batch_index: u32) -> CoreResult<ActivationResponse> {
        let activation = weft_core::decode_activation(encoded)?;
        self.activate_decoded(activation, batch_index)
    }

    /// Process an already-decoded activation batch under the interceptor
    /// chain.
    pub fn activate_decoded(
        &mut self,
        activation: WorkflowActivation,
        batch_index: u32,
    ) -> CoreResult<ActivationResponse> {
        let chain = self.interceptors.internals.clone();
        let mut base = |activation: WorkflowActivation, batch_index: u32| {
            self.run_activation(activation, batch_index)
        };
        ActivateNext {
            chain: &chain,
            base: &mut base,
        }
        .run(activation, batch_index)
    }

    fn run_activation(
        &mut self,
        activation: WorkflowActivation,
        batch_index: u32,
    ) -> CoreResult<ActivationResponse> {
        {
            let mut state = self.state.borrow_mut();
            if !state.initialized {
                return Err(CoreError::illegal_state(
                    "activate called before init_runtime",
                ));
            }
            if batch_index == 0 {
                if activation.jobs.is_empty() {
                    return Err(CoreError::type_mismatch("activation has no jobs"));
                }
                // Query-only activations carry no timestamp and must not
                // advance workflow time.
                if let Some(ms) = activation.timestamp_ms {
                    state.now = DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                        CoreError::type_mismatch(format!(
                            "activation timestamp out of range: {ms}"
                        ))
                    })?;
                }
                state.info.is_replaying = activation.is_replaying;
            }
        }

        for job in activation.jobs {
            let Some(variant) = job.variant else {
                return Err(CoreError::type_mismatch("activation job has no variant set"));
            };
            let drop_job = {
                let state = self.state.borrow();
                state.completed
                    && !matches!(
                        variant,
                        workflow_activation_job::Variant::QueryWorkflow(_)
                    )
            };
            if drop_job {
                tracing::debug!(job = variant.name(), "dropping job after workflow completion");
                continue;
            }
            if let Err(err) = self.dispatch_job(variant) {
                tracing::warn!(error = %err, "job dispatch failed; failing workflow");
                self.state
                    .borrow_mut()
                    .record_workflow_failure(WorkflowFailure::from(err));
            }
            self.drain_microtasks();
        }

        let mut state = self.state.borrow_mut();
        Ok(ActivationResponse {
            external_calls: state.dependencies.take_pending(),
            num_blocked_conditions: state.conditions.len() as u32,
        })
    }

    fn dispatch_job(&mut self, variant: workflow_activation_job::Variant) -> CoreResult<()> {
        use workflow_activation_job::Variant;
        tracing::debug!(job = variant.name(), "dispatching job");
        match variant {
            Variant::StartWorkflow(job) => self.handle_start_workflow(job),
            Variant::FireTimer(job) => self.handle_fire_timer(job),
            Variant::ResolveActivity(job) => self.handle_resolve_activity(job),
            Variant::ResolveChildWorkflowExecution(job) => self.handle_resolve_child_workflow(job),
            Variant::SignalWorkflow(job) => self.handle_signal_workflow(job),
            Variant::QueryWorkflow(job) => self.handle_query_workflow(job),
            Variant::NotifyHasPatch(job) => {
                self.state
                    .borrow_mut()
                    .notified_patches
                    .insert(job.patch_id);
                Ok(())
            }
            Variant::CancelWorkflow(job) => self.handle_cancel_workflow(job),
            Variant::RemoveFromCache(job) => self.handle_remove_from_cache(job),
            Variant::ResolveSignalExternalWorkflow(job) => {
                self.handle_resolve_signal_external(job)
            }
            Variant::ResolveRequestCancelExternalWorkflow(job) => {
                self.handle_resolve_cancel_external(job)
            }
        }
    }

    fn handle_start_workflow(&mut self, job: StartWorkflow) -> CoreResult<()> {
        let workflow = self.workflow.clone().ok_or_else(|| {
            CoreError::illegal_state(format!(
                "no workflow function loaded for type '{}'",
                job.workflow_type
            ))
        })?;
        let input = job.input.unwrap_or_default();
        let env = WorkflowEnv::new(Rc::clone(&self.state));
        let state = Rc::clone(&self.state);
        self.scheduler.spawn(async move {
            match workflow(env, input).await {
                Ok(result) => state.borrow_mut().record_workflow_completion(result),
                Err(failure) => state.borrow_mut().record_workflow_failure(failure),
            }
        });
        Ok(())
    }

    fn handle_fire_timer(&mut self, job: FireTimer) -> CoreResult<()> {
        let sender = self
            .state
            .borrow_mut()
            .sequences
            .consume(SeqKind::Timer, job.seq)?;
        let _ = sender.send(Ok(Payload::default()));
        Ok(())
    }

    fn handle_resolve_activity(&mut self, job: ResolveActivity) -> CoreResult<()> {
        let status = job
            .result
            .and_then(|r| r.status)
            .ok_or_else(|| CoreError::type_mismatch("resolve_activity job has no status"))?;
        let value = match status {
            activity_resolution::Status::Completed(payload) => Ok(payload),
            activity_resolution::Status::Failed(failure) => {
                Err(WorkflowFailure::from_proto(failure))
            }
            activity_resolution::Status::Cancelled(failure) => {
                Err(WorkflowFailure::cancelled(failure.message))
            }
        };
        let sender = self
            .state
            .borrow_mut()
            .sequences
            .consume(SeqKind::Activity, job.seq)?;
        let _ = sender.send(value);
        Ok(())
    }

    fn handle_resolve_child_workflow(
        &mut self,
        job: ResolveChildWorkflowExecution,
    ) -> CoreResult<()> {
        let status = job.result.and_then(|r| r.status).ok_or_else(|| {
            CoreError::type_mismatch("resolve_child_workflow_execution job has no status")
        })?;
        let value = match status {
            child_workflow_resolution::Status::Completed(payload) => Ok(payload),
            child_workflow_resolution::Status::Failed(failure) => {
                Err(WorkflowFailure::from_proto(failure))
            }
            child_workflow_resolution::Status::Cancelled(failure) => {
                Err(WorkflowFailure::cancelled(failure.message))
            }
        };
        let sender = self
            .state
            .borrow_mut()
            .sequences
            .consume(SeqKind::ChildWorkflow, job.seq)?;
        let _ = sender.send(value);
        Ok(())
    }

    fn handle_signal_workflow(&mut self, job: SignalWorkflow) -> CoreResult<()> {
        let payload = job.input.unwrap_or_default();

        // A registered handler wins over waiters.
        let handler = {
            let state = self.state.borrow();
            state.signal_handlers.get(&job.signal_name).cloned()
        };
        if let Some(handler) = handler {
            handler(payload);
            return Ok(());
        }

        let mut state = self.state.borrow_mut();
        while let Some(seq) = state
            .signal_waiters
            .get_mut(&job.signal_name)
            .and_then(|queue| queue.pop_front())
        {
            // Stale waiters (dropped futures) are skipped.
            if let Ok(sender) = state.sequences.consume(SeqKind::Signal, seq) {
                if sender.send(Ok(payload.clone())).is_ok() {
                    return Ok(());
                }
            }
        }
        state
            .buffered_signals
            .entry(job.signal_name)
            .or_default()
            .push_back(payload);
        Ok(())
    }

    fn handle_query_workflow(&mut self, job: QueryWorkflow) -> CoreResult<()> {
        let handler = {
            let state = self.state.borrow();
            state.query_handlers.get(&job.query_type).cloned()
        };
        let status = match handler {
            Some(handler) => match handler(job.arguments.unwrap_or_default()) {
                Ok(payload) => query_result::Status::Succeeded(payload),
                Err(failure) => query_result::Status::Failed(failure.to_proto()),
            },
            None => query_result::Status::Failed(
                WorkflowFailure::non_retryable(
                    format!("unknown query type '{}'", job.query_type),
                    "TypeError",
                )
                .to_proto(),
            ),
        };
        self.state
            .borrow_mut()
            .commands
            .push(WorkflowCommand::respond_to_query(job.query_id, status));
        Ok(())
    }

    fn handle_cancel_workflow(&mut self, job: CancelWorkflow) -> CoreResult<()> {
        let mut state = self.state.borrow_mut();
        tracing::debug!(reason = %job.reason, "workflow cancellation requested");
        state.cancellation_requested = true;
        for waiter in state.cancellation_waiters.drain(..) {
            let _ = waiter.send(());
        }
        Ok(())
    }

    /// Eviction notice: tear the run down without emitting commands.
    fn handle_remove_from_cache(&mut self, job: RemoveFromCache) -> CoreResult<()> {
        tracing::debug!(message = %job.message, "evicting workflow run");
        self.scheduler.clear();
        let mut state = self.state.borrow_mut();
        state.completed = true;
        state.sequences.clear();
        state.conditions.clear();
        state.dependencies.take_pending();
        state.commands.drain();
        Ok(())
    }

    fn handle_resolve_signal_external(
        &mut self,
        job: ResolveSignalExternalWorkflow,
    ) -> CoreResult<()> {
        let value = match job.failure {
            None => Ok(Payload::default()),
            Some(failure) => Err(WorkflowFailure::from_proto(failure)),
        };
        let sender = self
            .state
            .borrow_mut()
            .sequences
            .consume(SeqKind::SignalWorkflowExternal, job.seq)?;
        let _ = sender.send(value);
        Ok(())
    }

    fn handle_resolve_cancel_external(
        &mut self,
        job: ResolveRequestCancelExternalWorkflow,
    ) -> CoreResult<()> {
        let value = match job.failure {
            None => Ok(Payload::default()),
            Some(failure) => Err(WorkflowFailure::from_proto(failure)),
        };
        let sender = self
            .state
            .borrow_mut()
            .sequences
            .consume(SeqKind::CancelWorkflowExternal, job.seq)?;
        let _ = sender.send(value);
        Ok(())
    }

    /// Run the scheduler to quiescence, re-evaluating blocked conditions to
    /// a fixed point whenever progress stalls.
    fn drain_microtasks(&mut self) {
        loop {
            self.scheduler.run_until_stalled();
            let unblocked = self.state.borrow_mut().conditions.try_unblock();
            if unblocked == 0 {
                break;
            }
        }
    }

    /// Conclude the current activation: either a `Pending` report of
    /// external calls still awaiting service, or the encoded completion.
    pub fn conclude_activation(&mut self) -> CoreResult<ActivationConclusion> {
        if !self.state.borrow().initialized {
            return Err(CoreError::illegal_state(
                "conclude_activation called before init_runtime",
            ));
        }
        self.drain_microtasks();

        {
            let mut state = self.state.borrow_mut();
            if state.dependencies.has_pending() {
                return Ok(ActivationConclusion::Pending {
                    external_calls: state.dependencies.take_pending(),
                    num_blocked_conditions: state.conditions.len() as u32,
                });
            }
        }

        let drained = self.state.borrow_mut().commands.drain();
        let chain = self.interceptors.internals.clone();
        let mut base =
            |commands: Vec<WorkflowCommand>| -> CoreResult<Vec<WorkflowCommand>> { Ok(commands) };
        let commands = ConcludeNext {
            chain: &chain,
            base: &mut base,
        }
        .run(drained)?;

        let run_id = self.state.borrow().info.run_id.clone();
        tracing::debug!(run_id = %run_id, commands = commands.len(), "activation concluded");
        let completion = WorkflowActivationCompletion {
            run_id,
            successful: Some(Success { commands }),
        };
        Ok(ActivationConclusion::Complete {
            encoded: weft_core::encode_completion(&completion),
        })
    }

    /// Return and clear the queue of calls awaiting host service.
    pub fn get_and_reset_pending_external_calls(&mut self) -> Vec<PendingExternalCall> {
        self.state.borrow_mut().dependencies.take_pending()
    }

    /// Deliver host results for asynchronous dependency calls and resume the
    /// tasks awaiting them. An unknown sequence is an illegal state.
    pub fn resolve_external_dependencies(
        &mut self,
        results: Vec<DependencyResolution>,
    ) -> CoreResult<()> {
        for resolution in results {
            let sender = self
                .state
                .borrow_mut()
                .sequences
                .consume(SeqKind::Dependency, resolution.seq)?;
            let outcome = match resolution.result {
                Ok(value) => match Payload::json(&value) {
                    Ok(payload) => Ok(payload),
                    Err(e) => Err(WorkflowFailure::application(format!(
                        "dependency result is not encodable: {e}"
                    ))),
                },
                Err(message) => Err(WorkflowFailure::application(message)),
            };
            let _ = sender.send(outcome);
        }
        self.drain_microtasks();
        Ok(())
    }

    /// Evaluate blocked conditions to a fixed point; returns the number
    /// unblocked.
    pub fn try_unblock_conditions(&mut self) -> usize {
        self.state.borrow_mut().conditions.try_unblock()
    }

    /// Number of conditions still blocked.
    pub fn num_blocked_conditions(&self) -> u32 {
        self.state.borrow().conditions.len() as u32
    }
}
