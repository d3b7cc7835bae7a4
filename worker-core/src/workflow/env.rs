//! The workflow environment: every capability user workflow code may touch.
//!
//! `WorkflowEnv` is the deterministic replacement for ambient facilities.
//! The clock reads activation time, randomness comes from the seeded
//! generator, and every suspension point allocates a sequence number and
//! registers a completion so that replaying the same history resolves the
//! same awaits in the same order. Nothing here ever consults the host clock
//! or host RNG.

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::oneshot;
use weft_core::{Payload, WorkflowCommand};

use crate::runtime::dependencies::{ApplyMode, DependencyCall, PendingExternalCall};
use crate::runtime::sequences::{CompletionValue, SeqKind};
use crate::runtime::state::RuntimeState;
use crate::workflow::failure::WorkflowFailure;
use crate::workflow::WorkflowInfo;

/// Capability handle passed to workflow functions. Cloning is cheap; all
/// clones observe the same run state.
#[derive(Clone)]
pub struct WorkflowEnv {
    state: Rc<RefCell<RuntimeState>>,
}

impl WorkflowEnv {
    pub(crate) fn new(state: Rc<RefCell<RuntimeState>>) -> Self {
        Self { state }
    }

    /// Identity of the current run.
    pub fn info(&self) -> WorkflowInfo {
        self.state.borrow().info.clone()
    }

    /// Deterministic wall clock: the timestamp of the activation being
    /// processed, never the host clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.state.borrow().now
    }

    /// Whether the current activation replays recorded history.
    pub fn is_replaying(&self) -> bool {
        self.state.borrow().info.is_replaying
    }

    /// Deterministic random double in `[0, 1)`.
    pub fn random(&self) -> f64 {
        self.state.borrow_mut().random.next_f64()
    }

    /// Suspend for `duration`. The returned future resolves when the
    /// matching `fire_timer` job arrives; its sequence number doubles as the
    /// cancellation handle.
    pub fn sleep(&self, duration: Duration) -> TimerFuture {
        let mut state = self.state.borrow_mut();
        let seq = state.sequences.next(SeqKind::Timer);
        let (tx, rx) = oneshot::channel();
        state.sequences.register(SeqKind::Timer, seq, tx);
        state
            .commands
            .push(WorkflowCommand::start_timer(seq, duration.as_millis() as u64));
        TimerFuture {
            seq,
            recv: CompletionRecv::new(rx),
        }
    }

    /// Cancel a timer by its sequence handle. Cancellation is a silent drop:
    /// the stored resolver is discarded and the waiter stays suspended, and
    /// the timer counter advances so the cancelled handle is never reused.
    pub fn cancel_timer(&self, seq: u32) {
        let mut state = self.state.borrow_mut();
        state.sequences.next(SeqKind::Timer);
        state.sequences.discard(SeqKind::Timer, seq);
        state.commands.push(WorkflowCommand::cancel_timer(seq));
    }

    /// Suspend until `predicate` evaluates to true. Predicates are
    /// re-evaluated between job batches and must not call back into the
    /// environment.
    pub fn condition(&self, predicate: impl Fn() -> bool + 'static) -> ConditionFuture {
        let mut state = self.state.borrow_mut();
        let seq = state.sequences.next(SeqKind::Condition);
        let (tx, rx) = oneshot::channel();
        state.conditions.insert(seq, Box::new(predicate), tx);
        ConditionFuture {
            seq,
            rx: Some(rx),
        }
    }

    /// Await the next delivery of a named signal. Signals that arrived
    /// before any waiter or handler existed are buffered and consumed first.
    pub fn next_signal(&self, name: &str) -> SignalFuture {
        let mut state = self.state.borrow_mut();
        let seq = state.sequences.next(SeqKind::Signal);
        let (tx, rx) = oneshot::channel();
        if let Some(payload) = state
            .buffered_signals
            .get_mut(name)
            .and_then(|queue| queue.pop_front())
        {
            let _ = tx.send(Ok(payload));
        } else {
            state.sequences.register(SeqKind::Signal, seq, tx);
            state
                .signal_waiters
                .entry(name.to_string())
                .or_default()
                .push_back(seq);
        }
        SignalFuture {
            seq,
            recv: CompletionRecv::new(rx),
        }
    }

    /// Register a signal handler. Buffered signals for the name are drained
    /// through it immediately.
    pub fn set_signal_handler(&self, name: &str, handler: impl Fn(Payload) + 'static) {
        let handler: Rc<dyn Fn(Payload)> = Rc::new(handler);
        let buffered = {
            let mut state = self.state.borrow_mut();
            state
                .signal_handlers
                .insert(name.to_string(), Rc::clone(&handler));
            state.buffered_signals.remove(name).unwrap_or_default()
        };
        for payload in buffered {
            handler(payload);
        }
    }

    /// Register a query handler.
    pub fn set_query_handler(
        &self,
        name: &str,
        handler: impl Fn(Payload) -> Result<Payload, WorkflowFailure> + 'static,
    ) {
        self.state
            .borrow_mut()
            .query_handlers
            .insert(name.to_string(), Rc::new(handler));
    }

    /// Schedule an activity on the orchestration service.
    pub fn schedule_activity(
        &self,
        activity_type: &str,
        arguments: Option<Payload>,
    ) -> ActivityFuture {
        let mut state = self.state.borrow_mut();
        let seq = state.sequences.next(SeqKind::Activity);
        let (tx, rx) = oneshot::channel();
        state.sequences.register(SeqKind::Activity, seq, tx);
        state.commands.push(WorkflowCommand::schedule_activity(
            seq,
            activity_type,
            arguments,
        ));
        ActivityFuture {
            seq,
            recv: CompletionRecv::new(rx),
        }
    }

    /// Request cancellation of a previously scheduled activity. The activity
    /// may still complete; the resolution job reports the final status.
    pub fn request_cancel_activity(&self, seq: u32) {
        self.state
            .borrow_mut()
            .commands
            .push(WorkflowCommand::request_cancel_activity(seq));
    }

    /// Start a child workflow execution.
    pub fn start_child_workflow(
        &self,
        workflow_type: &str,
        workflow_id: &str,
        input: Option<Payload>,
    ) -> ChildWorkflowFuture {
        let mut state = self.state.borrow_mut();
        let seq = state.sequences.next(SeqKind::ChildWorkflow);
        let (tx, rx) = oneshot::channel();
        state.sequences.register(SeqKind::ChildWorkflow, seq, tx);
        state.commands.push(WorkflowCommand::start_child_workflow(
            seq,
            workflow_type,
            workflow_id,
            input,
        ));
        ChildWorkflowFuture {
            seq,
            recv: CompletionRecv::new(rx),
        }
    }

    /// Signal another workflow execution.
    pub fn signal_external_workflow(
        &self,
        workflow_id: &str,
        signal_name: &str,
        arguments: Option<Payload>,
    ) -> SignalExternalFuture {
        let mut state = self.state.borrow_mut();
        let seq = state.sequences.next(SeqKind::SignalWorkflowExternal);
        let (tx, rx) = oneshot::channel();
        state
            .sequences
            .register(SeqKind::SignalWorkflowExternal, seq, tx);
        state
            .commands
            .push(WorkflowCommand::signal_external_workflow(
                seq,
                workflow_id,
                signal_name,
                arguments,
            ));
        SignalExternalFuture {
            seq,
            recv: CompletionRecv::new(rx),
        }
    }

    /// Request cancellation of another workflow execution.
    pub fn request_cancel_external_workflow(&self, workflow_id: &str) -> SignalExternalFuture {
        let mut state = self.state.borrow_mut();
        let seq = state.sequences.next(SeqKind::CancelWorkflowExternal);
        let (tx, rx) = oneshot::channel();
        state
            .sequences
            .register(SeqKind::CancelWorkflowExternal, seq, tx);
        state
            .commands
            .push(WorkflowCommand::request_cancel_external_workflow(
                seq,
                workflow_id,
            ));
        SignalExternalFuture {
            seq,
            recv: CompletionRecv::new(rx),
        }
    }

    /// Finish this run and start a fresh execution with new input. The
    /// workflow function should return promptly afterwards; its return value
    /// is ignored because the run is already terminal.
    pub fn continue_as_new(&self, workflow_type: &str, input: Option<Payload>) {
        let mut state = self.state.borrow_mut();
        if state.completed {
            return;
        }
        state
            .commands
            .push(WorkflowCommand::continue_as_new(workflow_type, input));
        state.completed = true;
    }

    /// Invoke an injected external dependency. The shape of the return value
    /// depends on the apply mode the dependency was injected with.
    pub fn call_dependency(
        &self,
        iface_name: &str,
        fn_name: &str,
        args: Vec<Value>,
    ) -> Result<DependencyCall, WorkflowFailure> {
        let (mode, handler) = {
            let state = self.state.borrow();
            state
                .dependencies
                .lookup(iface_name, fn_name)
                .ok_or_else(|| {
                    WorkflowFailure::application(format!(
                        "unknown external dependency {iface_name}.{fn_name}"
                    ))
                })?
        };

        match mode {
            ApplyMode::Async => {
                let mut state = self.state.borrow_mut();
                let seq = state.sequences.next(SeqKind::Dependency);
                let (tx, rx) = oneshot::channel();
                state.sequences.register(SeqKind::Dependency, seq, tx);
                state.dependencies.queue(PendingExternalCall {
                    iface_name: iface_name.to_string(),
                    fn_name: fn_name.to_string(),
                    args,
                    seq: Some(seq),
                });
                Ok(DependencyCall::Pending(ExternalCallFuture {
                    seq: Some(seq),
                    recv: CompletionRecv::new(rx),
                }))
            }
            ApplyMode::AsyncIgnored => {
                self.state.borrow_mut().dependencies.queue(PendingExternalCall {
                    iface_name: iface_name.to_string(),
                    fn_name: fn_name.to_string(),
                    args,
                    seq: None,
                });
                Ok(DependencyCall::Ignored)
            }
            ApplyMode::Sync => {
                let handler = require_handler(handler, iface_name, fn_name)?;
                let value = handler(&args).map_err(WorkflowFailure::application)?;
                Ok(DependencyCall::Ready(value))
            }
            ApplyMode::SyncPromise => {
                let handler = require_handler(handler, iface_name, fn_name)?;
                let outcome = match handler(&args) {
                    Ok(value) => Payload::json(&value)
                        .map_err(|e| WorkflowFailure::application(e.to_string())),
                    Err(message) => Err(WorkflowFailure::application(message)),
                };
                let (tx, rx) = oneshot::channel();
                let _ = tx.send(outcome);
                Ok(DependencyCall::Pending(ExternalCallFuture {
                    seq: None,
                    recv: CompletionRecv::new(rx),
                }))
            }
            ApplyMode::SyncIgnored => {
                let handler = require_handler(handler, iface_name, fn_name)?;
                let _ = handler(&args);
                Ok(DependencyCall::Ignored)
            }
        }
    }

    /// Whether cancellation of this run has been requested.
    pub fn cancellation_requested(&self) -> bool {
        self.state.borrow().cancellation_requested
    }

    /// Await cancellation of this run. Resolves immediately if already
    /// requested.
    pub fn cancelled(&self) -> CancellationFuture {
        let mut state = self.state.borrow_mut();
        if state.cancellation_requested {
            return CancellationFuture { rx: None, done: true };
        }
        let (tx, rx) = oneshot::channel();
        state.cancellation_waiters.push(tx);
        CancellationFuture {
            rx: Some(rx),
            done: false,
        }
    }

    /// Whether a patch is active for this run. During replay only patches
    /// announced by `notify_has_patch` report true; outside replay a patch
    /// is recorded as in use and reports true.
    pub fn patched(&self, patch_id: &str) -> bool {
        let mut state = self.state.borrow_mut();
        if state.info.is_replaying {
            state.notified_patches.contains(patch_id)
        } else {
            state.notified_patches.insert(patch_id.to_string());
            true
        }
    }

    /// GC-observing maps are forbidden in workflow code: collection timing
    /// differs between original execution and replay. Construction always
    /// fails with a determinism violation.
    pub fn weak_map<K, V>(&self) -> Result<WeakMap<K, V>, WorkflowFailure> {
        Err(WorkflowFailure::determinism_violation(
            "WeakMap cannot be used in workflows: garbage-collection timing is not replay-safe",
        ))
    }

    /// See [`WorkflowEnv::weak_map`].
    pub fn weak_set<T>(&self) -> Result<WeakSet<T>, WorkflowFailure> {
        Err(WorkflowFailure::determinism_violation(
            "WeakSet cannot be used in workflows: garbage-collection timing is not replay-safe",
        ))
    }

    /// See [`WorkflowEnv::weak_map`].
    pub fn weak_ref<T>(&self) -> Result<WeakRef<T>, WorkflowFailure> {
        Err(WorkflowFailure::determinism_violation(
            "WeakRef cannot be used in workflows: garbage-collection timing is not replay-safe",
        ))
    }
}

fn require_handler(
    handler: Option<crate::runtime::dependencies::SyncHandler>,
    iface_name: &str,
    fn_name: &str,
) -> Result<crate::runtime::dependencies::SyncHandler, WorkflowFailure> {
    handler.ok_or_else(|| {
        WorkflowFailure::application(format!(
            "dependency {iface_name}.{fn_name} was injected without an in-process handler"
        ))
    })
}

/// Uninhabitable stand-in for a GC-observing map; see
/// [`WorkflowEnv::weak_map`].
pub struct WeakMap<K, V> {
    _marker: PhantomData<(K, V)>,
}

/// Uninhabitable stand-in for a GC-observing set; see
/// [`WorkflowEnv::weak_map`].
pub struct WeakSet<T> {
    _marker: PhantomData<T>,
}

/// Uninhabitable stand-in for a GC-observing reference; see
/// [`WorkflowEnv::weak_map`].
pub struct WeakRef<T> {
    _marker: PhantomData<T>,
}

/// Receiver half of a registered completion. A dropped sender (a silently
/// cancelled timer, an evicted run) leaves the waiter suspended forever
/// rather than erroring.
struct CompletionRecv {
    rx: Option<oneshot::Receiver<CompletionValue>>,
}

impl CompletionRecv {
    fn new(rx: oneshot::Receiver<CompletionValue>) -> Self {
        Self { rx: Some(rx) }
    }

    fn poll_value(&mut self, cx: &mut Context<'_>) -> Poll<CompletionValue> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Pending;
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(value)) => {
                self.rx = None;
                Poll::Ready(value)
            }
            Poll::Ready(Err(_)) => {
                self.rx = None;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Future returned by [`WorkflowEnv::sleep`].
pub struct TimerFuture {
    seq: u32,
    recv: CompletionRecv,
}

impl TimerFuture {
    /// Sequence handle usable with [`WorkflowEnv::cancel_timer`].
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

impl Future for TimerFuture {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.recv.poll_value(cx) {
            Poll::Ready(_) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Future returned by [`WorkflowEnv::schedule_activity`].
pub struct ActivityFuture {
    seq: u32,
    recv: CompletionRecv,
}

impl ActivityFuture {
    /// Sequence handle usable with [`WorkflowEnv::request_cancel_activity`].
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

impl Future for ActivityFuture {
    type Output = Result<Payload, WorkflowFailure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.recv.poll_value(cx)
    }
}

/// Future returned by [`WorkflowEnv::start_child_workflow`].
pub struct ChildWorkflowFuture {
    seq: u32,
    recv: CompletionRecv,
}

impl ChildWorkflowFuture {
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

impl Future for ChildWorkflowFuture {
    type Output = Result<Payload, WorkflowFailure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.recv.poll_value(cx)
    }
}

/// Future returned by [`WorkflowEnv::signal_external_workflow`] and
/// [`WorkflowEnv::request_cancel_external_workflow`].
pub struct SignalExternalFuture {
    seq: u32,
    recv: CompletionRecv,
}

impl SignalExternalFuture {
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

impl Future for SignalExternalFuture {
    type Output = Result<(), WorkflowFailure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.recv.poll_value(cx) {
            Poll::Ready(Ok(_)) => Poll::Ready(Ok(())),
            Poll::Ready(Err(failure)) => Poll::Ready(Err(failure)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Future returned by [`WorkflowEnv::next_signal`].
pub struct SignalFuture {
    seq: u32,
    recv: CompletionRecv,
}

impl SignalFuture {
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

impl Future for SignalFuture {
    type Output = Payload;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.recv.poll_value(cx) {
            Poll::Ready(Ok(payload)) => Poll::Ready(payload),
            // signals are never delivered as failures
            Poll::Ready(Err(_)) => Poll::Pending,
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Future returned for `Async` and `SyncPromise` dependency calls.
pub struct ExternalCallFuture {
    seq: Option<u32>,
    recv: CompletionRecv,
}

impl ExternalCallFuture {
    /// Correlation sequence; absent for `SyncPromise` calls, which never
    /// leave the process.
    pub fn seq(&self) -> Option<u32> {
        self.seq
    }
}

impl Future for ExternalCallFuture {
    type Output = Result<Value, WorkflowFailure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.recv.poll_value(cx) {
            Poll::Ready(Ok(payload)) => Poll::Ready(
                payload
                    .deserialize::<Value>()
                    .map_err(|e| WorkflowFailure::application(e.to_string())),
            ),
            Poll::Ready(Err(failure)) => Poll::Ready(Err(failure)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Future returned by [`WorkflowEnv::condition`].
pub struct ConditionFuture {
    seq: u32,
    rx: Option<oneshot::Receiver<()>>,
}

impl ConditionFuture {
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

impl Future for ConditionFuture {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Pending;
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(())) => {
                self.rx = None;
                Poll::Ready(())
            }
            Poll::Ready(Err(_)) => {
                self.rx = None;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Future returned by [`WorkflowEnv::cancelled`].
pub struct CancellationFuture {
    rx: Option<oneshot::Receiver<()>>,
    done: bool,
}

impl Future for CancellationFuture {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.done {
            return Poll::Ready(());
        }
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Pending;
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(())) => {
                self.rx = None;
                self.done = true;
                Poll::Ready(())
            }
            Poll::Ready(Err(_)) => {
                self.rx = None;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
