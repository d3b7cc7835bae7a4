//! Single-threaded cooperative task scheduler.
//!
//! All workflow code runs here: one task per spawned workflow future,
//! interleaving only at await points. `run_until_stalled` polls ready tasks
//! until none can make progress, which is the runtime's notion of "the
//! microtask queue is empty". Wakers only touch the ready queue, so they
//! stay `Send + Sync` while the task futures themselves remain local to the
//! runtime thread.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use parking_lot::Mutex;

/// Observer for task lifecycle events.
///
/// This is the runtime's rendition of the isolate extension's promise-hook
/// instrumentation: higher layers use it to track cancellation scopes. The
/// core only reports spawn and completion.
pub trait TaskHook {
    fn on_task_spawned(&self, task_id: u64);
    fn on_task_completed(&self, task_id: u64);
}

type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

#[derive(Default)]
struct ReadyQueue {
    queue: Mutex<VecDeque<u64>>,
}

impl ReadyQueue {
    fn push(&self, task_id: u64) {
        self.queue.lock().push_back(task_id);
    }

    fn pop(&self) -> Option<u64> {
        self.queue.lock().pop_front()
    }

    fn clear(&self) {
        self.queue.lock().clear();
    }
}

struct TaskWaker {
    task_id: u64,
    ready: Arc<ReadyQueue>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.ready.push(self.task_id);
    }
}

#[derive(Default)]
pub(crate) struct Scheduler {
    tasks: HashMap<u64, LocalFuture>,
    ready: Arc<ReadyQueue>,
    next_task_id: u64,
    hook: Option<Arc<dyn TaskHook>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hook(&mut self, hook: Option<Arc<dyn TaskHook>>) {
        self.hook = hook;
    }

    /// Spawn a task; it becomes ready immediately.
    pub fn spawn(&mut self, future: impl Future<Output = ()> + 'static) {
        let task_id = self.next_task_id;
        self.next_task_id += 1;
        self.tasks.insert(task_id, Box::pin(future));
        self.ready.push(task_id);
        if let Some(hook) = &self.hook {
            hook.on_task_spawned(task_id);
        }
    }

    /// Poll ready tasks until the queue is empty. Tasks woken while this
    /// runs are picked up in the same call, so returning means no task can
    /// make progress without new external input.
    pub fn run_until_stalled(&mut self) {
        while let Some(task_id) = self.ready.pop() {
            // A stale wake for a task that already completed.
            let Some(mut task) = self.tasks.remove(&task_id) else {
                continue;
            };
            let waker = Waker::from(Arc::new(TaskWaker {
                task_id,
                ready: Arc::clone(&self.ready),
            }));
            let mut cx = Context::from_waker(&waker);
            match task.as_mut().poll(&mut cx) {
                Poll::Ready(()) => {
                    if let Some(hook) = &self.hook {
                        hook.on_task_completed(task_id);
                    }
                }
                Poll::Pending => {
                    self.tasks.insert(task_id, task);
                }
            }
        }
    }

    /// Drop every task and pending wake. Used on eviction.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.ready.clear();
    }

    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tokio::sync::oneshot;

    #[test]
    fn test_spawned_task_runs_to_completion() {
        let mut scheduler = Scheduler::new();
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);

        scheduler.spawn(async move {
            flag.set(true);
        });
        scheduler.run_until_stalled();

        assert!(ran.get());
        assert!(!scheduler.has_tasks());
    }

    #[test]
    fn test_suspended_task_stays_pending_until_woken() {
        let mut scheduler = Scheduler::new();
        let (tx, rx) = oneshot::channel::<u32>();
        let seen = Rc::new(Cell::new(0));
        let out = Rc::clone(&seen);

        scheduler.spawn(async move {
            if let Ok(v) = rx.await {
                out.set(v);
            }
        });
        scheduler.run_until_stalled();
        assert!(scheduler.has_tasks());
        assert_eq!(seen.get(), 0);

        tx.send(7).unwrap();
        scheduler.run_until_stalled();
        assert!(!scheduler.has_tasks());
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn test_wake_chain_drains_in_one_call() {
        let mut scheduler = Scheduler::new();
        let (tx1, rx1) = oneshot::channel::<()>();
        let (tx2, rx2) = oneshot::channel::<()>();
        let done = Rc::new(Cell::new(false));
        let flag = Rc::clone(&done);

        // second task completes only after the first forwards the signal
        scheduler.spawn(async move {
            if rx1.await.is_ok() {
                let _ = tx2.send(());
            }
        });
        scheduler.spawn(async move {
            if rx2.await.is_ok() {
                flag.set(true);
            }
        });
        scheduler.run_until_stalled();
        assert!(!done.get());

        tx1.send(()).unwrap();
        scheduler.run_until_stalled();
        assert!(done.get());
    }

    #[test]
    fn test_hook_observes_spawn_and_completion() {
        #[derive(Default)]
        struct Recorder {
            spawned: Mutex<Vec<u64>>,
            completed: Mutex<Vec<u64>>,
        }
        impl TaskHook for Recorder {
            fn on_task_spawned(&self, task_id: u64) {
                self.spawned.lock().push(task_id);
            }
            fn on_task_completed(&self, task_id: u64) {
                self.completed.lock().push(task_id);
            }
        }

        let recorder = Arc::new(Recorder::default());
        let mut scheduler = Scheduler::new();
        scheduler.set_hook(Some(recorder.clone()));

        scheduler.spawn(async {});
        scheduler.spawn(async {});
        scheduler.run_until_stalled();

        assert_eq!(*recorder.spawned.lock(), vec![0, 1]);
        assert_eq!(*recorder.completed.lock(), vec![0, 1]);
    }

    #[test]
    fn test_clear_drops_pending_tasks() {
        let mut scheduler = Scheduler::new();
        let (_tx, rx) = oneshot::channel::<()>();
        scheduler.spawn(async move {
            let _ = rx.await;
        });
        scheduler.run_until_stalled();
        assert!(scheduler.has_tasks());

        scheduler.clear();
        assert!(!scheduler.has_tasks());
    }
}
