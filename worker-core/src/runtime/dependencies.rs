//! External-dependency bridge.
//!
//! Injected dependencies are host functions workflow code may call. The
//! asynchronous apply modes defer the side effect to the host so the
//! workflow suspends deterministically; the synchronous modes are in-process
//! escape hatches for observability concerns that must not perturb
//! determinism at the host boundary.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

/// How an injected dependency call crosses the sandbox boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Queued for the host; the caller receives a future resolved on a later
    /// cycle via `resolve_external_dependencies`.
    Async,
    /// Queued for the host without a sequence number; the result is
    /// discarded.
    AsyncIgnored,
    /// Invoked synchronously in-process; the result is returned directly.
    Sync,
    /// Invoked synchronously in-process; the result is delivered through an
    /// already-resolved future.
    SyncPromise,
    /// Invoked synchronously in-process; the result is discarded.
    SyncIgnored,
}

/// In-process host function used by the synchronous apply modes.
pub type SyncHandler = Rc<dyn Fn(&[Value]) -> Result<Value, String>>;

/// A host-side call queued by the asynchronous apply modes.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingExternalCall {
    pub iface_name: String,
    pub fn_name: String,
    pub args: Vec<Value>,
    /// Absent for fire-and-forget calls.
    pub seq: Option<u32>,
}

/// Host-delivered outcome of an asynchronous external call.
#[derive(Debug, Clone)]
pub struct DependencyResolution {
    pub seq: u32,
    pub result: Result<Value, String>,
}

/// What a dependency call hands back to workflow code; shape depends on the
/// apply mode the dependency was injected with.
pub enum DependencyCall {
    /// `Async` / `SyncPromise`: await the future for the result.
    Pending(crate::workflow::env::ExternalCallFuture),
    /// `Sync`: the result, computed in-process.
    Ready(Value),
    /// `AsyncIgnored` / `SyncIgnored`: no result.
    Ignored,
}

struct DependencyStub {
    apply_mode: ApplyMode,
    handler: Option<SyncHandler>,
}

/// Two-level registry `iface -> fn -> stub`, plus the ordered queue of calls
/// awaiting host service.
#[derive(Default)]
pub(crate) struct DependencyRegistry {
    ifaces: HashMap<String, HashMap<String, DependencyStub>>,
    pending: Vec<PendingExternalCall>,
}

impl DependencyRegistry {
    pub fn inject(
        &mut self,
        iface_name: impl Into<String>,
        fn_name: impl Into<String>,
        apply_mode: ApplyMode,
        handler: Option<SyncHandler>,
    ) {
        self.ifaces.entry(iface_name.into()).or_default().insert(
            fn_name.into(),
            DependencyStub {
                apply_mode,
                handler,
            },
        );
    }

    pub fn lookup(&self, iface_name: &str, fn_name: &str) -> Option<(ApplyMode, Option<SyncHandler>)> {
        self.ifaces
            .get(iface_name)
            .and_then(|fns| fns.get(fn_name))
            .map(|stub| (stub.apply_mode, stub.handler.clone()))
    }

    pub fn queue(&mut self, call: PendingExternalCall) {
        self.pending.push(call);
    }

    pub fn take_pending(&mut self) -> Vec<PendingExternalCall> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inject_and_lookup() {
        let mut registry = DependencyRegistry::default();
        registry.inject("metrics", "emit", ApplyMode::AsyncIgnored, None);

        let (mode, handler) = registry.lookup("metrics", "emit").unwrap();
        assert_eq!(mode, ApplyMode::AsyncIgnored);
        assert!(handler.is_none());
        assert!(registry.lookup("metrics", "flush").is_none());
        assert!(registry.lookup("logger", "emit").is_none());
    }

    #[test]
    fn test_sync_handler_is_invocable() {
        let mut registry = DependencyRegistry::default();
        registry.inject(
            "math",
            "double",
            ApplyMode::Sync,
            Some(Rc::new(|args: &[Value]| {
                let n = args[0].as_i64().ok_or("not a number")?;
                Ok(json!(n * 2))
            })),
        );

        let (_, handler) = registry.lookup("math", "double").unwrap();
        let result = handler.unwrap()(&[json!(21)]).unwrap();
        assert_eq!(result, json!(42));
    }

    #[test]
    fn test_take_pending_returns_and_clears() {
        let mut registry = DependencyRegistry::default();
        registry.queue(PendingExternalCall {
            iface_name: "metrics".to_string(),
            fn_name: "emit".to_string(),
            args: vec![json!(42)],
            seq: None,
        });
        assert!(registry.has_pending());

        let calls = registry.take_pending();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].iface_name, "metrics");
        assert!(calls[0].seq.is_none());
        assert!(!registry.has_pending());
        assert!(registry.take_pending().is_empty());
    }
}
