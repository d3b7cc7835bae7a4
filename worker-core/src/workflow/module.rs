//! Workflow code modules and the host-installed loader.
//!
//! The runtime never discovers code on its own: the host installs a
//! [`ModuleLoader`] before `init_runtime`, and the runtime resolves both the
//! workflow bundle (the module at [`MAIN_MODULE`]) and any interceptor
//! modules through it.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use weft_core::{CoreResult, Payload};

use crate::runtime::interceptors::WorkflowInterceptors;
use crate::workflow::env::WorkflowEnv;
use crate::workflow::failure::WorkflowFailure;

/// Path under which the loader must expose the workflow bundle itself.
pub const MAIN_MODULE: &str = "main";

/// Future type returned by workflow functions. Workflow futures live on the
/// runtime's single-threaded scheduler and are deliberately not `Send`.
pub type WorkflowFuture = Pin<Box<dyn Future<Output = Result<Payload, WorkflowFailure>>>>;

/// A workflow entry point: invoked with the environment handle and the start
/// input, produces the workflow result.
pub type WorkflowFunction = Rc<dyn Fn(WorkflowEnv, Payload) -> WorkflowFuture>;

/// Factory producing a fresh interceptor set; what an interceptor module
/// exports under `interceptors`.
pub type InterceptorFactory = Box<dyn Fn() -> WorkflowInterceptors>;

/// Loader installed by the host; resolves module paths to loaded modules.
pub type ModuleLoader = Box<dyn Fn(&str) -> CoreResult<WorkflowModule>>;

/// A loaded code module: workflow entry points by type name plus an optional
/// interceptor factory.
#[derive(Default)]
pub struct WorkflowModule {
    pub workflows: HashMap<String, WorkflowFunction>,
    pub interceptors: Option<InterceptorFactory>,
}

impl WorkflowModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workflow entry point under a type name.
    pub fn with_workflow<F>(mut self, workflow_type: impl Into<String>, workflow: F) -> Self
    where
        F: Fn(WorkflowEnv, Payload) -> WorkflowFuture + 'static,
    {
        self.workflows
            .insert(workflow_type.into(), Rc::new(workflow));
        self
    }

    /// Attach the module's interceptor factory.
    pub fn with_interceptors<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> WorkflowInterceptors + 'static,
    {
        self.interceptors = Some(Box::new(factory));
        self
    }
}
