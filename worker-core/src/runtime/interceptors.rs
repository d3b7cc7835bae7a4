//! Composable middleware around the runtime's internal operations.
//!
//! Two hooks exist: `activate` and `conclude`. Middlewares are folded around
//! the base handler innermost-last, so the first registered interceptor is
//! the outermost. The `inbound` and `outbound` lists are registered here but
//! interpreted only by higher-level workflow APIs.

use std::rc::Rc;

use weft_core::{CoreResult, WorkflowActivation, WorkflowCommand};

use crate::runtime::ActivationResponse;

/// Marker for interceptors of inbound workflow calls (signals, queries).
/// Held for higher layers; the core does not invoke these.
pub trait InboundInterceptor {}

/// Marker for interceptors of outbound workflow calls (activities, timers).
/// Held for higher layers; the core does not invoke these.
pub trait OutboundInterceptor {}

/// Middleware around the runtime-internal `activate` and `conclude`
/// operations. Both methods default to passthrough.
pub trait InternalsInterceptor {
    fn activate(
        &self,
        activation: WorkflowActivation,
        batch_index: u32,
        next: ActivateNext<'_>,
    ) -> CoreResult<ActivationResponse> {
        next.run(activation, batch_index)
    }

    fn conclude(
        &self,
        commands: Vec<WorkflowCommand>,
        next: ConcludeNext<'_>,
    ) -> CoreResult<Vec<WorkflowCommand>> {
        next.run(commands)
    }
}

/// Interceptor sets contributed by one interceptor module.
#[derive(Default)]
pub struct WorkflowInterceptors {
    pub inbound: Vec<Rc<dyn InboundInterceptor>>,
    pub outbound: Vec<Rc<dyn OutboundInterceptor>>,
    pub internals: Vec<Rc<dyn InternalsInterceptor>>,
}

impl WorkflowInterceptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_internals(mut self, interceptor: impl InternalsInterceptor + 'static) -> Self {
        self.internals.push(Rc::new(interceptor));
        self
    }

    /// Append another module's interceptors, preserving registration order.
    pub fn extend(&mut self, other: WorkflowInterceptors) {
        self.inbound.extend(other.inbound);
        self.outbound.extend(other.outbound);
        self.internals.extend(other.internals);
    }
}

/// Continuation handed to an `activate` middleware.
pub struct ActivateNext<'a> {
    pub(crate) chain: &'a [Rc<dyn InternalsInterceptor>],
    pub(crate) base:
        &'a mut dyn FnMut(WorkflowActivation, u32) -> CoreResult<ActivationResponse>,
}

impl<'a> ActivateNext<'a> {
    pub fn run(
        self,
        activation: WorkflowActivation,
        batch_index: u32,
    ) -> CoreResult<ActivationResponse> {
        match self.chain.split_first() {
            Some((head, rest)) => head.activate(
                activation,
                batch_index,
                ActivateNext {
                    chain: rest,
                    base: self.base,
                },
            ),
            None => (self.base)(activation, batch_index),
        }
    }
}

/// Continuation handed to a `conclude` middleware.
pub struct ConcludeNext<'a> {
    pub(crate) chain: &'a [Rc<dyn InternalsInterceptor>],
    pub(crate) base: &'a mut dyn FnMut(Vec<WorkflowCommand>) -> CoreResult<Vec<WorkflowCommand>>,
}

impl<'a> ConcludeNext<'a> {
    pub fn run(self, commands: Vec<WorkflowCommand>) -> CoreResult<Vec<WorkflowCommand>> {
        match self.chain.split_first() {
            Some((head, rest)) => head.conclude(
                commands,
                ConcludeNext {
                    chain: rest,
                    base: self.base,
                },
            ),
            None => (self.base)(commands),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Tagger {
        tag: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl InternalsInterceptor for Tagger {
        fn conclude(
            &self,
            commands: Vec<WorkflowCommand>,
            next: ConcludeNext<'_>,
        ) -> CoreResult<Vec<WorkflowCommand>> {
            self.log.borrow_mut().push(format!("{}:before", self.tag));
            let result = next.run(commands);
            self.log.borrow_mut().push(format!("{}:after", self.tag));
            result
        }
    }

    #[test]
    fn test_first_registered_is_outermost() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let chain: Vec<Rc<dyn InternalsInterceptor>> = vec![
            Rc::new(Tagger {
                tag: "outer",
                log: Rc::clone(&log),
            }),
            Rc::new(Tagger {
                tag: "inner",
                log: Rc::clone(&log),
            }),
        ];

        let mut base = |commands: Vec<WorkflowCommand>| -> CoreResult<Vec<WorkflowCommand>> {
            log.borrow_mut().push("base".to_string());
            Ok(commands)
        };
        ConcludeNext {
            chain: &chain,
            base: &mut base,
        }
        .run(vec![])
        .unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["outer:before", "inner:before", "base", "inner:after", "outer:after"]
        );
    }

    #[test]
    fn test_middleware_can_rewrite_commands() {
        struct AppendTimer;
        impl InternalsInterceptor for AppendTimer {
            fn conclude(
                &self,
                mut commands: Vec<WorkflowCommand>,
                next: ConcludeNext<'_>,
            ) -> CoreResult<Vec<WorkflowCommand>> {
                commands.push(WorkflowCommand::start_timer(99, 1));
                next.run(commands)
            }
        }

        let chain: Vec<Rc<dyn InternalsInterceptor>> = vec![Rc::new(AppendTimer)];
        let mut base =
            |commands: Vec<WorkflowCommand>| -> CoreResult<Vec<WorkflowCommand>> { Ok(commands) };
        let out = ConcludeNext {
            chain: &chain,
            base: &mut base,
        }
        .run(vec![WorkflowCommand::complete_workflow(None)])
        .unwrap();

        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_empty_chain_invokes_base_directly() {
        let chain: Vec<Rc<dyn InternalsInterceptor>> = vec![];
        let mut called = false;
        let mut base = |commands: Vec<WorkflowCommand>| -> CoreResult<Vec<WorkflowCommand>> {
            called = true;
            Ok(commands)
        };
        ConcludeNext {
            chain: &chain,
            base: &mut base,
        }
        .run(vec![])
        .unwrap();
        assert!(called);
    }
}
