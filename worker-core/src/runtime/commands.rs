//! Command buffer for a single activation.

use weft_core::WorkflowCommand;

/// Append-only buffer of commands produced while jobs are dispatched.
/// Flushed atomically when the activation concludes; draining empties it.
#[derive(Default)]
pub(crate) struct CommandSink {
    commands: Vec<WorkflowCommand>,
}

impl CommandSink {
    pub fn push(&mut self, command: WorkflowCommand) {
        tracing::trace!(
            command = command
                .variant
                .as_ref()
                .map(|v| v.name())
                .unwrap_or("unset"),
            "recording command"
        );
        self.commands.push(command);
    }

    pub fn drain(&mut self) -> Vec<WorkflowCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
