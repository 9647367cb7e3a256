//! The line a single generation is responsible for.

/// Description used when no line has been accepted on this branch.
pub const NO_COMMAND: &str = "with no command, so exiting";

/// Printed instead of an undo message when the root is asked to undo and the
/// policy is [`crate::core::types::RootUndo::Ignore`].
pub const NOTHING_TO_UNDO: &str = "nothing to undo";

/// Per-generation record of the accepted line.
///
/// Owned by exactly one [`crate::core::context::ExecutionContext`]; a forked
/// child gets its own copy along with the rest of the process image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLedger {
    entry: Option<String>,
}

impl CommandLedger {
    pub fn record(&mut self, line: String) {
        self.entry = Some(line);
    }

    pub fn last_command(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    /// The recorded line, or [`NO_COMMAND`].
    pub fn describe(&self) -> &str {
        self.last_command().unwrap_or(NO_COMMAND)
    }

    pub fn release(&mut self) {
        self.entry = None;
    }
}

/// Message printed right before a generation exits with the undo code.
pub fn undo_message(ledger: &CommandLedger) -> String {
    format!("undoing '{}'", ledger.describe())
}
