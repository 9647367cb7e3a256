//! Interpretation of a terminated child's exit status.

use crate::exit_codes;

/// How a child in the checkpoint chain terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    /// Exited with [`exit_codes::UNDO_REQUESTED`].
    UndoRequested,
    /// Exited with code 0 (end of input somewhere below).
    CleanExit,
    /// Exited deliberately with any other code.
    Passthrough(i32),
    /// Killed by a signal, or otherwise did not exit normally.
    Abnormal,
}

impl ExitSignal {
    /// Classify a normal exit code.
    pub fn from_code(code: i32) -> Self {
        match code {
            exit_codes::UNDO_REQUESTED => Self::UndoRequested,
            exit_codes::OK => Self::CleanExit,
            code => Self::Passthrough(code),
        }
    }
}

/// What a waiting parent does once its child is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Roll back: read a fresh line in this same process.
    Reread,
    /// Terminate with this code, relaying it to our own parent.
    Terminate(i32),
}

/// Map a child's exit signal to the parent's next move.
///
/// Abnormal termination becomes [`exit_codes::FAILURE`] so the whole chain is
/// torn down instead of leaving ancestors blocked.
pub fn resolve(signal: ExitSignal) -> Resume {
    match signal {
        ExitSignal::UndoRequested => Resume::Reread,
        ExitSignal::CleanExit => Resume::Terminate(exit_codes::OK),
        ExitSignal::Passthrough(code) => Resume::Terminate(code),
        ExitSignal::Abnormal => Resume::Terminate(exit_codes::FAILURE),
    }
}
