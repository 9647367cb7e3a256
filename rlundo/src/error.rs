//! Errors raised by the checkpoint engine.

use nix::errno::Errno;
use thiserror::Error;

/// Failures that stop a generation from continuing.
///
/// All of these are fatal for the process that hits them: callers report the
/// error and terminate with [`crate::exit_codes::FAILURE`], which the parent
/// then relays like any other exit code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckpointError {
    /// Process duplication failed (typically resource exhaustion).
    #[error("failed to fork checkpoint: {0}")]
    Fork(#[source] Errno),

    /// A new generation could not arrange to die with its parent.
    #[error("failed to bind checkpoint to its parent: {0}")]
    Bind(#[source] Errno),

    /// A new generation's parent died before the child started.
    #[error("parent generation {parent} exited before the checkpoint started")]
    Orphaned { parent: i32 },

    /// Waiting on the child generation failed.
    #[error("failed to wait for child {pid}: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: Errno,
    },

    /// The line reader itself failed (not end of input).
    #[error("failed to read line: {0}")]
    Read(#[source] std::io::Error),

    /// Writing an engine message to stdout failed.
    #[error("failed to write to stdout: {0}")]
    Output(#[source] std::io::Error),

    /// No genuine `readline` could be located.
    #[error("cannot locate genuine readline (tried {tried})")]
    Resolve { tried: String },
}
