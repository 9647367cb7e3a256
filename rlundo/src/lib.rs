//! Fork-based undo for line-oriented interactive programs.
//!
//! Every line a host program reads is a checkpoint: the process forks, the
//! child continues with the line, and the parent waits. Typing `undo` makes
//! the live process exit with a reserved code so its parent, still holding the
//! exact memory image from before that line, reads a new one instead.
//!
//! - **[`core`]**: Pure, deterministic logic (line classification, exit-signal
//!   resolution, the per-generation ledger). No I/O.
//! - **[`io`]**: Side-effecting seams (fork/wait, line readers, the genuine
//!   `readline` resolver, configuration). Traits keep them mockable.
//!
//! [`checkpoint`] combines the two into the state machine that the preload
//! library and the `undoable` host run on every line read.

pub mod checkpoint;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
