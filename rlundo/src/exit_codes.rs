//! Stable exit codes for every process in a checkpoint chain.

/// End of input reached; the whole chain shuts down cleanly.
pub const OK: i32 = 0;
/// Generic failure: a fatal engine error, or a child that did not exit normally.
pub const FAILURE: i32 = 1;
/// `rlundo` could not find the preload library or could not exec the target.
pub const LAUNCH_FAILED: i32 = 2;
/// Reserved: a child asks its immediate parent to roll back the last line.
///
/// Consumed by the parent's wait and never meant to reach whatever launched
/// the root process.
pub const UNDO_REQUESTED: i32 = 42;
