//! Deterministic, pure logic shared by the checkpoint engine.
//!
//! Core modules must be free of I/O side effects. They decide what a line or a
//! child's exit status means; [`crate::checkpoint`] acts on those decisions.

pub mod classify;
pub mod context;
pub mod dispatch;
pub mod ledger;
pub mod signal;
pub mod types;
