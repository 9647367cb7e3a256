//! Side-effecting seams of the checkpoint engine.

pub mod config;
pub mod genuine;
pub mod process;
pub mod reader;
