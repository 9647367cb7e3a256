//! One process participating in the checkpoint chain.

use crate::core::ledger::CommandLedger;

/// State owned by a single generation.
///
/// A child is created by copying its parent's context (via fork) and calling
/// [`ExecutionContext::descend`]; nothing here is ever shared between
/// generations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pid: u32,
    ledger: CommandLedger,
    depth: usize,
}

impl ExecutionContext {
    /// The initial context, born from an ordinary process launch.
    pub fn root(pid: u32) -> Self {
        Self {
            pid,
            ledger: CommandLedger::default(),
            depth: 0,
        }
    }

    /// Become the child that accepted `line`.
    pub fn descend(&mut self, pid: u32, line: String) {
        self.pid = pid;
        self.ledger.record(line);
        self.depth += 1;
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn ledger(&self) -> &CommandLedger {
        &self.ledger
    }

    pub fn last_command(&self) -> Option<&str> {
        self.ledger.last_command()
    }

    /// Lines accepted so far on this branch.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// No ancestor is waiting on this process.
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Release owned state ahead of a terminal exit.
    pub fn retire(&mut self) {
        self.ledger.release();
    }
}
