//! The checkpoint state machine behind every intercepted line read.
//!
//! Each accepted line forks the process: the child carries on as the host,
//! the parent blocks until the child is gone. A child that reads `undo` exits
//! with [`exit_codes::UNDO_REQUESTED`], and its parent simply reads again with
//! its memory exactly as it was before the undone line. Any other exit code is
//! relayed upward unchanged, one generation at a time.
//!
//! ```text
//! Read      -> Classify
//! Classify  -> CascadeExit(0)        end of input
//!           -> CascadeExit(42)       undo
//!           -> Read                  undo at the root, policy `ignore`
//!           -> Fork                  any other line
//! Fork      -> (return line)         child
//!           -> ParentWait            parent
//! ParentWait-> Read                  child requested undo
//!           -> CascadeExit(code)     any other exit
//! ```

use nix::unistd::Pid;
use tracing::{debug, info, instrument};

use crate::core::classify::{LineKind, classify};
use crate::core::context::ExecutionContext;
use crate::core::ledger::{NOTHING_TO_UNDO, undo_message};
use crate::core::signal::{Resume, resolve};
use crate::core::types::RootUndo;
use crate::error::CheckpointError;
use crate::exit_codes;
use crate::io::config::UndoConfig;
use crate::io::process::{Branch, ProcessControl};
use crate::io::reader::LineReader;

/// Result of one intercepted read.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<L> {
    /// This process is the new live leaf; give the line to the host.
    Line(L),
    /// This process must now terminate with the given code.
    Exit(i32),
}

enum State<L> {
    Read,
    Classify(Option<L>),
    Fork(L),
    ParentWait(Pid),
    CascadeExit(i32),
}

/// Drives the checkpoint chain for one process generation.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    context: ExecutionContext,
    root_undo: RootUndo,
}

impl CheckpointManager {
    /// Start as the root of a new chain.
    pub fn new(config: &UndoConfig) -> Self {
        Self::with_context(ExecutionContext::root(std::process::id()), config)
    }

    pub fn with_context(context: ExecutionContext, config: &UndoConfig) -> Self {
        Self {
            context,
            root_undo: config.root_undo,
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Read one line on behalf of the host.
    ///
    /// Returns only in the process that should keep running host logic with
    /// the line, or with the exit code the current process must terminate
    /// with. Fork, wait, and output failures are returned as errors; the
    /// caller must not continue the host after one.
    #[instrument(skip_all, fields(depth = self.context.depth()))]
    pub fn read_line<R, P>(
        &mut self,
        reader: &mut R,
        process: &mut P,
    ) -> Result<Outcome<R::Line>, CheckpointError>
    where
        R: LineReader,
        P: ProcessControl,
    {
        let mut state = State::Read;
        loop {
            state = match state {
                State::Read => State::Classify(reader.read_line()?),
                State::Classify(line) => {
                    let kind = classify(line.as_ref().map(|line| line.as_ref()));
                    match (kind, line) {
                        (LineKind::Accept, Some(line)) => State::Fork(line),
                        (LineKind::Undo, _) => self.undo(process)?,
                        _ => self.end_of_input(process)?,
                    }
                }
                State::Fork(line) => match process.fork()? {
                    Branch::Child => {
                        let text = String::from_utf8_lossy(line.as_ref()).into_owned();
                        self.context.descend(process.id(), text);
                        debug!(
                            pid = self.context.pid(),
                            depth = self.context.depth(),
                            "accepted line"
                        );
                        return Ok(Outcome::Line(line));
                    }
                    Branch::Parent(child) => {
                        // The child owns the accepted line from here on.
                        drop(line);
                        State::ParentWait(child)
                    }
                },
                State::ParentWait(child) => match resolve(process.wait(child)?) {
                    Resume::Reread => {
                        info!(depth = self.context.depth(), "rolled back");
                        State::Read
                    }
                    Resume::Terminate(code) => State::CascadeExit(code),
                },
                State::CascadeExit(code) => {
                    self.context.retire();
                    return Ok(Outcome::Exit(code));
                }
            };
        }
    }

    fn undo<L, P: ProcessControl>(&mut self, process: &mut P) -> Result<State<L>, CheckpointError> {
        if self.context.is_root() && self.root_undo == RootUndo::Ignore {
            process.emit(NOTHING_TO_UNDO)?;
            return Ok(State::Read);
        }
        process.emit(&undo_message(self.context.ledger()))?;
        Ok(State::CascadeExit(exit_codes::UNDO_REQUESTED))
    }

    fn end_of_input<L, P: ProcessControl>(
        &mut self,
        process: &mut P,
    ) -> Result<State<L>, CheckpointError> {
        debug!(depth = self.context.depth(), "end of input");
        process.emit("")?;
        Ok(State::CascadeExit(exit_codes::OK))
    }
}
