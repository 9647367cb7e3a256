//! Process duplication, joins, and termination for the checkpoint chain.
//!
//! # Safety
//!
//! `fork` is unsafe because only the forking thread survives in the child.
//! The engine targets single-threaded line-oriented hosts; the child resumes
//! the host exactly where the parent would have, so no async-signal-safety
//! restriction applies beyond what the host already assumes.

#![allow(unsafe_code)]

use std::io::Write;

use nix::errno::Errno;
use nix::libc;
#[cfg(any(target_os = "linux", target_os = "android"))]
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork, getpid, getppid};
use tracing::{debug, instrument, warn};

use crate::core::signal::ExitSignal;
use crate::error::CheckpointError;
use crate::exit_codes;

/// Which side of a fork the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// The new generation.
    Child,
    /// The generation that must now wait for `child`.
    Parent(Pid),
}

/// Abstraction over the OS process operations the engine needs.
///
/// Tests use scripted implementations that decide the fork branch and the
/// child's exit signal without creating processes.
pub trait ProcessControl {
    /// Identity of the calling process.
    fn id(&self) -> u32;

    /// Duplicate the calling process.
    fn fork(&mut self) -> Result<Branch, CheckpointError>;

    /// Block until `child` terminates and classify how it did.
    fn wait(&mut self, child: Pid) -> Result<ExitSignal, CheckpointError>;

    /// Write one host-visible line to stdout.
    fn emit(&mut self, text: &str) -> Result<(), CheckpointError>;
}

/// [`ProcessControl`] backed by real `fork`/`waitpid`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForkProcess;

impl ProcessControl for ForkProcess {
    fn id(&self) -> u32 {
        std::process::id()
    }

    #[instrument(skip_all, fields(pid = std::process::id()))]
    fn fork(&mut self) -> Result<Branch, CheckpointError> {
        // Anything still buffered would otherwise be written by both sides.
        flush_all();
        let parent = getpid();

        // SAFETY: see module docs. On failure no child exists and the caller
        // treats the error as fatal.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                bind_to_parent(parent)?;
                Ok(Branch::Child)
            }
            Ok(ForkResult::Parent { child }) => {
                debug!(child = child.as_raw(), "forked checkpoint");
                Ok(Branch::Parent(child))
            }
            Err(err) => Err(CheckpointError::Fork(err)),
        }
    }

    #[instrument(skip_all, fields(child = child.as_raw()))]
    fn wait(&mut self, child: Pid) -> Result<ExitSignal, CheckpointError> {
        loop {
            match waitpid(child, None) {
                Ok(WaitStatus::Exited(_, code)) => {
                    let signal = ExitSignal::from_code(code);
                    debug!(code, ?signal, "child exited");
                    return Ok(signal);
                }
                Ok(WaitStatus::Signaled(_, sig, _)) => {
                    warn!(signal = ?sig, "child terminated by signal");
                    return Ok(ExitSignal::Abnormal);
                }
                Ok(_) => continue,
                Err(Errno::EINTR) => continue,
                Err(source) => {
                    return Err(CheckpointError::Wait {
                        pid: child.as_raw(),
                        source,
                    });
                }
            }
        }
    }

    fn emit(&mut self, text: &str) -> Result<(), CheckpointError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{text}").map_err(CheckpointError::Output)?;
        stdout.flush().map_err(CheckpointError::Output)
    }
}

/// Make a new generation die with its parent.
///
/// A generation killed from outside is reported upward as abnormal; this
/// takes its descendants down with it, so no orphaned leaf keeps reading
/// input after the chain has failed.
fn bind_to_parent(parent: Pid) -> Result<(), CheckpointError> {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    nix::sys::prctl::set_pdeathsig(Signal::SIGKILL).map_err(CheckpointError::Bind)?;

    // The parent may already be gone if it died before pdeathsig was armed.
    if getppid() != parent {
        return Err(CheckpointError::Orphaned {
            parent: parent.as_raw(),
        });
    }
    Ok(())
}

/// Flush Rust stdout/stderr and every C stdio stream.
fn flush_all() {
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
    // SAFETY: fflush(NULL) flushes all open output streams.
    unsafe {
        libc::fflush(std::ptr::null_mut());
    }
}

/// End this generation with `code`, which its parent will observe.
pub fn terminate(code: i32) -> ! {
    debug!(code, pid = std::process::id(), "terminating generation");
    flush_all();
    std::process::exit(code)
}

/// Report an engine failure and terminate with [`exit_codes::FAILURE`].
pub fn fatal(err: &dyn std::error::Error) -> ! {
    eprintln!("rlundo: {err}");
    terminate(exit_codes::FAILURE)
}
