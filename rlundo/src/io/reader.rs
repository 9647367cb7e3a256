//! Line reader abstraction and a stdin-backed implementation.

use std::io::Write;

use nix::errno::Errno;
use nix::libc;
use nix::unistd;

use crate::error::CheckpointError;

/// Source of input lines for the checkpoint engine.
///
/// The returned line is owned by the caller. `Ok(None)` means end of input.
pub trait LineReader {
    type Line: AsRef<[u8]>;

    fn read_line(&mut self) -> Result<Option<Self::Line>, CheckpointError>;
}

/// Prompting reader over file descriptor 0.
///
/// Lines are returned as raw bytes, without the trailing `\n`.
/// Reads one byte per syscall: a buffered reader would carry input that a
/// later generation consumes into every forked copy.
#[derive(Debug, Clone)]
pub struct StdinReader {
    prompt: String,
}

impl StdinReader {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl LineReader for StdinReader {
    type Line = Vec<u8>;

    fn read_line(&mut self) -> Result<Option<Vec<u8>>, CheckpointError> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{}", self.prompt).map_err(CheckpointError::Output)?;
        stdout.flush().map_err(CheckpointError::Output)?;
        drop(stdout);

        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match unistd::read(libc::STDIN_FILENO, &mut byte) {
                Ok(0) if line.is_empty() => return Ok(None),
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => line.push(byte[0]),
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(CheckpointError::Read(err.into())),
            }
        }
        Ok(Some(line))
    }
}
