//! Shared deterministic types for engine policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What `undo` does when no line has been accepted by the entire chain.
///
/// At the root there is no ancestor to receive
/// [`crate::exit_codes::UNDO_REQUESTED`], so exiting with it would leak the
/// reserved code to whatever launched the program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootUndo {
    /// Print a notice and read another line.
    #[default]
    Ignore,
    /// Print the undo message and exit with the reserved code.
    Exit,
}

impl RootUndo {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Exit => "exit",
        }
    }
}

impl fmt::Display for RootUndo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RootUndo {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "exit" => Ok(Self::Exit),
            other => Err(format!(
                "unknown root undo policy {other:?} (expected \"ignore\" or \"exit\")"
            )),
        }
    }
}
