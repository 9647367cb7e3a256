//! Choosing what the launcher actually executes.
//!
//! Most hosts are run as given with the interceptor preloaded. Some never
//! call `readline()` even though they link libreadline, so preloading does
//! nothing for them; those are refused unless an alternate command is
//! configured for them or the user forces the launch.

use std::ffi::OsString;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An alternate command to run in place of a named program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interpreter {
    /// Program file name this entry applies to (`python3`, `ipython`).
    pub program: String,
    /// Command to execute instead; the user's arguments are appended.
    pub command: Vec<String>,
    /// Whether the alternate still needs the interceptor preloaded.
    #[serde(default)]
    pub preload: bool,
}

/// Program, arguments, and whether to preload the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub preload: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("missing program to run")]
    MissingProgram,

    #[error("interpreter entry for {program} has an empty command")]
    EmptyCommand { program: String },

    #[error(
        "{program} cannot be intercepted: {reason}; configure an [[interpreters]] entry for it or pass --force"
    )]
    NotInterceptable {
        program: String,
        reason: &'static str,
    },
}

/// Why a known host bypasses `readline()`, keyed by its family name.
const BYPASSES_READLINE: &[(&str, &str)] = &[
    (
        "python",
        "CPython's readline module reads lines through rl_callback_read_char, not readline()",
    ),
    (
        "ipython",
        "IPython reads lines through prompt_toolkit, not readline()",
    ),
];

/// Reason the program bypasses `readline()`, matching `python3.12` and the
/// like by their unversioned name.
pub fn bypass_reason(program: &str) -> Option<&'static str> {
    let family = program.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
    BYPASSES_READLINE
        .iter()
        .find(|(name, _)| *name == family)
        .map(|(_, reason)| *reason)
}

/// Decide what to execute for `command` (program followed by its arguments).
pub fn plan_launch(
    command: &[OsString],
    interpreters: &[Interpreter],
    force: bool,
) -> Result<LaunchPlan, DispatchError> {
    let (program, args) = command.split_first().ok_or(DispatchError::MissingProgram)?;
    let name = Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(interp) = interpreters.iter().find(|interp| interp.program == name) {
        let (alternate, fixed) =
            interp
                .command
                .split_first()
                .ok_or_else(|| DispatchError::EmptyCommand {
                    program: interp.program.clone(),
                })?;
        let mut plan_args: Vec<OsString> = fixed.iter().map(OsString::from).collect();
        plan_args.extend(args.iter().cloned());
        return Ok(LaunchPlan {
            program: OsString::from(alternate),
            args: plan_args,
            preload: interp.preload,
        });
    }

    if !force && let Some(reason) = bypass_reason(&name) {
        return Err(DispatchError::NotInterceptable {
            program: name,
            reason,
        });
    }

    Ok(LaunchPlan {
        program: program.clone(),
        args: args.to_vec(),
        preload: true,
    })
}
