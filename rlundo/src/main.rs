//! Launch a readline-based program with fork-based undo.
//!
//! Puts the preload library ahead of the genuine readline in the dynamic
//! loader's search order, exports the engine's configuration, and replaces
//! itself with the target program.

use std::ffi::{OsStr, OsString};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::debug;

use rlundo::core::dispatch::plan_launch;
use rlundo::core::types::RootUndo;
use rlundo::exit_codes;
use rlundo::io::config::{
    ENV_CONFIG, ENV_LOG, ENV_READLINE_LIB, ENV_ROOT_UNDO, UndoConfig, load_config,
};
use rlundo::logging;

const PRELOAD_NAME: &str = "rlundo_preload";

#[cfg(target_os = "macos")]
const PRELOAD_VAR: &str = "DYLD_INSERT_LIBRARIES";
#[cfg(not(target_os = "macos"))]
const PRELOAD_VAR: &str = "LD_PRELOAD";

#[derive(Parser)]
#[command(
    name = "rlundo",
    version,
    about = "Run a readline program so that typing `undo` rolls back the last line"
)]
struct Cli {
    /// Preload library providing the intercepting readline
    /// (default: next to this executable).
    #[arg(long, value_name = "PATH")]
    library: Option<PathBuf>,

    /// TOML config file for the engine.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// What `undo` does before any line was accepted: `ignore` or `exit`.
    #[arg(long, value_name = "POLICY")]
    root_undo: Option<RootUndo>,

    /// Library to load the genuine readline from.
    #[arg(long, value_name = "PATH")]
    readline_lib: Option<PathBuf>,

    /// Launch even if the program is known to bypass readline().
    #[arg(long)]
    force: bool,

    /// Program to run, followed by its arguments.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "PROGRAM"
    )]
    command: Vec<OsString>,
}

fn main() {
    let log = std::env::var(ENV_LOG).unwrap_or_else(|_| "warn".to_string());
    logging::init(&log);

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::LAUNCH_FAILED);
    }
}

/// Only returns on failure: success replaces this process.
fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                bail!("config not found at {}", path.display());
            }
            load_config(path).with_context(|| format!("check config {}", path.display()))?
        }
        None => UndoConfig::from_env().context("load config from environment")?,
    };
    let plan = plan_launch(&cli.command, &config.interpreters, cli.force)?;

    let mut cmd = Command::new(&plan.program);
    cmd.args(&plan.args);
    if plan.preload {
        let library = match cli.library {
            Some(path) => path,
            None => default_library()?,
        };
        if !library.is_file() {
            bail!("preload library not found at {}", library.display());
        }
        let library = library
            .canonicalize()
            .with_context(|| format!("resolve {}", library.display()))?;
        debug!(library = %library.display(), "preloading interceptor");
        for (key, value) in preload_env(std::env::var_os(PRELOAD_VAR).as_deref(), &library) {
            cmd.env(key, value);
        }
    }
    if let Some(path) = &cli.config {
        let path = path
            .canonicalize()
            .with_context(|| format!("resolve {}", path.display()))?;
        cmd.env(ENV_CONFIG, path);
    }
    if let Some(policy) = cli.root_undo {
        cmd.env(ENV_ROOT_UNDO, policy.as_str());
    }
    if let Some(path) = &cli.readline_lib {
        cmd.env(ENV_READLINE_LIB, path);
    }

    debug!(program = ?plan.program, preload = plan.preload, "exec target");
    let err = cmd.exec();
    Err(err).with_context(|| format!("exec {}", Path::new(&plan.program).display()))
}

/// The preload library built alongside this executable.
fn default_library() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("locate rlundo executable")?;
    let dir = exe
        .parent()
        .with_context(|| format!("executable has no parent {}", exe.display()))?;
    Ok(dir.join(format!(
        "{}{PRELOAD_NAME}{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    )))
}

/// Environment that makes the loader consult `library` first, keeping any
/// libraries already preloaded after it.
fn preload_env(existing: Option<&OsStr>, library: &Path) -> Vec<(OsString, OsString)> {
    let mut value = library.as_os_str().to_owned();
    if let Some(existing) = existing.filter(|existing| !existing.is_empty()) {
        value.push(":");
        value.push(existing);
    }

    let mut env = vec![(OsString::from(PRELOAD_VAR), value)];
    if cfg!(target_os = "macos") {
        env.push((
            OsString::from("DYLD_FORCE_FLAT_NAMESPACE"),
            OsString::from("1"),
        ));
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_program_with_its_own_flags() {
        let cli = Cli::parse_from(["rlundo", "bc", "-l", "--quiet"]);
        assert_eq!(cli.command, vec!["bc", "-l", "--quiet"]);
        assert!(cli.library.is_none());
        assert!(!cli.force);
    }

    #[test]
    fn parse_options_before_program() {
        let cli = Cli::parse_from([
            "rlundo",
            "--library",
            "/opt/librlundo_preload.so",
            "--root-undo",
            "exit",
            "--force",
            "irb",
        ]);
        assert_eq!(
            cli.library,
            Some(PathBuf::from("/opt/librlundo_preload.so"))
        );
        assert_eq!(cli.root_undo, Some(RootUndo::Exit));
        assert!(cli.force);
        assert_eq!(cli.command, vec!["irb"]);
    }

    #[test]
    fn parse_rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["rlundo", "--root-undo", "never", "irb"]).is_err());
    }

    #[test]
    fn parse_requires_program() {
        assert!(Cli::try_parse_from(["rlundo"]).is_err());
    }

    #[test]
    fn preload_env_prepends_to_existing_value() {
        let env = preload_env(
            Some(OsStr::new("/usr/lib/libother.so")),
            Path::new("/opt/librlundo_preload.so"),
        );
        assert_eq!(env[0].0, PRELOAD_VAR);
        assert_eq!(env[0].1, "/opt/librlundo_preload.so:/usr/lib/libother.so");
    }

    #[test]
    fn preload_env_ignores_empty_existing_value() {
        let env = preload_env(Some(OsStr::new("")), Path::new("/opt/lib.so"));
        assert_eq!(env[0].1, "/opt/lib.so");
    }
}
