//! Engine configuration: an optional TOML file plus `RLUNDO_*` overrides.
//!
//! The engine runs inside arbitrary host programs, so it has no command line
//! of its own. The launcher exports the same variables read here.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::dispatch::Interpreter;
use crate::core::types::RootUndo;

/// Path of an optional TOML config file.
pub const ENV_CONFIG: &str = "RLUNDO_CONFIG";
/// Overrides [`UndoConfig::root_undo`] (`ignore` or `exit`).
pub const ENV_ROOT_UNDO: &str = "RLUNDO_ROOT_UNDO";
/// Overrides [`UndoConfig::readline_library`].
pub const ENV_READLINE_LIB: &str = "RLUNDO_READLINE_LIB";
/// Overrides [`UndoConfig::log`].
pub const ENV_LOG: &str = "RLUNDO_LOG";

/// Engine configuration (TOML).
///
/// Missing fields default to the values in [`UndoConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UndoConfig {
    /// Behavior of `undo` before any line was accepted.
    pub root_undo: RootUndo,

    /// Library to load the genuine `readline` from when the default symbol
    /// search order cannot skip past the interceptor.
    pub readline_library: Option<PathBuf>,

    /// `tracing` filter directive for engine diagnostics.
    pub log: String,

    /// Launcher dispatch table for hosts that need an alternate command.
    pub interpreters: Vec<Interpreter>,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            root_undo: RootUndo::Ignore,
            readline_library: None,
            log: "warn".to_string(),
            interpreters: Vec::new(),
        }
    }
}

impl UndoConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log.trim().is_empty() {
            return Err(anyhow!("log must be a non-empty filter directive"));
        }
        if let Some(path) = &self.readline_library
            && path.as_os_str().is_empty()
        {
            return Err(anyhow!("readline_library must not be empty"));
        }
        for interp in &self.interpreters {
            if interp.program.trim().is_empty() {
                return Err(anyhow!("interpreters.program must be non-empty"));
            }
            if interp.command.is_empty() || interp.command[0].trim().is_empty() {
                return Err(anyhow!(
                    "interpreters.command for {} must be a non-empty array",
                    interp.program
                ));
            }
        }
        Ok(())
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(ENV_CONFIG).filter(|path| !path.is_empty()) {
            Some(path) => load_config(Path::new(&path))?,
            None => Self::default(),
        };
        cfg.apply_env(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `RLUNDO_*` overrides; unset or empty variables are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(value) = get(ENV_ROOT_UNDO) {
            self.root_undo = value
                .parse()
                .map_err(|err: String| anyhow!(err))
                .with_context(|| format!("parse {ENV_ROOT_UNDO}"))?;
        }
        if let Some(value) = get(ENV_READLINE_LIB) {
            self.readline_library = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_LOG) {
            self.log = value;
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `UndoConfig::default()`.
pub fn load_config(path: &Path) -> Result<UndoConfig> {
    if !path.exists() {
        let cfg = UndoConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: UndoConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
