//! `LD_PRELOAD` / `DYLD_INSERT_LIBRARIES` interceptor for `readline(3)`.
//!
//! Exports a `readline` with the genuine calling contract. The first call in
//! the process tree loads the configuration and resolves the genuine
//! implementation; both are cached in statics, so forked generations reuse
//! them as part of their copied memory image.

#![allow(unsafe_code)]

use std::ffi::c_char;
use std::sync::{Mutex, OnceLock, PoisonError};

use tracing::debug;

use rlundo::checkpoint::{CheckpointManager, Outcome};
use rlundo::exit_codes;
use rlundo::io::config::UndoConfig;
use rlundo::io::genuine::{GenuineReadline, ResolveOptions};
use rlundo::io::process::{ForkProcess, fatal, terminate};
use rlundo::logging;

struct Adapter {
    genuine: GenuineReadline,
    manager: Mutex<CheckpointManager>,
}

static ADAPTER: OnceLock<Adapter> = OnceLock::new();

fn adapter() -> &'static Adapter {
    ADAPTER.get_or_init(|| {
        let config = match UndoConfig::from_env() {
            Ok(config) => config,
            Err(err) => {
                eprintln!("rlundo: {:#}", err);
                terminate(exit_codes::FAILURE);
            }
        };
        logging::init(&config.log);

        let options = ResolveOptions {
            library: config.readline_library.clone(),
            exclude: Some(readline as usize),
            skip_next: false,
        };
        let genuine = match GenuineReadline::resolve(&options) {
            Ok(genuine) => genuine,
            Err(err) => fatal(&err),
        };
        debug!(pid = std::process::id(), "readline interceptor ready");

        Adapter {
            genuine,
            manager: Mutex::new(CheckpointManager::new(&config)),
        }
    })
}

/// Read a line of input, prompting with `prompt`.
///
/// Same contract as the genuine `readline`: returns a `malloc`ed line the
/// caller must `free`, or null at end of input. Unlike the genuine one, it
/// may fork before returning, so the caller sees the line in a new process.
///
/// # Safety
///
/// `prompt` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn readline(prompt: *const c_char) -> *mut c_char {
    let adapter = adapter();
    let mut reader = adapter.genuine.reader(prompt);
    let mut process = ForkProcess;

    // Single-threaded hosts never contend; the guard is held across the fork
    // and released by whichever side continues.
    let mut manager = adapter
        .manager
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let outcome = manager.read_line(&mut reader, &mut process);
    drop(manager);

    match outcome {
        Ok(Outcome::Line(line)) => line.into_raw(),
        Ok(Outcome::Exit(code)) => terminate(code),
        Err(err) => fatal(&err),
    }
}
