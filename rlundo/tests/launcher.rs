//! CLI tests for the `rlundo` launcher.
//!
//! The target program here is `env`, so the tests observe exactly what the
//! launcher exported before replacing itself.

use std::fs;
use std::path::Path;
use std::time::Duration;

use rlundo::exit_codes;
use rlundo::test_support::run_host;

const TIMEOUT: Duration = Duration::from_secs(20);

fn launcher() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_rlundo"))
}

#[test]
fn missing_preload_library_fails_to_launch() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("librlundo_preload.so");
    let missing = missing.to_string_lossy();

    let run = run_host(
        launcher(),
        &["--library", &missing, "env"],
        "",
        &[],
        TIMEOUT,
    )
    .expect("run launcher");

    assert_eq!(run.code, Some(exit_codes::LAUNCH_FAILED));
    assert!(run.stderr.contains("preload library not found"));
}

#[test]
fn unknown_program_fails_to_launch() {
    let temp = tempfile::tempdir().expect("tempdir");
    let library = temp.path().join("librlundo_preload.so");
    fs::write(&library, b"").expect("write library");
    let library = library.to_string_lossy();

    let run = run_host(
        launcher(),
        &["--library", &library, "rlundo-no-such-program"],
        "",
        &[],
        TIMEOUT,
    )
    .expect("run launcher");

    assert_eq!(run.code, Some(exit_codes::LAUNCH_FAILED));
    assert!(run.stderr.contains("exec rlundo-no-such-program"));
}

#[cfg(target_os = "linux")]
#[test]
fn exports_preload_and_engine_settings() {
    let temp = tempfile::tempdir().expect("tempdir");
    let library = temp.path().join("librlundo_preload.so");
    // Not a real ELF object: the loader reports it and carries on without it.
    fs::write(&library, b"").expect("write library");
    let library = library.canonicalize().expect("canonicalize");
    let library_arg = library.to_string_lossy();

    let run = run_host(
        launcher(),
        &[
            "--library",
            &library_arg,
            "--root-undo",
            "exit",
            "--readline-lib",
            "/opt/readline/libreadline.so.8",
            "env",
        ],
        "",
        &[("LD_PRELOAD", "")],
        TIMEOUT,
    )
    .expect("run launcher");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    assert!(
        run.stdout
            .lines()
            .any(|line| line == format!("LD_PRELOAD={}", library.display()))
    );
    assert!(run.stdout.lines().any(|line| line == "RLUNDO_ROOT_UNDO=exit"));
    assert!(
        run.stdout
            .lines()
            .any(|line| line == "RLUNDO_READLINE_LIB=/opt/readline/libreadline.so.8")
    );
}

#[test]
fn invalid_config_file_fails_to_launch() {
    let temp = tempfile::tempdir().expect("tempdir");
    let library = temp.path().join("librlundo_preload.so");
    fs::write(&library, b"").expect("write library");
    let config = temp.path().join("rlundo.toml");
    fs::write(&config, "root_undo = 3\n").expect("write config");
    let library = library.to_string_lossy();
    let config = config.to_string_lossy();

    let run = run_host(
        launcher(),
        &["--library", &library, "--config", &config, "env"],
        "",
        &[],
        TIMEOUT,
    )
    .expect("run launcher");

    assert_eq!(run.code, Some(exit_codes::LAUNCH_FAILED));
    assert!(run.stderr.contains("check config"));
}

#[test]
fn missing_config_file_is_reported_as_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");
    let library = temp.path().join("librlundo_preload.so");
    fs::write(&library, b"").expect("write library");
    let config = temp.path().join("absent.toml");
    let library = library.to_string_lossy();
    let config = config.to_string_lossy();

    let run = run_host(
        launcher(),
        &["--library", &library, "--config", &config, "env"],
        "",
        &[],
        TIMEOUT,
    )
    .expect("run launcher");

    assert_eq!(run.code, Some(exit_codes::LAUNCH_FAILED));
    assert!(
        run.stderr.contains("config not found at"),
        "stderr: {}",
        run.stderr
    );
}

#[test]
fn python_is_refused_with_a_diagnostic() {
    let temp = tempfile::tempdir().expect("tempdir");
    let library = temp.path().join("librlundo_preload.so");
    fs::write(&library, b"").expect("write library");
    let library = library.to_string_lossy();

    let run = run_host(
        launcher(),
        &["--library", &library, "python3", "-q"],
        "",
        &[],
        TIMEOUT,
    )
    .expect("run launcher");

    assert_eq!(run.code, Some(exit_codes::LAUNCH_FAILED));
    assert!(
        run.stderr.contains("python3 cannot be intercepted"),
        "stderr: {}",
        run.stderr
    );
    assert!(run.stderr.contains("rl_callback_read_char"));
}

#[cfg(target_os = "linux")]
#[test]
fn configured_interpreter_runs_instead_without_preload() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("rlundo.toml");
    fs::write(
        &config,
        r#"
[[interpreters]]
program = "fake-repl"
command = ["env"]
"#,
    )
    .expect("write config");
    let missing = temp.path().join("librlundo_preload.so");
    let missing = missing.to_string_lossy();
    let config = config.to_string_lossy();

    // The preload library is absent: an interpreter without preload never needs it.
    let run = run_host(
        launcher(),
        &[
            "--library",
            &missing,
            "--config",
            &config,
            "fake-repl",
            "FOO=bar",
        ],
        "",
        &[("LD_PRELOAD", "")],
        TIMEOUT,
    )
    .expect("run launcher");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    assert!(run.stdout.lines().any(|line| line == "FOO=bar"));
    assert!(run.stdout.lines().any(|line| line == "LD_PRELOAD="));
    assert!(
        run.stdout
            .lines()
            .any(|line| line.starts_with("RLUNDO_CONFIG="))
    );
}
