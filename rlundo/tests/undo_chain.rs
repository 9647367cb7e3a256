//! End-to-end tests for the checkpoint chain.
//!
//! Spawns the `undoable` host with scripted stdin. Every accepted line really
//! forks, every undo really exits with the reserved code, and the exit code
//! checked here is the one the root process reports to its launcher.

use std::path::Path;
use std::time::Duration;

use rlundo::core::ledger::{NO_COMMAND, NOTHING_TO_UNDO};
use rlundo::exit_codes;
use rlundo::io::config::ENV_ROOT_UNDO;
use rlundo::test_support::{HostRun, run_host};

const TIMEOUT: Duration = Duration::from_secs(20);

fn run(input: &str) -> HostRun {
    run_with_env(input, &[])
}

fn run_with_env(input: &str, env: &[(&str, &str)]) -> HostRun {
    run_host(
        Path::new(env!("CARGO_BIN_EXE_undoable")),
        &[],
        input,
        env,
        TIMEOUT,
    )
    .expect("run undoable")
}

fn last_count(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("count is now: "))
        .last()
}

#[test]
fn accepted_lines_reach_the_host_verbatim() {
    let run = run("a\n b\nc\n");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    assert!(run.stdout.contains("You entered: a\n"));
    assert!(run.stdout.contains("You entered:  b\n"));
    assert!(run.stdout.contains("depth is now: 3 (last: c)"));
    assert_eq!(last_count(&run.stdout), Some("3"));
}

#[test]
fn undo_restores_state_from_before_the_line() {
    let run = run("foo\nundo\n");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    assert!(run.stdout.contains("undoing 'foo'\n"));
    assert_eq!(last_count(&run.stdout), Some("1"));
}

#[test]
fn undo_then_new_line_continues_from_the_parent() {
    let run = run("a\nb\nundo\nc\n");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    assert!(run.stdout.contains("undoing 'b'\n"));
    assert!(run.stdout.contains("depth is now: 2 (last: c)"));
    assert_eq!(last_count(&run.stdout), Some("2"));
}

#[test]
fn chained_undo_walks_back_one_generation_each() {
    let run = run("a\nb\nc\nundo\nundo\nd\n");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    let undo_c = run.stdout.find("undoing 'c'").expect("undo c");
    let undo_b = run.stdout.find("undoing 'b'").expect("undo b");
    assert!(undo_c < undo_b);
    assert!(run.stdout.contains("You entered: d\ncount is now: 2\n"));
    assert!(run.stdout.contains("depth is now: 2 (last: d)"));
}

#[test]
fn undoing_everything_returns_to_root() {
    let run = run("a\nb\nundo\nundo\nz\n");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    assert!(run.stdout.contains("undoing 'a'\n"));
    assert!(run.stdout.contains("depth is now: 1 (last: z)"));
    assert_eq!(last_count(&run.stdout), Some("1"));
}

#[test]
fn deliberate_exit_code_reaches_the_launcher() {
    let run = run("a\nb\nexit 7\n");

    assert_eq!(run.code, Some(7), "stderr: {}", run.stderr);
}

#[test]
fn killed_generation_becomes_generic_failure() {
    let run = run("a\ncrash\nnever read\n");

    assert_eq!(run.code, Some(exit_codes::FAILURE), "stderr: {}", run.stderr);
    assert!(!run.stdout.contains("You entered: never read"));
}

#[test]
fn end_of_input_prints_one_newline_and_exits_clean() {
    let run = run("a\n");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    assert!(run.stdout.ends_with("enter a string: \n"));
    assert_eq!(run.stdout.matches("enter a string: ").count(), 2);
}

#[test]
fn empty_input_exits_clean_at_root() {
    let run = run("");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    assert_eq!(run.stdout, "enter a string: \n");
}

#[test]
fn root_undo_is_ignored_by_default() {
    let run = run("undo\nx\n");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    assert!(run.stdout.contains(NOTHING_TO_UNDO));
    assert!(run.stdout.contains("You entered: x\n"));
}

#[test]
fn root_undo_exit_policy_keeps_reference_behavior() {
    let run = run_with_env("undo\nx\n", &[(ENV_ROOT_UNDO, "exit")]);

    assert_eq!(run.code, Some(exit_codes::UNDO_REQUESTED));
    assert!(run.stdout.contains(&format!("undoing '{NO_COMMAND}'")));
    assert!(!run.stdout.contains("You entered: x"));
}

#[test]
fn invalid_config_is_fatal_at_startup() {
    let run = run_with_env("a\n", &[(ENV_ROOT_UNDO, "sometimes")]);

    assert_eq!(run.code, Some(exit_codes::FAILURE));
    assert!(run.stderr.contains(ENV_ROOT_UNDO));
    assert!(!run.stdout.contains("You entered"));
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[test]
fn killing_an_intermediate_generation_takes_the_leaf_down() {
    // The leaf kills its own parent, then lingers. It must die with it
    // instead of reading `after` as an orphan.
    let run = run("a\nb\nkill-parent\nafter\n");

    assert_eq!(run.code, Some(exit_codes::FAILURE), "stderr: {}", run.stderr);
    assert!(!run.stdout.contains("You entered: kill-parent"));
    assert!(!run.stdout.contains("You entered: after"));
}

#[test]
fn non_utf8_lines_reach_the_host_byte_for_byte() {
    let run = run_host(
        Path::new(env!("CARGO_BIN_EXE_undoable")),
        &[],
        b"caf\xe9\n".as_slice(),
        &[],
        TIMEOUT,
    )
    .expect("run undoable");

    assert_eq!(run.code, Some(exit_codes::OK), "stderr: {}", run.stderr);
    let expected: &[u8] = b"You entered: caf\xe9\n";
    assert!(
        run.stdout_bytes
            .windows(expected.len())
            .any(|window| window == expected),
        "stdout: {:?}",
        run.stdout
    );
}
