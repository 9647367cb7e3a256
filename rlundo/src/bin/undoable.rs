//! Minimal line-oriented host running on the checkpoint engine.
//!
//! Reads lines from stdin, echoes them back byte for byte, and keeps a
//! counter that only undo can roll back. Three commands exercise the chain:
//! `exit <code>`, `crash` (SIGKILL itself) and `kill-parent` (SIGKILL the
//! generation waiting on it).

use std::io::Write;
use std::time::Duration;

use nix::sys::signal::{Signal, kill, raise};
use nix::unistd::getppid;
use rlundo::checkpoint::{CheckpointManager, Outcome};
use rlundo::exit_codes;
use rlundo::io::config::UndoConfig;
use rlundo::io::process::{ForkProcess, fatal, terminate};
use rlundo::io::reader::StdinReader;
use rlundo::logging;

const PROMPT: &str = "enter a string: ";
const KILL_PARENT_GRACE: Duration = Duration::from_secs(5);

fn main() {
    let config = match UndoConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILURE);
        }
    };
    logging::init(&config.log);

    let mut manager = CheckpointManager::new(&config);
    let mut process = ForkProcess;
    let mut reader = StdinReader::new(PROMPT);
    let mut count: u64 = 0;

    loop {
        let line = match manager.read_line(&mut reader, &mut process) {
            Ok(Outcome::Line(line)) => line,
            Ok(Outcome::Exit(code)) => terminate(code),
            Err(err) => fatal(&err),
        };

        match line.as_slice() {
            b"crash" => {
                let _ = raise(Signal::SIGKILL);
            }
            b"kill-parent" => {
                let _ = kill(getppid(), Signal::SIGKILL);
                // Give the chain time to tear this generation down too.
                std::thread::sleep(KILL_PARENT_GRACE);
            }
            _ => {}
        }
        if let Some(code) = line.strip_prefix(b"exit ") {
            let code = String::from_utf8_lossy(code);
            match code.trim().parse::<i32>() {
                Ok(code) => terminate(code),
                Err(_) => println!("not an exit code: {code}"),
            }
        }

        count += 1;
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(b"You entered: ");
        let _ = stdout.write_all(&line);
        let _ = stdout.write_all(b"\n");
        drop(stdout);
        println!("count is now: {count}");
        println!(
            "depth is now: {} (last: {})",
            manager.context().depth(),
            manager.context().ledger().describe()
        );
    }
}
