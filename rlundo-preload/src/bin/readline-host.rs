//! Smallest C-ABI readline host.
//!
//! Looks `readline` up in the running process instead of linking it, so
//! whatever the dynamic loader put first (the preloaded interceptor) answers.
//! Prints each line it gets and how many it has seen.

#![allow(unsafe_code)]

use std::ffi::{CStr, c_char};
use std::io::Write;

use nix::libc;

type ReadlineFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;

fn main() {
    // SAFETY: the symbol name is NUL-terminated; RTLD_DEFAULT is a valid pseudo-handle.
    let addr = unsafe { libc::dlsym(libc::RTLD_DEFAULT, c"readline".as_ptr()) };
    if addr.is_null() {
        eprintln!("readline-host: no readline loaded");
        std::process::exit(2);
    }
    // SAFETY: a symbol named `readline` has the readline(3) signature.
    let readline = unsafe { std::mem::transmute::<*mut libc::c_void, ReadlineFn>(addr) };

    let mut lines: u64 = 0;
    loop {
        // SAFETY: the prompt is a valid C string.
        let raw = unsafe { readline(c"> ".as_ptr()) };
        if raw.is_null() {
            break;
        }
        // SAFETY: readline returns a malloc'd NUL-terminated string we now own.
        let text = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        unsafe { libc::free(raw.cast()) };

        lines += 1;
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "got: {text}");
        let _ = writeln!(stdout, "lines: {lines}");
        let _ = stdout.flush();
    }
}
