//! Locating and calling the genuine `readline` behind the interceptor.
//!
//! Resolution happens once per process tree: the cached handle is plain
//! memory, so every forked generation inherits it without resolving again.

#![allow(unsafe_code)]

use std::ffi::{CStr, CString, c_char};
use std::mem::ManuallyDrop;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use nix::libc;
use tracing::{debug, warn};

use crate::error::CheckpointError;
use crate::io::reader::LineReader;

/// C signature of `readline(3)`.
pub type ReadlineFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;

const SYMBOL: &CStr = c"readline";

#[cfg(target_os = "macos")]
const DEFAULT_LIBRARIES: &[&str] = &["libreadline.dylib", "/usr/local/lib/libreadline.dylib"];
#[cfg(not(target_os = "macos"))]
const DEFAULT_LIBRARIES: &[&str] = &["libreadline.so.8", "libreadline.so.7", "libreadline.so"];

/// Where to look for the genuine implementation.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Library to load instead of the platform defaults.
    pub library: Option<PathBuf>,
    /// Address that must not be accepted (the interceptor's own `readline`).
    pub exclude: Option<usize>,
    /// Skip the `RTLD_NEXT` lookup and go straight to the libraries.
    pub skip_next: bool,
}

/// Resolved handle to the genuine `readline`.
#[derive(Debug, Clone, Copy)]
pub struct GenuineReadline {
    func: ReadlineFn,
}

impl GenuineReadline {
    /// Find the next definition of `readline` after the caller's, falling
    /// back to the configured library, or the platform defaults when none
    /// is configured.
    pub fn resolve(options: &ResolveOptions) -> Result<Self, CheckpointError> {
        let mut tried = Vec::new();

        if !options.skip_next {
            tried.push("RTLD_NEXT".to_string());
            // SAFETY: SYMBOL is NUL-terminated; RTLD_NEXT is a valid pseudo-handle.
            let addr = unsafe { libc::dlsym(libc::RTLD_NEXT, SYMBOL.as_ptr()) };
            if let Some(found) = Self::accept(addr, options) {
                debug!("resolved readline via RTLD_NEXT");
                return Ok(found);
            }
        }

        let libraries: Vec<&Path> = match &options.library {
            Some(library) => vec![library.as_path()],
            None => DEFAULT_LIBRARIES.iter().map(Path::new).collect(),
        };
        for library in libraries {
            tried.push(library.display().to_string());
            match Self::open_and_lookup(library) {
                Some(addr) => {
                    if let Some(found) = Self::accept(addr, options) {
                        debug!(library = %library.display(), "resolved readline");
                        return Ok(found);
                    }
                }
                None => debug!(library = %library.display(), "readline not found in library"),
            }
        }

        warn!(tried = %tried.join(", "), "genuine readline not found");
        Err(CheckpointError::Resolve {
            tried: tried.join(", "),
        })
    }

    /// Wrap an already-known implementation.
    pub fn from_fn(func: ReadlineFn) -> Self {
        Self { func }
    }

    pub fn address(&self) -> usize {
        self.func as usize
    }

    /// Reader that prompts with `prompt` on each call.
    pub fn reader(&self, prompt: *const c_char) -> ReadlineReader {
        ReadlineReader {
            genuine: *self,
            prompt,
        }
    }

    fn accept(addr: *mut libc::c_void, options: &ResolveOptions) -> Option<Self> {
        if addr.is_null() || options.exclude == Some(addr as usize) {
            return None;
        }
        // SAFETY: the symbol named `readline` has the readline(3) signature.
        let func = unsafe { std::mem::transmute::<*mut libc::c_void, ReadlineFn>(addr) };
        Some(Self { func })
    }

    fn open_and_lookup(library: &Path) -> Option<*mut libc::c_void> {
        let name = CString::new(library.as_os_str().as_bytes()).ok()?;
        // SAFETY: `name` is NUL-terminated. The handle is intentionally never
        // closed: the resolved function must stay valid for the process lifetime.
        let handle = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
        if handle.is_null() {
            return None;
        }
        // SAFETY: `handle` is a live handle returned by dlopen.
        let addr = unsafe { libc::dlsym(handle, SYMBOL.as_ptr()) };
        (!addr.is_null()).then_some(addr)
    }
}

/// A line returned by the genuine `readline`, allocated with `malloc`.
///
/// Dropping it frees the allocation; [`GenuineLine::into_raw`] passes
/// ownership to the C caller instead.
#[derive(Debug)]
pub struct GenuineLine {
    ptr: NonNull<c_char>,
}

impl GenuineLine {
    /// Take ownership of a `malloc`ed, NUL-terminated string.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live `malloc` allocation holding a
    /// NUL-terminated string that nothing else frees.
    pub unsafe fn from_raw(ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    pub fn into_raw(self) -> *mut c_char {
        ManuallyDrop::new(self).ptr.as_ptr()
    }
}

impl AsRef<[u8]> for GenuineLine {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: guaranteed NUL-terminated by `from_raw`'s contract.
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }.to_bytes()
    }
}

impl Drop for GenuineLine {
    fn drop(&mut self) {
        // SAFETY: we own the allocation and it came from malloc.
        unsafe { libc::free(self.ptr.as_ptr().cast()) };
    }
}

/// [`LineReader`] over the genuine `readline` for one prompt.
#[derive(Debug)]
pub struct ReadlineReader {
    genuine: GenuineReadline,
    prompt: *const c_char,
}

impl LineReader for ReadlineReader {
    type Line = GenuineLine;

    fn read_line(&mut self) -> Result<Option<GenuineLine>, CheckpointError> {
        // SAFETY: `prompt` comes straight from the host's readline call and
        // the returned pointer follows readline's ownership contract.
        Ok(unsafe { GenuineLine::from_raw((self.genuine.func)(self.prompt)) })
    }
}
