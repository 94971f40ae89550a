use std::{
    ffi::CStr,
    io,
    os::fd::{FromRawFd, OwnedFd, RawFd},
};

use crate::cutils::cerr;
use interface::ProcessId;

use self::signal::SignalNumber;

// generalized traits for when we want to hide implementations
pub mod interface;

pub mod signal;

pub mod wait;

/// Terminate the calling process immediately, skipping destructors and `atexit` handlers.
///
/// This is the only correct way for a forked child to give up before its `exec`.
pub(crate) fn _exit(status: libc::c_int) -> ! {
    unsafe { libc::_exit(status) }
}

pub(crate) enum ForkResult {
    // Parent process branch with the child process' PID.
    Parent(ProcessId),
    // Child process branch.
    Child,
}

unsafe fn inner_fork() -> io::Result<ForkResult> {
    let pid = cerr(unsafe { libc::fork() })?;
    if pid == 0 {
        Ok(ForkResult::Child)
    } else {
        Ok(ForkResult::Parent(ProcessId::new(pid)))
    }
}

#[cfg(target_os = "linux")]
/// Create a new process.
pub(crate) fn fork() -> io::Result<ForkResult> {
    // SAFETY: `fork` is implemented using `clone` in linux so we don't need to worry about signal
    // safety.
    unsafe { inner_fork() }
}

#[cfg(not(target_os = "linux"))]
/// Create a new process.
pub(crate) fn fork() -> io::Result<ForkResult> {
    // SAFETY: the child only performs `open`, `dup2`, `sigaction` and `execvp` before replacing
    // its image, all of which are async-signal-safe.
    unsafe { inner_fork() }
}

/// Replace the current process image, searching `PATH` for `argv[0]`.
///
/// Only returns on failure. `argv` must be terminated by a null pointer.
pub(crate) fn execvp(argv: &[*const libc::c_char]) -> io::Error {
    debug_assert!(argv.last().is_some_and(|arg| arg.is_null()));
    // SAFETY: `argv` is a null-terminated array of pointers to valid C strings.
    unsafe { libc::execvp(argv[0], argv.as_ptr()) };
    io::Error::last_os_error()
}

/// Open a file with raw `open(2)` flags.
pub(crate) fn open(path: &CStr, flags: libc::c_int, mode: libc::mode_t) -> io::Result<OwnedFd> {
    let fd = cerr(unsafe { libc::open(path.as_ptr(), flags, libc::c_uint::from(mode)) })?;
    // SAFETY: `open` returned a fresh descriptor that nobody else owns.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Make `target` refer to the same open file as `fd`.
pub(crate) fn dup2(fd: RawFd, target: RawFd) -> io::Result<()> {
    cerr(unsafe { libc::dup2(fd, target) }).map(|_| ())
}

/// A single `read(2)` on `fd`. Unlike [`std::io::Read`] users, an `EINTR` is handed back to the
/// caller instead of being retried.
pub(crate) fn read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
    let count = cerr(unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) })?;
    Ok(count as usize)
}

/// Send a signal to a process with the specified ID.
pub fn kill(pid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    // SAFETY: This function cannot cause UB even if `pid` is not a valid process ID or if
    // `signal` is not a valid signal code.
    cerr(unsafe { libc::kill(pid.get(), signal) }).map(|_| ())
}

/// The process ID of the calling process.
pub fn getpid() -> ProcessId {
    ProcessId::new(unsafe { libc::getpid() })
}

pub fn make_zeroed_sigaction() -> libc::sigaction {
    // SAFETY: since sigaction is a C struct, all-zeroes is a valid representation
    // We cannot use a "literal struct" initialization method since the exact representation
    // of libc::sigaction is not fixed.
    unsafe { std::mem::zeroed() }
}
