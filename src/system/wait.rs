use std::{fmt, io};

use libc::{c_int, WEXITSTATUS, WIFEXITED, WIFSIGNALED, WNOHANG, WTERMSIG};

use crate::cutils::cerr;

use super::{
    interface::ProcessId,
    signal::{signal_name, SignalNumber},
};

mod sealed {
    pub(crate) trait Sealed {}

    impl Sealed for crate::system::interface::ProcessId {}
}

/// `waitpid(2)` for a single child. Only terminations are reported, stopped children are not.
pub(crate) trait Wait: sealed::Sealed {
    fn wait(self, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError>;
}

impl Wait for ProcessId {
    fn wait(self, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError> {
        let mut status: c_int = 0;

        let pid = cerr(unsafe { libc::waitpid(self.get(), &mut status, options.flags) })
            .map_err(WaitError::Io)?;

        // with WNOHANG, zero means the child is still running
        if pid == 0 {
            return Err(WaitError::NotReady);
        }

        Ok((ProcessId::new(pid), WaitStatus { status }))
    }
}

#[derive(Debug)]
pub enum WaitError {
    /// Only with [`WaitOptions::no_hang`].
    NotReady,
    Io(io::Error),
}

pub struct WaitOptions {
    flags: c_int,
}

impl WaitOptions {
    /// Block until the child terminates.
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Report [`WaitError::NotReady`] instead of blocking.
    pub const fn no_hang(mut self) -> Self {
        self.flags |= WNOHANG;
        self
    }
}

/// How a waited-for child terminated.
pub struct WaitStatus {
    status: c_int,
}

impl WaitStatus {
    /// The value passed to `exit`, if the child exited.
    pub const fn exit_status(&self) -> Option<c_int> {
        if WIFEXITED(self.status) {
            Some(WEXITSTATUS(self.status))
        } else {
            None
        }
    }

    /// The signal that killed the child, if any.
    pub const fn term_signal(&self) -> Option<SignalNumber> {
        if WIFSIGNALED(self.status) {
            Some(WTERMSIG(self.status))
        } else {
            None
        }
    }
}

impl fmt::Debug for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitStatus")
            .field("exit_status", &self.exit_status())
            .field("term_signal", &self.term_signal().map(signal_name))
            .finish()
    }
}
