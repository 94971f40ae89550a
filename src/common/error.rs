use std::{fmt, io};

use crate::system::{interface::ProcessId, signal::SignalNumber};

/// Errors that end the shell.
///
/// Failures that only concern a single command (a bad redirect target, a failing `cd`, an
/// unknown program) never become an [`Error`]; they are reported where they happen and the
/// shell moves on to the next line.
#[derive(Debug)]
pub enum Error {
    /// The process table refused to give us another child.
    Fork(io::Error),
    /// More background jobs than the job table may hold.
    JobCapacity { capacity: usize },
    /// A background job vanished from under the job table.
    Reap { pid: ProcessId, error: io::Error },
    /// The shell could not install its own signal dispositions.
    SignalSetup {
        signal: SignalNumber,
        error: io::Error,
    },
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Fork(e) => write!(f, "cannot fork: {e}"),
            Error::JobCapacity { capacity } => {
                write!(f, "too many background jobs (at most {capacity} may run)")
            }
            Error::Reap { pid, error } => {
                write!(f, "cannot check background process {pid}: {error}")
            }
            Error::SignalSetup { signal, error } => {
                let name = crate::system::signal::signal_name(*signal);
                write!(f, "cannot set up handler for {name}: {error}")
            }
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl Error {
    /// The status the shell exits with, one per failure site.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io(_) => 1,
            Error::Fork(_) => 2,
            Error::JobCapacity { .. } => 3,
            Error::Reap { .. } => 4,
            Error::SignalSetup { .. } => 5,
        }
    }
}
