use std::{
    ffi::CString,
    fmt, io,
    os::{fd::AsRawFd, unix::ffi::OsStrExt},
    path::Path,
};

use libc::{O_CREAT, O_RDONLY, O_TRUNC, O_WRONLY, STDIN_FILENO, STDOUT_FILENO};

use crate::system::{dup2, open};

use super::interface::RunOptions;

const NULL_DEVICE: &str = "/dev/null";

/// The step of the child's setup that went wrong.
///
/// Every variant maps to its own exit status so a failing child can be diagnosed from the
/// outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RedirectFailure {
    OpenOutput,
    DupOutput,
    OpenInput,
    DupInput,
    OpenNullOutput,
    DupNullOutput,
    OpenNullInput,
    DupNullInput,
}

impl RedirectFailure {
    pub(crate) const fn exit_code(self) -> libc::c_int {
        match self {
            RedirectFailure::OpenOutput => 2,
            RedirectFailure::DupOutput => 3,
            RedirectFailure::OpenInput => 4,
            RedirectFailure::DupInput => 5,
            RedirectFailure::OpenNullOutput => 6,
            RedirectFailure::DupNullOutput => 7,
            RedirectFailure::OpenNullInput => 8,
            RedirectFailure::DupNullInput => 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Input,
    Output,
}

#[derive(Debug)]
struct Redirect {
    path: CString,
    stream: Stream,
    to_null_device: bool,
}

impl Redirect {
    fn new(path: &Path, stream: Stream) -> io::Result<Self> {
        Ok(Self {
            path: CString::new(path.as_os_str().as_bytes())?,
            stream,
            to_null_device: false,
        })
    }

    fn null_device(stream: Stream) -> io::Result<Self> {
        Ok(Self {
            to_null_device: true,
            ..Self::new(Path::new(NULL_DEVICE), stream)?
        })
    }

    fn failures(&self) -> (RedirectFailure, RedirectFailure) {
        use RedirectFailure::*;

        match (self.stream, self.to_null_device) {
            (Stream::Output, false) => (OpenOutput, DupOutput),
            (Stream::Output, true) => (OpenNullOutput, DupNullOutput),
            (Stream::Input, false) => (OpenInput, DupInput),
            (Stream::Input, true) => (OpenNullInput, DupNullInput),
        }
    }

    fn apply(&self) -> Result<(), RedirectError> {
        let (open_failure, dup_failure) = self.failures();
        let (flags, target) = match self.stream {
            Stream::Output => (O_WRONLY | O_CREAT | O_TRUNC, STDOUT_FILENO),
            Stream::Input => (O_RDONLY, STDIN_FILENO),
        };

        let fd = open(&self.path, flags, 0o666).map_err(|error| RedirectError {
            failure: open_failure,
            path: self.path.clone(),
            error,
        })?;

        // the original descriptor is closed when `fd` drops, the duplicate stays
        dup2(fd.as_raw_fd(), target).map_err(|error| RedirectError {
            failure: dup_failure,
            path: self.path.clone(),
            error,
        })
    }
}

/// A redirection step that failed inside the child.
#[derive(Debug)]
pub(crate) struct RedirectError {
    pub(crate) failure: RedirectFailure,
    path: CString,
    error: io::Error,
}

impl fmt::Display for RedirectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.to_string_lossy();
        let error = &self.error;
        match self.failure {
            RedirectFailure::OpenOutput | RedirectFailure::OpenNullOutput => {
                write!(f, "cannot open {path} for output: {error}")
            }
            RedirectFailure::OpenInput | RedirectFailure::OpenNullInput => {
                write!(f, "cannot open {path} for input: {error}")
            }
            RedirectFailure::DupOutput | RedirectFailure::DupNullOutput => {
                write!(f, "cannot redirect standard output to {path}: {error}")
            }
            RedirectFailure::DupInput | RedirectFailure::DupNullInput => {
                write!(f, "cannot redirect standard input from {path}: {error}")
            }
        }
    }
}

/// The redirections a child must perform before replacing its image.
///
/// Built in the parent so that the child does not need to allocate between `fork` and `exec`.
#[derive(Debug)]
pub(crate) struct Redirections {
    output: Option<Redirect>,
    input: Option<Redirect>,
}

impl Redirections {
    pub(crate) fn prepare(options: &RunOptions<'_>) -> io::Result<Self> {
        let for_stream = |path: Option<&Path>, stream| match path {
            Some(path) => Redirect::new(path, stream).map(Some),
            // unattended background jobs must not touch the terminal
            None if options.background => Redirect::null_device(stream).map(Some),
            None => Ok(None),
        };

        Ok(Self {
            output: for_stream(options.output, Stream::Output)?,
            input: for_stream(options.input, Stream::Input)?,
        })
    }

    /// Perform the redirections, output first.
    pub(crate) fn apply(&self) -> Result<(), RedirectError> {
        for redirect in [&self.output, &self.input].into_iter().flatten() {
            redirect.apply()?;
        }

        Ok(())
    }

    #[cfg(test)]
    fn targets(&self) -> (Option<&str>, Option<&str>) {
        fn target(redirect: &Option<Redirect>) -> Option<&str> {
            redirect
                .as_ref()
                .map(|redirect| redirect.path.to_str().unwrap_or_default())
        }
        (target(&self.input), target(&self.output))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::{RedirectFailure, Redirections, NULL_DEVICE};
    use crate::exec::interface::RunOptions;

    fn options<'a>(
        arguments: &'a [String],
        input: Option<&'a str>,
        output: Option<&'a str>,
        background: bool,
    ) -> RunOptions<'a> {
        RunOptions {
            arguments,
            input: input.map(Path::new),
            output: output.map(Path::new),
            background,
        }
    }

    #[test]
    fn foreground_only_redirects_what_was_asked() {
        let args = vec!["cat".to_string()];

        let plain = Redirections::prepare(&options(&args, None, None, false)).unwrap();
        assert_eq!(plain.targets(), (None, None));

        let both = Redirections::prepare(&options(&args, Some("in"), Some("out"), false)).unwrap();
        assert_eq!(both.targets(), (Some("in"), Some("out")));
    }

    #[test]
    fn background_defaults_to_null_device() {
        let args = vec!["cat".to_string()];

        let plain = Redirections::prepare(&options(&args, None, None, true)).unwrap();
        assert_eq!(plain.targets(), (Some(NULL_DEVICE), Some(NULL_DEVICE)));

        let with_output = Redirections::prepare(&options(&args, None, Some("out"), true)).unwrap();
        assert_eq!(with_output.targets(), (Some(NULL_DEVICE), Some("out")));

        let with_input = Redirections::prepare(&options(&args, Some("in"), None, true)).unwrap();
        assert_eq!(with_input.targets(), (Some("in"), Some(NULL_DEVICE)));
    }

    #[test]
    fn interior_nul_is_rejected_up_front() {
        let args = vec!["cat".to_string()];
        let err = Redirections::prepare(&options(&args, Some("in\0put"), None, false)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn failure_sites_have_distinct_exit_codes() {
        use RedirectFailure::*;

        let mut codes: Vec<_> = [
            OpenOutput,
            DupOutput,
            OpenInput,
            DupInput,
            OpenNullOutput,
            DupNullOutput,
            OpenNullInput,
            DupNullInput,
        ]
        .map(RedirectFailure::exit_code)
        .to_vec();

        assert!(codes.iter().all(|&code| code > 1));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 8);
    }
}
