mod interface;
mod jobs;
mod redirect;
mod status;

use std::{
    ffi::{c_char, CString},
    fmt, io,
};

use crate::{
    common::Error,
    cutils::was_interrupted,
    log::{dev_info, dev_warn, user_error},
    system::{
        _exit, execvp, fork,
        interface::ProcessId,
        signal::{consts::*, SignalHandler, SignalHandlerBehavior, SignalNumber},
        wait::{Wait, WaitError, WaitOptions, WaitStatus},
        ForkResult,
    },
};

pub use interface::RunOptions;
pub(crate) use jobs::JobTable;
pub(crate) use status::ForegroundStatus;

use self::redirect::Redirections;

/// Exit status of a child when its program image could not be replaced.
const EXEC_FAILURE: libc::c_int = 1;

/// How a child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Code(i32),
    Signal(SignalNumber),
}

impl ExitReason {
    /// `None` if the child has not actually terminated (stopped or continued).
    pub(crate) fn from_status(status: &WaitStatus) -> Option<Self> {
        if let Some(code) = status.exit_status() {
            Some(Self::Code(code))
        } else {
            status.term_signal().map(Self::Signal)
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Code(code) => write!(f, "exit value {code}"),
            ExitReason::Signal(signal) => write!(f, "terminated by signal {signal}"),
        }
    }
}

/// A null-terminated argument vector ready to be handed to `execvp`.
struct Argv {
    // owns the memory `pointers` refers to
    _strings: Vec<CString>,
    pointers: Vec<*const c_char>,
}

impl Argv {
    fn new(arguments: &[String]) -> io::Result<Self> {
        if arguments.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
        }

        let strings = arguments
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;

        let pointers = strings
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect();

        Ok(Self {
            _strings: strings,
            pointers,
        })
    }
}

/// Run a command, either waiting for it or leaving it running in the background.
///
/// Errors are returned only for failures that leave the shell unable to track its children;
/// anything wrong with the command itself is reported and the shell carries on.
pub(crate) fn execute(
    options: RunOptions<'_>,
    jobs: &mut JobTable,
    status: &mut ForegroundStatus,
) -> Result<(), Error> {
    let program = options.program();

    // everything the child needs is allocated before forking
    let argv = match Argv::new(options.arguments) {
        Ok(argv) => argv,
        Err(err) => {
            user_error!("{program}: {err}");
            return Ok(());
        }
    };
    let redirections = match Redirections::prepare(&options) {
        Ok(redirections) => redirections,
        Err(err) => {
            user_error!("{program}: {err}");
            return Ok(());
        }
    };

    if options.background {
        jobs.check_capacity()?;
    }

    let ForkResult::Parent(child_pid) = fork().map_err(Error::Fork)? else {
        run_child(program, options.background, &argv, &redirections)
    };

    dev_info!("started {program} as {child_pid}");

    if options.background {
        let slot = jobs.register(child_pid)?;
        println_ignore_io_error!("[{}] {child_pid}", slot + 1);
    } else {
        match wait_foreground(child_pid) {
            Ok(reason) => {
                if let ExitReason::Signal(_) = reason {
                    println_ignore_io_error!("{reason}");
                }
                status.record(child_pid, reason);
            }
            Err(err) => user_error!("cannot wait for {program} ({child_pid}): {err}"),
        }
    }

    Ok(())
}

/// The child half of [`execute`]. Never returns into the shell.
fn run_child(program: &str, background: bool, argv: &Argv, redirections: &Redirections) -> ! {
    if let Err(err) = redirections.apply() {
        user_error!("{err}");
        _exit(err.failure.exit_code());
    }

    // the terminal's suspend key toggles the shell mode, it never stops a child
    set_disposition(SIGTSTP, SignalHandlerBehavior::Ignore);
    if !background {
        // the shell ignores interrupts but a foreground child must be interruptible
        set_disposition(SIGINT, SignalHandlerBehavior::Default);
    }

    let err = execvp(&argv.pointers);
    user_error!("{program}: {err}");
    _exit(EXEC_FAILURE)
}

fn set_disposition(signal: SignalNumber, behavior: SignalHandlerBehavior) {
    match SignalHandler::register(signal, behavior) {
        Ok(handler) => handler.forget(),
        Err(err) => dev_warn!("cannot set disposition of signal {signal}: {err}"),
    }
}

fn wait_foreground(child_pid: ProcessId) -> io::Result<ExitReason> {
    loop {
        match child_pid.wait(WaitOptions::new()) {
            // a signal arrived while waiting, the child is still ours to wait for
            Err(WaitError::Io(err)) if was_interrupted(&err) => {}
            Err(WaitError::Io(err)) => return Err(err),
            Err(WaitError::NotReady) => {}
            Ok((_, wait_status)) => match ExitReason::from_status(&wait_status) {
                Some(reason) => return Ok(reason),
                None => dev_warn!("unexpected wait status for {child_pid}: {wait_status:?}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;

    use super::{execute, jobs::Reaped, ExitReason, ForegroundStatus, JobTable, RunOptions};
    use crate::{
        common::Error,
        system::{
            interface::ProcessId,
            signal::{consts::*, SignalHandler, SignalHandlerBehavior},
        },
    };

    fn args(argv: &[&str]) -> Vec<String> {
        argv.iter().map(|arg| arg.to_string()).collect()
    }

    fn tempfile_path(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "smallsh_exec_{name}_{}_{nanos}",
            std::process::id()
        ))
    }

    fn run_foreground(options: RunOptions<'_>) -> ExitReason {
        let mut jobs = JobTable::new(4);
        let mut status = ForegroundStatus::default();
        execute(options, &mut jobs, &mut status).unwrap();
        assert!(jobs.is_empty());
        status.last().unwrap().1
    }

    fn wait_for_job(jobs: &mut JobTable) -> Reaped {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        loop {
            if let Some(job) = jobs.reap_finished().unwrap().pop() {
                return job;
            }
            assert!(std::time::Instant::now() < deadline, "job never finished");
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }

    #[test]
    fn false_sets_exit_status_one() {
        let argv = args(&["false"]);
        let mut jobs = JobTable::new(4);
        let mut status = ForegroundStatus::default();

        execute(RunOptions::foreground(&argv), &mut jobs, &mut status).unwrap();

        let (pid, reason) = status.last().unwrap();
        assert_eq!(reason, ExitReason::Code(1));
        assert_eq!(status.report(), format!("Child PID={pid} | Exit Status: 1"));
    }

    #[test]
    fn only_the_last_foreground_result_is_kept() {
        let mut jobs = JobTable::new(4);
        let mut status = ForegroundStatus::default();

        for (script, expected) in [
            ("exit 4", ExitReason::Code(4)),
            ("kill -TERM $$", ExitReason::Signal(SIGTERM)),
            ("exit 0", ExitReason::Code(0)),
        ] {
            let argv = args(&["sh", "-c", script]);
            execute(RunOptions::foreground(&argv), &mut jobs, &mut status).unwrap();
            assert_eq!(status.last().unwrap().1, expected);
        }
    }

    #[test]
    fn unknown_program_fails_only_the_child() {
        let argv = args(&["smallsh-test-no-such-program"]);
        assert_eq!(
            run_foreground(RunOptions::foreground(&argv)),
            ExitReason::Code(super::EXEC_FAILURE)
        );
    }

    #[test]
    fn output_redirect_creates_and_truncates() {
        let path = tempfile_path("out");
        std::fs::write(&path, "stale contents that are longer than the new ones\n").unwrap();

        let argv = args(&["echo", "fresh"]);
        let options = RunOptions {
            output: Some(&path),
            ..RunOptions::foreground(&argv)
        };
        assert_eq!(run_foreground(options), ExitReason::Code(0));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn input_redirect_feeds_stdin() {
        let input = tempfile_path("in");
        let output = tempfile_path("in_copy");
        std::fs::write(&input, "line one\nline two\n").unwrap();

        let argv = args(&["cat"]);
        let options = RunOptions {
            input: Some(&input),
            output: Some(&output),
            ..RunOptions::foreground(&argv)
        };
        assert_eq!(run_foreground(options), ExitReason::Code(0));
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "line one\nline two\n"
        );

        std::fs::remove_file(input).ok();
        std::fs::remove_file(output).ok();
    }

    #[test]
    fn redirect_failures_exit_with_their_own_code() {
        let argv = args(&["cat"]);
        let missing = tempfile_path("missing");

        let bad_input = RunOptions {
            input: Some(&missing),
            ..RunOptions::foreground(&argv)
        };
        assert_eq!(run_foreground(bad_input), ExitReason::Code(4));

        let bad_output = RunOptions {
            output: Some(Path::new("/")),
            ..RunOptions::foreground(&argv)
        };
        assert_eq!(run_foreground(bad_output), ExitReason::Code(2));
    }

    #[test]
    fn background_registers_without_waiting() {
        let argv = args(&["sh", "-c", "sleep 0.2; exit 5"]);
        let mut jobs = JobTable::new(4);
        let mut status = ForegroundStatus::default();

        let started = std::time::Instant::now();
        execute(
            RunOptions {
                background: true,
                ..RunOptions::foreground(&argv)
            },
            &mut jobs,
            &mut status,
        )
        .unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(200));

        assert_eq!(jobs.len(), 1);
        assert_eq!(status.report(), "No status set: 0");

        let job = wait_for_job(&mut jobs);
        assert_eq!(job.slot, 0);
        assert_eq!(job.reason, ExitReason::Code(5));
    }

    #[test]
    fn background_job_table_overflow_is_fatal() {
        let argv = args(&["true"]);
        let mut jobs = JobTable::new(1);
        let mut status = ForegroundStatus::default();
        jobs.register(ProcessId::new(i32::MAX)).unwrap();

        let err = execute(
            RunOptions {
                background: true,
                ..RunOptions::foreground(&argv)
            },
            &mut jobs,
            &mut status,
        )
        .unwrap_err();
        assert!(matches!(err, Error::JobCapacity { capacity: 1 }));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn background_streams_default_to_null_device() {
        let report = tempfile_path("fds");
        let script = format!(
            "readlink /proc/$$/fd/0 /proc/$$/fd/1 > {}; exit 0",
            report.display()
        );
        let argv = args(&["sh", "-c", &script]);
        let mut jobs = JobTable::new(4);
        let mut status = ForegroundStatus::default();

        execute(
            RunOptions {
                background: true,
                ..RunOptions::foreground(&argv)
            },
            &mut jobs,
            &mut status,
        )
        .unwrap();
        assert_eq!(wait_for_job(&mut jobs).reason, ExitReason::Code(0));
        assert_eq!(
            std::fs::read_to_string(&report).unwrap(),
            "/dev/null\n/dev/null\n"
        );

        // an explicit output redirect wins, input still comes from the null device
        let output = tempfile_path("fds_out");
        let argv = args(&["readlink", "/proc/self/fd/0"]);
        execute(
            RunOptions {
                background: true,
                output: Some(&output),
                ..RunOptions::foreground(&argv)
            },
            &mut jobs,
            &mut status,
        )
        .unwrap();
        assert_eq!(wait_for_job(&mut jobs).reason, ExitReason::Code(0));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "/dev/null\n");

        std::fs::remove_file(report).ok();
        std::fs::remove_file(output).ok();
    }

    #[test]
    fn foreground_children_are_interruptible() {
        // the shell ignores SIGINT; only foreground children get the default back
        let _ignore = SignalHandler::register(SIGINT, SignalHandlerBehavior::Ignore).unwrap();
        let argv = args(&["sh", "-c", "kill -INT $$; exit 3"]);

        assert_eq!(
            run_foreground(RunOptions::foreground(&argv)),
            ExitReason::Signal(SIGINT)
        );

        let mut jobs = JobTable::new(4);
        let mut status = ForegroundStatus::default();
        execute(
            RunOptions {
                background: true,
                ..RunOptions::foreground(&argv)
            },
            &mut jobs,
            &mut status,
        )
        .unwrap();
        assert_eq!(wait_for_job(&mut jobs).reason, ExitReason::Code(3));
    }

    #[test]
    fn exit_reason_wording() {
        assert_eq!(ExitReason::Code(0).to_string(), "exit value 0");
        assert_eq!(
            ExitReason::Signal(SIGKILL).to_string(),
            format!("terminated by signal {SIGKILL}")
        );
    }
}
