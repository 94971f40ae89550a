use std::process;

use crate::{
    common::{Error, Settings},
    exec::{execute, ForegroundStatus, JobTable},
    log::{dev_info, user_error, ShellLogger},
    system::{
        getpid,
        signal::{consts::SIGINT, SignalHandler, SignalHandlerBehavior},
    },
};

use self::{
    command::{expand_pid, parse, Kind},
    input::{Input, LineReader},
    mode::ModeController,
};

mod builtin;
mod command;
mod input;
mod mode;

/// Consecutive failed reads after which standard input is considered gone.
const MAX_READ_ERRORS: usize = 3;

pub fn main() {
    ShellLogger::new("smallsh: ").into_global_logger();

    match run(Settings::default()) {
        Ok(code) => process::exit(code),
        Err(error) => {
            user_error!("{error}");
            process::exit(error.exit_code());
        }
    }
}

/// The interactive loop. Returns the exit status of the shell.
fn run(settings: Settings) -> Result<i32, Error> {
    let shell_pid = getpid();

    let interrupts = SignalHandler::register(SIGINT, SignalHandlerBehavior::Ignore)
        .map_err(|error| Error::SignalSetup {
            signal: SIGINT,
            error,
        })?;
    // the shell ignores interrupts for as long as it lives
    interrupts.forget();

    let mode = ModeController::install()?;
    let mut jobs = JobTable::new(settings.job_capacity);
    let mut status = ForegroundStatus::default();
    let mut reader = LineReader::stdin();

    dev_info!("shell {shell_pid} started with {settings:?}");

    loop {
        for job in jobs.reap_finished()? {
            println_ignore_io_error!("{job}");
        }

        let mut read_errors = 0;
        let (line, current_mode) = loop {
            let (current_mode, announce) = mode.observe();
            if announce {
                println_ignore_io_error!("{current_mode}");
            }
            print_flush_ignore_io_error!("{}", settings.prompt);

            match reader.read_line() {
                Ok(Input::Line(line)) => break (Some(line), current_mode),
                Ok(Input::Eof) => break (None, current_mode),
                // leave the prompt line before announcing a mode change
                Ok(Input::Interrupted) => println_ignore_io_error!(),
                Err(err) => {
                    read_errors += 1;
                    if read_errors == MAX_READ_ERRORS {
                        return Err(err.into());
                    }
                    user_error!("cannot read input: {err}");
                }
            }
        };

        let Some(line) = line else {
            println_ignore_io_error!();
            jobs.terminate_all();
            return Ok(0);
        };

        let line = expand_pid(&line, shell_pid);
        let background_allowed = current_mode.background_allowed();
        let command = match parse(&line, background_allowed, settings.max_arguments) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                user_error!("{err}");
                continue;
            }
        };

        match &command.kind {
            Kind::Exit => {
                jobs.terminate_all();
                return Ok(0);
            }
            Kind::ChangeDirectory(target) => {
                if let Err((dir, err)) = builtin::change_directory(target.as_deref()) {
                    user_error!("cd: {}: {err}", dir.display());
                }
            }
            Kind::Status => println_ignore_io_error!("{}", status.report()),
            Kind::External => execute(command.as_run_options(), &mut jobs, &mut status)?,
        }
    }
}
