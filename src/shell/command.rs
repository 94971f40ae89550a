use std::{fmt, path::PathBuf};

use crate::{exec::RunOptions, system::interface::ProcessId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Kind {
    Exit,
    ChangeDirectory(Option<String>),
    Status,
    External,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Command {
    pub(crate) kind: Kind,
    pub(crate) arguments: Vec<String>,
    pub(crate) input: Option<PathBuf>,
    pub(crate) output: Option<PathBuf>,
    /// The line ended up containing a standalone `&`.
    pub(crate) requests_background: bool,
    /// Whether background jobs were allowed when the line was parsed.
    pub(crate) background_allowed: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ParseError {
    MissingTarget(&'static str),
    MissingProgram,
    TooManyArguments { max: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingTarget(operator) => {
                write!(f, "syntax error: expected a file name after '{operator}'")
            }
            ParseError::MissingProgram => f.write_str("syntax error: no command given"),
            ParseError::TooManyArguments { max } => {
                write!(f, "too many arguments (at most {max} are supported)")
            }
        }
    }
}

/// Replace every `$$` with the process id of the shell.
pub(crate) fn expand_pid(line: &str, pid: ProcessId) -> String {
    line.replace("$$", &pid.to_string())
}

/// Turn a line into a command. Blank lines and comments give `None`.
pub(crate) fn parse(
    line: &str,
    background_allowed: bool,
    max_arguments: usize,
) -> Result<Option<Command>, ParseError> {
    let mut tokens = line.split_whitespace().peekable();

    let Some(&first) = tokens.peek() else {
        return Ok(None);
    };
    if first.starts_with('#') {
        return Ok(None);
    }

    let mut command = Command {
        kind: Kind::External,
        arguments: Vec::new(),
        input: None,
        output: None,
        requests_background: false,
        background_allowed,
    };

    match first {
        "exit" => {
            command.kind = Kind::Exit;
            return Ok(Some(command));
        }
        "status" => {
            command.kind = Kind::Status;
            return Ok(Some(command));
        }
        "cd" => {
            command.kind = Kind::ChangeDirectory(tokens.nth(1).map(str::to_string));
            return Ok(Some(command));
        }
        _ => {}
    }

    while let Some(token) = tokens.next() {
        match token {
            "<" => {
                let path = tokens.next().ok_or(ParseError::MissingTarget("<"))?;
                command.input = Some(path.into());
            }
            ">" => {
                let path = tokens.next().ok_or(ParseError::MissingTarget(">"))?;
                command.output = Some(path.into());
            }
            "&" => command.requests_background = true,
            argument => {
                if command.arguments.len() == max_arguments {
                    return Err(ParseError::TooManyArguments { max: max_arguments });
                }
                command.arguments.push(argument.to_string());
            }
        }
    }

    if command.arguments.is_empty() {
        return Err(ParseError::MissingProgram);
    }

    Ok(Some(command))
}

impl Command {
    /// Whether this command will actually run in the background.
    pub(crate) fn runs_in_background(&self) -> bool {
        self.requests_background && self.background_allowed
    }

    pub(crate) fn as_run_options(&self) -> RunOptions<'_> {
        RunOptions {
            input: self.input.as_deref(),
            output: self.output.as_deref(),
            background: self.runs_in_background(),
            ..RunOptions::foreground(&self.arguments)
        }
    }
}
