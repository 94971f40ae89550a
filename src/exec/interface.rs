use std::path::Path;

/// Everything the execution core needs to know about one command.
///
/// `background` is the effective decision: a `&` request that arrived while the shell was in
/// foreground-only mode has already been turned into a foreground run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions<'a> {
    pub arguments: &'a [String],
    pub input: Option<&'a Path>,
    pub output: Option<&'a Path>,
    pub background: bool,
}

impl<'a> RunOptions<'a> {
    pub fn foreground(arguments: &'a [String]) -> Self {
        Self {
            arguments,
            input: None,
            output: None,
            background: false,
        }
    }

    pub fn program(&self) -> &'a str {
        let arguments: &'a [String] = self.arguments;
        arguments.first().map(String::as_str).unwrap_or_default()
    }
}
