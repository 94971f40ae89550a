/// Tunables of a shell session.
///
/// There is no flag or file based configuration; the binary runs with [`Settings::default`] and
/// tests build their own values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// How many background jobs may be outstanding at once.
    pub job_capacity: usize,
    /// Upper bound on the argument vector handed to a program, program name included.
    pub max_arguments: usize,
    pub prompt: &'static str,
}

impl Settings {
    pub const DEFAULT_JOB_CAPACITY: usize = 100;
    pub const DEFAULT_MAX_ARGUMENTS: usize = 512;
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            job_capacity: Self::DEFAULT_JOB_CAPACITY,
            max_arguments: Self::DEFAULT_MAX_ARGUMENTS,
            prompt: ": ",
        }
    }
}
