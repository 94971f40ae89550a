use std::fmt;

use crate::system::interface::ProcessId;

use super::ExitReason;

/// How the most recent foreground command ended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ForegroundStatus {
    last: Option<(ProcessId, ExitReason)>,
}

impl ForegroundStatus {
    pub(crate) fn record(&mut self, pid: ProcessId, reason: ExitReason) {
        self.last = Some((pid, reason));
    }

    pub(crate) fn last(&self) -> Option<(ProcessId, ExitReason)> {
        self.last
    }

    /// The line printed by the `status` built-in.
    pub(crate) fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ForegroundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last() {
            None => f.write_str("No status set: 0"),
            Some((pid, ExitReason::Code(code))) => {
                write!(f, "Child PID={pid} | Exit Status: {code}")
            }
            Some((pid, ExitReason::Signal(signal))) => {
                write!(f, "Child PID={pid} | Abnormal Termination Status: {signal}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::ForegroundStatus;
    use crate::{exec::ExitReason, system::interface::ProcessId};

    #[test]
    fn defaults_to_zero() {
        let status = ForegroundStatus::default();
        assert_eq!(status.last(), None);
        assert_eq!(status.report(), "No status set: 0");
    }

    #[test]
    fn last_record_wins() {
        let mut status = ForegroundStatus::default();

        status.record(ProcessId::new(10), ExitReason::Code(3));
        status.record(ProcessId::new(11), ExitReason::Signal(libc::SIGTERM));
        assert_eq!(
            status.report(),
            format!("Child PID=11 | Abnormal Termination Status: {}", libc::SIGTERM)
        );

        status.record(ProcessId::new(12), ExitReason::Code(0));
        assert_eq!(status.last(), Some((ProcessId::new(12), ExitReason::Code(0))));
        assert_eq!(status.report(), "Child PID=12 | Exit Status: 0");
    }
}
