use std::fmt;

use crate::{
    common::Error,
    cutils::was_interrupted,
    log::{dev_info, dev_warn},
    system::{
        interface::ProcessId,
        kill,
        signal::consts::SIGTERM,
        wait::{Wait, WaitError, WaitOptions},
    },
};

use super::ExitReason;

/// A background job that was found finished during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reaped {
    /// Position of the job in the table when the sweep started.
    pub(crate) slot: usize,
    pub(crate) pid: ProcessId,
    pub(crate) reason: ExitReason,
}

impl fmt::Display for Reaped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Background pid [{}] {} is done: {}",
            self.slot + 1,
            self.pid,
            self.reason
        )
    }
}

/// The background children that have not been reaped yet, oldest first.
///
/// Slot numbers are positions in the table and shift when earlier jobs are reaped.
#[derive(Debug)]
pub(crate) struct JobTable {
    pids: Vec<ProcessId>,
    capacity: usize,
}

impl JobTable {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            pids: Vec::new(),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pids.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.pids.len() >= self.capacity
    }

    pub(crate) fn pids(&self) -> &[ProcessId] {
        &self.pids
    }

    /// Fail if another job would not fit.
    pub(crate) fn check_capacity(&self) -> Result<(), Error> {
        if self.is_full() {
            Err(Error::JobCapacity {
                capacity: self.capacity,
            })
        } else {
            Ok(())
        }
    }

    /// Start tracking a background child and return its slot.
    pub(crate) fn register(&mut self, pid: ProcessId) -> Result<usize, Error> {
        self.check_capacity()?;
        debug_assert!(!self.pids.contains(&pid), "{pid} registered twice");

        self.pids.push(pid);
        Ok(self.pids.len() - 1)
    }

    /// Collect every job that has terminated since the last sweep without blocking.
    ///
    /// Jobs still running are left untouched. A job that cannot be checked at all means the
    /// table no longer matches our children, which is fatal.
    pub(crate) fn reap_finished(&mut self) -> Result<Vec<Reaped>, Error> {
        let mut reaped = Vec::new();

        for (slot, &pid) in self.pids.iter().enumerate() {
            match pid.wait(WaitOptions::new().no_hang()) {
                Err(WaitError::NotReady) => {}
                // checked again on the next sweep
                Err(WaitError::Io(err)) if was_interrupted(&err) => {}
                Err(WaitError::Io(error)) => return Err(Error::Reap { pid, error }),
                Ok((_, status)) => match ExitReason::from_status(&status) {
                    Some(reason) => {
                        dev_info!("background job {pid} finished: {status:?}");
                        reaped.push(Reaped { slot, pid, reason });
                    }
                    None => dev_warn!("unexpected wait status for {pid}: {status:?}"),
                },
            }
        }

        if !reaped.is_empty() {
            let mut done = reaped.iter().map(|job| job.slot).peekable();
            let mut slot = 0;
            self.pids.retain(|_| {
                let keep = done.next_if_eq(&slot).is_none();
                slot += 1;
                keep
            });
        }

        Ok(reaped)
    }

    /// Ask every remaining job to terminate. Does not wait for them.
    pub(crate) fn terminate_all(&mut self) {
        if self.is_empty() {
            return;
        }

        dev_info!("terminating {} background jobs: {:?}", self.len(), self.pids());
        for pid in self.pids.drain(..) {
            if let Err(err) = kill(pid, SIGTERM) {
                dev_warn!("cannot terminate background job {pid}: {err}");
            }
        }
    }
}
