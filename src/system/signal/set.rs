use crate::{cutils::cerr, system::make_zeroed_sigaction};

use super::{handler::SignalHandlerBehavior, SignalNumber};

use std::{io, mem::MaybeUninit};

#[repr(transparent)]
pub(super) struct SignalAction {
    raw: libc::sigaction,
}

impl SignalAction {
    pub(super) fn new(behavior: SignalHandlerBehavior) -> io::Result<Self> {
        let (sa_sigaction, sa_mask) = match behavior {
            SignalHandlerBehavior::Default => (libc::SIG_DFL, SignalSet::empty()?),
            SignalHandlerBehavior::Ignore => (libc::SIG_IGN, SignalSet::empty()?),
            // No `SA_RESTART`: a blocking `read` or `waitpid` must return `EINTR` so the caller
            // gets a chance to look at whatever the handler recorded. The full mask keeps the
            // handler from being interrupted by other signals.
            SignalHandlerBehavior::Catch(handler) => {
                (handler as libc::sighandler_t, SignalSet::full()?)
            }
        };

        let mut raw: libc::sigaction = make_zeroed_sigaction();
        raw.sa_sigaction = sa_sigaction;
        raw.sa_mask = sa_mask.raw;
        raw.sa_flags = 0;

        Ok(Self { raw })
    }

    pub(super) fn register(&self, signal: SignalNumber) -> io::Result<Self> {
        let mut original_action = MaybeUninit::<Self>::zeroed();

        cerr(unsafe { libc::sigaction(signal, &self.raw, original_action.as_mut_ptr().cast()) })?;

        Ok(unsafe { original_action.assume_init() })
    }

    /// Read the action currently registered for `signal` without changing it.
    #[cfg(test)]
    pub(super) fn current(signal: SignalNumber) -> io::Result<Self> {
        let mut action = MaybeUninit::<Self>::zeroed();

        cerr(unsafe { libc::sigaction(signal, std::ptr::null(), action.as_mut_ptr().cast()) })?;

        Ok(unsafe { action.assume_init() })
    }

    #[cfg(test)]
    pub(super) fn is_ignore(&self) -> bool {
        self.raw.sa_sigaction == libc::SIG_IGN
    }

    #[cfg(test)]
    pub(super) fn is_default(&self) -> bool {
        self.raw.sa_sigaction == libc::SIG_DFL
    }
}

// A signal set that can be used to mask signals.
#[repr(transparent)]
pub(crate) struct SignalSet {
    raw: libc::sigset_t,
}

impl SignalSet {
    /// Create an empty set.
    pub(crate) fn empty() -> io::Result<Self> {
        let mut set = MaybeUninit::<Self>::zeroed();

        cerr(unsafe { libc::sigemptyset(set.as_mut_ptr().cast()) })?;

        Ok(unsafe { set.assume_init() })
    }

    /// Create a set containing all the signals.
    pub(crate) fn full() -> io::Result<Self> {
        let mut set = MaybeUninit::<Self>::zeroed();

        cerr(unsafe { libc::sigfillset(set.as_mut_ptr().cast()) })?;

        Ok(unsafe { set.assume_init() })
    }
}
