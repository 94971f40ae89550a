//! Foreground-only mode, toggled by `SIGTSTP`.
//!
//! The signal handler flips a pair of atomics and does nothing else. The main loop picks up the
//! change at its next prompt, announces it and stamps the new mode into the next command.
use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{
    common::Error,
    system::signal::{consts::SIGTSTP, SignalHandler, SignalHandlerBehavior, SignalNumber},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    BackgroundAllowed,
    ForegroundOnly,
}

impl Mode {
    pub(crate) fn background_allowed(self) -> bool {
        self == Mode::BackgroundAllowed
    }
}

impl fmt::Display for Mode {
    /// The notice printed when the shell enters this mode.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::ForegroundOnly => f.write_str("Entering foreground-only mode (& is now ignored)"),
            Mode::BackgroundAllowed => f.write_str("Exiting foreground-only mode"),
        }
    }
}

/// The only state shared with the signal handler.
pub(crate) struct ModeFlags {
    foreground_only: AtomicBool,
    pending: AtomicBool,
}

impl ModeFlags {
    pub(crate) const fn new() -> Self {
        Self {
            foreground_only: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }

    /// Flip the mode and mark a notice as pending. Async-signal-safe.
    pub(crate) fn toggle(&self) {
        self.foreground_only.fetch_xor(true, Ordering::SeqCst);
        self.pending.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mode(&self) -> Mode {
        if self.foreground_only.load(Ordering::SeqCst) {
            Mode::ForegroundOnly
        } else {
            Mode::BackgroundAllowed
        }
    }

    /// The mode to announce, if it changed since the last call.
    ///
    /// Several toggles between two calls produce a single notice for the final mode.
    pub(crate) fn take_notice(&self) -> Option<Mode> {
        self.pending
            .swap(false, Ordering::SeqCst)
            .then(|| self.mode())
    }

    /// The mode the next command is parsed under, and whether it still has to be announced.
    ///
    /// A toggle arriving after this call is left pending for the next prompt, so a command is
    /// never parsed under a mode the user has not been told about.
    pub(crate) fn observe(&self) -> (Mode, bool) {
        let mode = self.mode();
        match self.take_notice() {
            Some(latest) => (latest, true),
            None => (mode, false),
        }
    }
}

static MODE: ModeFlags = ModeFlags::new();

extern "C" fn on_toggle_signal(_signal: SignalNumber) {
    MODE.toggle();
}

/// Handle to the process-wide mode. Exists at most once at a time.
pub(crate) struct ModeController {
    flags: &'static ModeFlags,
    _handler: SignalHandler,
}

impl ModeController {
    pub(crate) const SIGNAL: SignalNumber = SIGTSTP;

    /// Install the toggle handler. Dropping the controller restores the previous disposition.
    pub(crate) fn install() -> Result<Self, Error> {
        let handler = SignalHandler::register(
            Self::SIGNAL,
            SignalHandlerBehavior::Catch(on_toggle_signal),
        )
        .map_err(|error| Error::SignalSetup {
            signal: Self::SIGNAL,
            error,
        })?;

        Ok(Self {
            flags: &MODE,
            _handler: handler,
        })
    }

    pub(crate) fn observe(&self) -> (Mode, bool) {
        self.flags.observe()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Mode, ModeController, ModeFlags};

    #[test]
    fn starts_with_background_allowed() {
        let flags = ModeFlags::new();
        assert_eq!(flags.mode(), Mode::BackgroundAllowed);
        assert_eq!(flags.take_notice(), None);
    }

    #[test]
    fn toggles_alternate() {
        let flags = ModeFlags::new();

        for count in 1..=6 {
            flags.toggle();
            let expected = if count % 2 == 1 {
                Mode::ForegroundOnly
            } else {
                Mode::BackgroundAllowed
            };
            assert_eq!(flags.mode(), expected);
            assert_eq!(flags.take_notice(), Some(expected));
            assert_eq!(flags.take_notice(), None);
        }
    }

    #[test]
    fn pending_notice_reports_the_latest_mode() {
        let flags = ModeFlags::new();
        flags.toggle();
        flags.toggle();
        flags.toggle();
        assert_eq!(flags.take_notice(), Some(Mode::ForegroundOnly));
        assert!(!flags.mode().background_allowed());
    }

    #[test]
    fn notices() {
        assert_eq!(
            Mode::ForegroundOnly.to_string(),
            "Entering foreground-only mode (& is now ignored)"
        );
        assert_eq!(
            Mode::BackgroundAllowed.to_string(),
            "Exiting foreground-only mode"
        );
    }

    #[test]
    fn observed_mode_is_stable_until_the_next_prompt() {
        let flags = ModeFlags::new();
        assert_eq!(flags.observe(), (Mode::BackgroundAllowed, false));

        flags.toggle();
        let (at_prompt, announce) = flags.observe();
        assert_eq!((at_prompt, announce), (Mode::ForegroundOnly, true));

        // a toggle after the prompt waits for the next one
        flags.toggle();
        assert_ne!(at_prompt, flags.mode());
        assert_eq!(flags.observe(), (Mode::BackgroundAllowed, true));
        assert_eq!(flags.observe(), (Mode::BackgroundAllowed, false));
    }

    #[test]
    fn delivered_signal_flips_the_mode() {
        let controller = ModeController::install().unwrap();
        // drain anything left by an earlier delivery
        let (before, _) = controller.observe();

        unsafe { libc::raise(ModeController::SIGNAL) };
        let (after, announce) = controller.observe();
        assert_ne!(after, before);
        assert!(announce);

        unsafe { libc::raise(ModeController::SIGNAL) };
        assert_eq!(controller.observe(), (before, true));
    }
}
