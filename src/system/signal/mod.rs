//! Utilities to handle signals.
use std::borrow::Cow;

mod handler;
mod set;

pub(crate) use handler::{SignalHandler, SignalHandlerBehavior};

pub(crate) type SignalNumber = libc::c_int;

macro_rules! define_consts {
    ($($signal:ident,)*) => {
        pub(crate) mod consts {
            pub(crate) use libc::{$($signal,)*};
        }

        pub(crate) fn signal_name(signal: SignalNumber) -> Cow<'static, str> {
            match signal {
                $(consts::$signal => stringify!($signal).into(),)*
                _ => format!("unknown signal #{signal}").into(),
            }
        }
    };
}

define_consts! {
    SIGINT,
    SIGQUIT,
    SIGTSTP,
    SIGTERM,
    SIGHUP,
    SIGALRM,
    SIGPIPE,
    SIGUSR1,
    SIGUSR2,
    SIGCHLD,
    SIGCONT,
    SIGTTIN,
    SIGTTOU,
    SIGKILL,
    SIGSTOP,
}
