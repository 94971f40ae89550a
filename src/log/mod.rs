#![allow(unused_macros)]
use self::simple_logger::SimpleLogger;
use log::Log;
use std::ops::Deref;

mod simple_logger;

macro_rules! logger_macro {
    ($name:ident is $rule_level:ident to $target:expr, $d:tt) => {
        macro_rules! $name {
            ($d($d arg:tt)+) => (::log::log!(target: $target, ::log::Level::$rule_level, $d($d arg)+));
        }

        pub(crate) use $name;
    };
    ($name:ident is $rule_level:ident to $target:expr) => {
        logger_macro!($name is $rule_level to $target, $);
    };
}

logger_macro!(user_error is Error to "smallsh::user");

macro_rules! dev_logger_macro {
    ($name:ident is $rule_level:ident to $target:expr, $d:tt) => {
        macro_rules! $name {
            ($d($d arg:tt)+) => {
                if std::cfg!(feature = "dev") {
                    (::log::log!(
                        target: $target,
                        ::log::Level::$rule_level,
                        "{}: {}",
                        std::panic::Location::caller(),
                        format_args!($d($d arg)+)
                    ));
                }
            };
        }

        pub(crate) use $name;
    };
    ($name:ident is $rule_level:ident to $target:expr) => {
        dev_logger_macro!($name is $rule_level to $target, $);
    };
}

dev_logger_macro!(dev_warn is Warn to "smallsh::dev");
dev_logger_macro!(dev_info is Info to "smallsh::dev");

/// Routes log records to a sink based on the prefix of their target.
#[derive(Default)]
pub struct ShellLogger(Vec<(String, Box<dyn Log>)>);

impl ShellLogger {
    pub fn new(prefix: &'static str) -> Self {
        let mut logger: Self = Default::default();

        logger.add_logger("smallsh::user", SimpleLogger::to_stderr(prefix));

        #[cfg(feature = "dev")]
        {
            let path = option_env!("SMALLSH_DEV_LOGS")
                .map(|s| s.into())
                .unwrap_or_else(|| {
                    std::env::temp_dir().join(format!("smallsh-dev-{}.log", std::process::id()))
                });
            if let Ok(file_logger) = SimpleLogger::to_file(path, "") {
                logger.add_logger("smallsh::dev", file_logger);
            }
        }

        logger
    }

    pub fn into_global_logger(self) {
        // a logger installed earlier (e.g. by a test harness) wins
        if log::set_boxed_logger(Box::new(self)).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    }

    /// Add a logger for a specific prefix to the stack
    fn add_logger(
        &mut self,
        prefix: impl ToString + Deref<Target = str>,
        logger: impl Log + 'static,
    ) {
        let prefix = if prefix.ends_with("::") {
            prefix.to_string()
        } else {
            // given a prefix `my::prefix`, we want to match `my::prefix::somewhere`
            // but not `my::prefix_to_somewhere`
            format!("{}::", prefix.to_string())
        };
        self.0.push((prefix, Box::new(logger)))
    }

    fn matching<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a dyn Log> + 'a {
        self.0.iter().filter_map(move |(prefix, logger)| {
            let matches =
                target == &prefix[..prefix.len() - 2] || target.starts_with(prefix.as_str());
            matches.then_some(&**logger)
        })
    }
}

impl Log for ShellLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.level() <= log::STATIC_MAX_LEVEL
    }

    fn log(&self, record: &log::Record) {
        for logger in self.matching(record.target()) {
            logger.log(record);
        }
    }

    fn flush(&self) {
        for (_, l) in self.0.iter() {
            l.flush();
        }
    }
}
