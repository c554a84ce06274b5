// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use env_logger::{Target, WriteStyle};
use log::{Level, LevelFilter, Log, Metadata, Record};

#[doc(hidden)]
pub use log as _log;

#[macro_export]
macro_rules! info {
    ($msg:literal, $($arg:tt)+) => {
        $crate::_log::info!(target: concat!("lda::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        $crate::_log::info!(target: concat!("lda::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! warn {
    ($msg:literal, $($arg:tt)+) => {
        $crate::_log::warn!(target: concat!("lda::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        $crate::_log::warn!(target: concat!("lda::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! error {
    ($msg:literal, $($arg:tt)+) => {
        $crate::_log::error!(target: concat!("lda::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        $crate::_log::error!(target: concat!("lda::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! debug {
    ($msg:literal, $($arg:tt)+) => {
        $crate::_log::debug!(target: concat!("lda::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        $crate::_log::debug!(target: concat!("lda::", module_path!()), $msg);
    };
}

/// Log device details at info level if the verbose info flag (`-i`) is set.
#[macro_export]
macro_rules! diagnostic {
    ($msg:literal, $($arg:tt)+) => {
        if $crate::is_diagnostics_enabled() {
            $crate::_log::info!(target: concat!("lda::", module_path!()), $msg, $($arg)+);
        }
    };
    ($msg:literal) => {
        if $crate::is_diagnostics_enabled() {
            $crate::_log::info!(target: concat!("lda::", module_path!()), $msg);
        }
    };
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);

static LOGGER: OnceLock<ConsoleLogger> = OnceLock::new();

#[inline]
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::Acquire)
}

/// Severity prefix printed in front of every message.
pub fn severity_prefix(level: Level) -> &'static str {
    match level {
        Level::Error => "[ERR]",
        Level::Warn => "[WARN]",
        Level::Info => "[INFO]",
        Level::Debug | Level::Trace => "[DEBUG]",
    }
}

/// Routes records to one of two `env_logger` sinks: informational output to stdout,
/// warnings and errors to stderr.
struct ConsoleLogger {
    stdout: env_logger::Logger,
    stderr: env_logger::Logger,
}

impl ConsoleLogger {
    fn new() -> Self {
        Self {
            stdout: sink(Target::Stdout, LevelFilter::Debug),
            stderr: sink(Target::Stderr, LevelFilter::Warn),
        }
    }

    fn route(&self, level: Level) -> &env_logger::Logger {
        if level <= Level::Warn {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

fn sink(target: Target, level: LevelFilter) -> env_logger::Logger {
    env_logger::Builder::new()
        .target(target)
        .filter_level(level)
        .write_style(WriteStyle::Never)
        .format(|buf, record| {
            writeln!(buf, "{} {}", severity_prefix(record.level()), record.args())
        })
        .build()
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && self.route(metadata.level()).enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if record.level() <= log::max_level() {
            self.route(record.level()).log(record);
        }
    }

    fn flush(&self) {
        self.stdout.flush();
        self.stderr.flush();
    }
}

/// Initialize the logging.
///
/// Meant to be called once at the start of the program. `quiet` suppresses informational
/// output (warnings and errors are always shown), `with_diagnostics` enables the
/// [`diagnostic!`] messages. Calling it again only updates the level and the diagnostics flag.
pub fn init_logging(quiet: bool, with_diagnostics: bool) {
    let _ = log::set_logger(LOGGER.get_or_init(ConsoleLogger::new));
    log::set_max_level(if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    });
    DIAGNOSTICS_ENABLED.store(with_diagnostics, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_prefix() {
        assert_eq!(severity_prefix(Level::Error), "[ERR]");
        assert_eq!(severity_prefix(Level::Warn), "[WARN]");
        assert_eq!(severity_prefix(Level::Info), "[INFO]");
    }

    #[test]
    fn test_routing() {
        let logger = ConsoleLogger::new();
        let metadata = |level| Metadata::builder().level(level).build();

        assert!(logger.stderr.enabled(&metadata(Level::Error)));
        assert!(logger.stderr.enabled(&metadata(Level::Warn)));
        assert!(!logger.stderr.enabled(&metadata(Level::Info)));
        assert!(logger.stdout.enabled(&metadata(Level::Info)));
        assert!(logger.stdout.enabled(&metadata(Level::Debug)));

        assert!(std::ptr::eq(logger.route(Level::Warn), &logger.stderr));
        assert!(std::ptr::eq(logger.route(Level::Info), &logger.stdout));
    }

    #[test]
    fn test_init_sets_level_and_diagnostics() {
        init_logging(true, true);
        assert_eq!(log::max_level(), LevelFilter::Warn);
        assert!(is_diagnostics_enabled());

        init_logging(false, false);
        assert_eq!(log::max_level(), LevelFilter::Info);
        assert!(!is_diagnostics_enabled());
    }
}
