// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Simple UEFI backend for the [`log`] crate.
//!
//! Records are printed through firmware stdout. Which ones get printed follows [`log::max_level`], which a frontend
//! sets from the `log_level` directive once the configuration is loaded, using [`level_filter_for`].

use core::fmt::Write;

use alloc::boxed::Box;
use log::{LevelFilter, Metadata, Record};
use uefi::{runtime, system::with_stdout};

/// The highest `log_level` value.
pub const MAX_LOG_LEVEL: i32 = 4;

/// Maps a `log_level` value onto a [`LevelFilter`].
///
/// Level 0 only shows warnings and errors. Values out of range are clamped.
#[must_use = "Has no effect if the result is unused"]
pub const fn level_filter_for(level: i32) -> LevelFilter {
    match level {
        i32::MIN..=0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// A simple logging backend for UEFI.
#[derive(Default)]
pub struct UefiLogger;

impl UefiLogger {
    /// Constructs a new [`UefiLogger`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new() -> Self {
        Self
    }

    /// Constructs a new [`UefiLogger`], then immediately leaks it so that it can be used with `set_logger`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn static_new() -> &'static Self {
        Box::leak(Box::new(Self::new()))
    }
}

impl log::Log for UefiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let time = runtime::get_time().unwrap_or(runtime::Time::invalid());
            let level = record.level();
            let file = record.file().unwrap_or_default();
            let line = record.line().unwrap_or_default();
            let args = record.args();
            with_stdout(|stdout| {
                let _ = stdout.write_fmt(format_args!("[{time} {level} {file}:{line}] - {args}\n"));
            });
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_for() {
        assert_eq!(level_filter_for(-3), LevelFilter::Warn);
        assert_eq!(level_filter_for(0), LevelFilter::Warn);
        assert_eq!(level_filter_for(1), LevelFilter::Info);
        assert_eq!(level_filter_for(2), LevelFilter::Debug);
        assert_eq!(level_filter_for(MAX_LOG_LEVEL), LevelFilter::Trace);
        assert_eq!(level_filter_for(99), LevelFilter::Trace);
    }
}
