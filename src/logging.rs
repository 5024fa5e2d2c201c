//! The diagnostic side-channel: where the [`LazyClient`](crate::LazyClient) reports the failures
//! it does not return to its callers. Never used for the log entries themselves.

use std::env;
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::Mutex;

use slog::{o, Drain, Level, Logger, OwnedKVList, Record};
use slog_term::{CompactFormat, Decorator, TermDecorator};

use crate::config::LOG_LEVEL;

#[derive(Clone)]
struct FallbackToStderr<D: Drain> {
    drain: D,
}

impl<D: Drain> Drain for FallbackToStderr<D>
where
    D::Err: Display,
{
    type Ok = ();
    type Err = ();
    fn log(&self, record: &Record, logger_values: &OwnedKVList) -> Result<(), ()> {
        if let Err(err) = self.drain.log(record, logger_values) {
            write_drain_failure(&mut io::stderr().lock(), &err);
        }
        Ok(())
    }

    #[inline]
    fn is_enabled(&self, level: Level) -> bool {
        self.drain.is_enabled(level)
    }
}

// Last resort, so a failure to write is ignored.
fn write_drain_failure<W: Write>(out: &mut W, err: &dyn Display) {
    let _ = writeln!(out, "Diagnostic record lost, the drain failed with: {}", err);
}

/// Parses a level name such as `warn` or `debug`, falling back to `info`.
fn parse_level(name: &str) -> Level {
    name.trim().parse::<Level>().unwrap_or(Level::Info)
}

// Records are formatted and written on the calling thread, so nothing is queued when the process
// exits.
fn logger_with<D>(decorator: D, min_level: Level) -> Logger
where
    D: Decorator + Send + 'static,
{
    let drain = Mutex::new(CompactFormat::new(decorator).build())
        .filter_level(min_level)
        .map(|drain| FallbackToStderr { drain })
        .fuse();
    Logger::root(drain, o!("lib" => "cflog"))
}

/// Creates a logger writing compact lines to stderr, at `min_level` and above.
pub fn diagnostic_logger(min_level: Level) -> Logger {
    logger_with(TermDecorator::new().stderr().build(), min_level)
}

/// Like [`diagnostic_logger`], with the level read from `CFLOG_LOG_LEVEL`.
pub fn diagnostic_logger_from_env() -> Logger {
    let level = LOG_LEVEL.val_from(|name| env::var(name).ok());
    diagnostic_logger(parse_level(&level))
}
