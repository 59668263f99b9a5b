//! Bridge from the `log` facade to the frontend's log interface.
//!
//! Every module logs through `log::{debug, info, warn, error}`. Once the
//! frontend hands us its log callback, [`install`] routes those records to it.
//! Until then (and in unit tests that never install a sink) records are
//! dropped.

use lazy_static::lazy_static;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::RwLock;

/// Prefix put in front of every forwarded message so core output is easy to
/// spot in a shared frontend log.
pub const LOG_PREFIX: &str = "[MAME 2003] ";

/// Destination for formatted log lines.
pub trait LogSink: Send + Sync {
    fn write(&self, level: Level, message: &str);
}

lazy_static! {
    static ref LOGGER: RetroLogger = RetroLogger {
        sink: RwLock::new(None),
    };
}

/// `log::Log` implementation that forwards to the installed [`LogSink`].
pub struct RetroLogger {
    sink: RwLock<Option<Box<dyn LogSink>>>,
}

impl Log for RetroLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Ok(guard) = self.sink.read() else {
            return;
        };
        if let Some(sink) = guard.as_ref() {
            sink.write(record.level(), &format!("{LOG_PREFIX}{}", record.args()));
        }
    }

    fn flush(&self) {}
}

/// Route all `log` output to `sink`, replacing any previously installed sink.
///
/// The global logger can only be registered once per process; later calls just
/// swap the sink and adjust the level.
pub fn install(sink: Box<dyn LogSink>, max_level: LevelFilter) {
    if let Ok(mut guard) = LOGGER.sink.write() {
        *guard = Some(sink);
    }
    // Fails if another logger (ours or the host's) already owns the facade.
    let _ = log::set_logger(&*LOGGER);
    log::set_max_level(max_level);
}

/// Drop the current sink. Records logged afterwards are discarded.
pub fn uninstall() {
    if let Ok(mut guard) = LOGGER.sink.write() {
        *guard = None;
    }
}
