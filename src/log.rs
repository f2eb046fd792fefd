//! Process logger.
//!
//! Records go to an `env_logger` sink configured from `RUST_LOG`. While a
//! session runs with tracing switched on, records up to debug level are also
//! handed to a forwarding callback that turns them into debug console output.

use log::{LevelFilter, Log, Metadata, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{OnceLock, RwLock};

pub type ForwardSink = Box<dyn Fn(String) + Send + Sync>;

static LOGGER: OnceLock<AdapterLogger> = OnceLock::new();
static FORWARDING: AtomicBool = AtomicBool::new(false);

const FORWARD_LEVEL: LevelFilter = LevelFilter::Debug;

#[inline(always)]
pub fn is_forwarding() -> bool {
    FORWARDING.load(Ordering::SeqCst)
}

pub struct AdapterLogger {
    inner: env_logger::Logger,
    forward: RwLock<Option<ForwardSink>>,
}

impl AdapterLogger {
    fn new() -> Self {
        Self {
            inner: env_logger::Logger::from_default_env(),
            forward: RwLock::new(None),
        }
    }

    fn max_level(&self) -> LevelFilter {
        if is_forwarding() {
            self.inner.filter().max(FORWARD_LEVEL)
        } else {
            self.inner.filter()
        }
    }
}

/// Single console line of a forwarded record.
fn format_record(record: &Record) -> String {
    format!("[{}] {}: {}\n", record.level(), record.target(), record.args())
}

impl Log for AdapterLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata) || (is_forwarding() && metadata.level() <= FORWARD_LEVEL)
    }

    fn log(&self, record: &Record) {
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
        if is_forwarding() && record.level() <= FORWARD_LEVEL {
            if let Ok(forward) = self.forward.read() {
                if let Some(sink) = forward.as_ref() {
                    sink(format_record(record));
                }
            }
        }
    }

    fn flush(&self) {
        self.inner.flush()
    }
}

/// Install the process logger. Calling it again is a no-op.
pub fn init() {
    let logger = LOGGER.get_or_init(AdapterLogger::new);
    if log::set_logger(logger).is_ok() {
        log::set_max_level(logger.max_level());
    }
}

/// Start or stop forwarding records to `sink`.
///
/// The sink must not block on anything a logging call site may hold.
pub fn forward_to(sink: Option<ForwardSink>) {
    let Some(logger) = LOGGER.get() else {
        return;
    };
    let enable = sink.is_some();
    if let Ok(mut forward) = logger.forward.write() {
        *forward = sink;
    }
    FORWARDING.store(enable, Ordering::SeqCst);
    log::set_max_level(logger.max_level());
}

#[cfg(test)]
mod test {
    use super::*;
    use log::Level;

    #[test]
    fn test_format_record() {
        let line = format_record(
            &Record::builder()
                .level(Level::Debug)
                .target("remote")
                .args(format_args!("-> CONTINUE"))
                .build(),
        );
        assert_eq!(line, "[DEBUG] remote: -> CONTINUE\n");
    }
}
