//! A logger that writes compact human readable lines to standard error.
//!
//! Stdout is reserved for the actual reports and prompts, so everything diagnostic goes to
//! stderr where it can be silenced or redirected without losing the session. Lines carry the
//! seconds since startup and the emitting module, which is usually enough to follow what the
//! resolver and the search were doing when something goes wrong.

use log::LevelFilter;
use std::time::Instant;
use yansi::Paint;

pub struct StderrLogger {
    start: Instant,
    max_level: LevelFilter,
}

impl StderrLogger {
    /// Install the logger as the global default with the given verbosity ceiling.
    pub fn install(max_level: LevelFilter) {
        let logger = Self {
            start: Instant::now(),
            max_level,
        };

        log::set_boxed_logger(Box::new(logger)).expect("a logger was already installed");
        log::set_max_level(max_level);
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let tag = match record.level() {
            log::Level::Error => "error:".red().bold(),
            log::Level::Warn => "warn:".yellow().bold(),
            log::Level::Info => "info:".green(),
            log::Level::Debug => "debug:".blue(),
            log::Level::Trace => "trace:".dim(),
        };

        let seconds = self.start.elapsed().as_secs_f64();
        eprintln!(
            "{} {tag} {} {}",
            format!("[{seconds:>8.3}s]").dim(),
            record.args(),
            format!("({})", record.target()).dim()
        );
    }

    fn flush(&self) {}
}
