use std::env;
use std::io::Write;

use crate::logger::{JsonEvent, get_json_event};
use crate::prelude::*;
use console::{Style, style};
use log::Log;
use simplelog::{CombinedLogger, SharedLogger};

/// Overrides the level picked from the command line, e.g. `CDETECT_LOG=trace`.
pub const LOG_LEVEL_ENV: &str = "CDETECT_LOG";

pub struct LocalLogger {
    log_level: log::LevelFilter,
}

impl LocalLogger {
    pub fn new(default_level: log::LevelFilter) -> Self {
        let log_level = env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|log_level| log_level.parse::<log::LevelFilter>().ok())
            .unwrap_or(default_level);

        LocalLogger { log_level }
    }
}

impl Log for LocalLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.log_level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if let Some(JsonEvent(json_string)) = get_json_event(record) {
            println!("{json_string}");
            return;
        }

        print_record(record);
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

/// Reports go to stdout as plain lines, diagnostics to stderr.
fn print_record(record: &log::Record) {
    match record.level() {
        log::Level::Error => {
            let prefix = style("\u{2717}").red().bold();
            let msg = Style::new().red().apply_to(record.args());
            eprintln!("{prefix} {msg}");
        }
        log::Level::Warn => {
            let prefix = style("\u{25B2}").yellow();
            let msg = Style::new().yellow().apply_to(record.args());
            eprintln!("{prefix} {msg}");
        }
        log::Level::Info => {
            println!("{}", record.args());
        }
        log::Level::Debug => {
            let prefix = style("\u{00B7}").dim();
            let msg = Style::new()
                .blue()
                .dim()
                .apply_to(format!("{}", record.args()));
            eprintln!("{prefix} {msg}");
        }
        log::Level::Trace => {
            let msg = Style::new().black().dim().apply_to(format!(
                "[TRACE::{}] {}",
                record.target(),
                record.args()
            ));
            eprintln!("{msg}");
        }
    }
}

impl SharedLogger for LocalLogger {
    fn level(&self) -> log::LevelFilter {
        self.log_level
    }

    fn config(&self) -> Option<&simplelog::Config> {
        None
    }

    fn as_log(self: Box<Self>) -> Box<dyn Log> {
        Box::new(*self)
    }
}

pub fn init_local_logger(default_level: log::LevelFilter) -> Result<()> {
    let logger: Box<dyn SharedLogger> = Box::new(LocalLogger::new(default_level));
    CombinedLogger::init(vec![logger])?;
    Ok(())
}

pub fn clean_logger() {
    log::logger().flush();
}
