use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::log::LogConfiguration;

// ISO 8601 timestamp, colored level, target module
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

const APPENDER: &str = "console";

impl LogConfiguration {
    /// Installs a `log4rs` configuration matching this `LogConfiguration`, replacing the one
    /// installed before.
    pub(in crate::log) fn set_config(&mut self) {
        let console = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();
        let loggers = self
            .module_levels
            .iter()
            .map(|(module, level)| Logger::builder().build(module.clone(), *level));
        let root = Root::builder().appender(APPENDER).build(self.global_level);
        let config = match Config::builder()
            .appender(Appender::builder().build(APPENDER, Box::new(console)))
            .loggers(loggers)
            .build(root)
        {
            Ok(config) => config,
            Err(error) => panic!("invalid logger configuration: {error}"),
        };

        match &mut self.root_handle {
            Some(handle) => handle.set_config(config),
            None => match log4rs::init_config(config) {
                Ok(handle) => self.root_handle = Some(handle),
                // Another logger owns the global slot; honor the level at least.
                Err(_) => log::set_max_level(self.global_level),
            },
        }
    }
}
