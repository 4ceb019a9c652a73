//! The `log` module defines an interface to polycast's internal logging facilities.
//!
//! It (re)exports the five logging macros: `error!`, `warn!`, `info!`, `debug!` and `trace!`,
//! where `error!` carries the highest-priority messages and `trace!` the lowest. Applications
//! embedding polycast can use them too:
//!
//! ```rust
//! use polycast::log::info;
//!
//! pub fn register_everything() {
//!     info!("registering implementations");
//! }
//! ```
//!
//! Logging is _disabled_ by default. It is controlled programmatically with:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only log messages with priority at least `level`
//!
//! or declaratively through [`crate::config::Config::apply_logging`]. Per-module filtering is
//! configured using `set_module_filter()` / `set_module_filters()` and `remove_module_filter()`:
//!
//! ```rust
//! use polycast::log::{set_module_filter, set_log_level, LevelFilter};
//!
//! pub fn trace_synthesis() {
//!     set_log_level(LevelFilter::Info);
//!     // Show facet synthesis and registration details.
//!     set_module_filter("polycast::view", LevelFilter::Debug);
//!     set_module_filter("polycast::registry", LevelFilter::Debug);
//! }
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

use std::collections::BTreeMap;
use std::sync::{LazyLock, Mutex, MutexGuard};

pub use log::{debug, error, info, trace, warn, LevelFilter};
#[cfg(feature = "logging")]
use log4rs::Handle;

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// The installed logging state: a global level, per-module overrides keyed by module path (e.g.
/// `"polycast::view"`) and, with the `logging` feature, the handle of the installed logger.
///
/// Loggers are process-wide, so there is a single instance behind the free functions below.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// `LevelFilter::Off` disables logging entirely.
    pub(in crate::log) global_level: LevelFilter,
    pub(in crate::log) module_levels: BTreeMap<String, LevelFilter>,

    #[cfg(feature = "logging")]
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_level: LevelFilter::Off,
            module_levels: BTreeMap::new(),

            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    fn set_global_level(&mut self, level: LevelFilter) {
        if self.global_level != level {
            self.global_level = level;
            self.set_config();
        }
    }

    /// Applies every `(module, level)` pair, reinstalling the logger once if anything changed.
    fn set_module_levels<I, S>(&mut self, levels: I)
    where
        I: IntoIterator<Item = (S, LevelFilter)>,
        S: Into<String>,
    {
        let mut changed = false;
        for (module, level) in levels {
            changed |= self.module_levels.insert(module.into(), level) != Some(level);
        }
        if changed {
            self.set_config();
        }
    }

    fn remove_module_level(&mut self, module: &str) {
        if self.module_levels.remove(module).is_some() {
            self.set_config();
        }
    }
}

/// Enables every log message. Equivalent to `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

pub fn set_log_level(level: LevelFilter) {
    log_configuration().set_global_level(level);
}

/// The global level currently installed.
pub fn log_level() -> LevelFilter {
    log_configuration().global_level
}

pub fn set_module_filter(module_path: &str, level: LevelFilter) {
    log_configuration().set_module_levels([(module_path, level)]);
}

/// Sets the level filters of several modules at once.
pub fn set_module_filters<I, S>(module_filters: I)
where
    I: IntoIterator<Item = (S, LevelFilter)>,
    S: Into<String>,
{
    log_configuration().set_module_levels(module_filters);
}

/// Removes the filter of `module_path`; the global level applies to it again.
pub fn remove_module_filter(module_path: &str) {
    log_configuration().remove_module_level(module_path);
}

fn log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}
