//! Stands in for the `log4rs` backend when the `logging` feature is disabled. Only the level
//! reaches the `log` facade; module filters are recorded but have no effect.

use crate::log::LogConfiguration;

impl LogConfiguration {
    pub(in crate::log) fn set_config(&mut self) {
        log::set_max_level(self.global_level);
    }
}
