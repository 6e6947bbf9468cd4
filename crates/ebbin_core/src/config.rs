//! Scheduler configuration.
//!
//! # Invariants
//! - `default_limit >= 1`.
//! - `default_limit <= max_limit`.

use crate::review::due_set::DEFAULT_DUE_LIMIT;

/// Upper bound applied to caller-supplied limits.
pub const MAX_SCHEDULE_LIMIT: u32 = 100;

/// Tunables for due selection and schedule generation.
///
/// Fields are private so every instance has passed `validate()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    default_limit: u32,
    max_limit: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_DUE_LIMIT,
            max_limit: MAX_SCHEDULE_LIMIT,
        }
    }
}

impl ScheduleConfig {
    /// Builds a validated config.
    ///
    /// # Errors
    /// - Returns an error when `default_limit` is zero.
    /// - Returns an error when `default_limit > max_limit`.
    pub fn new(default_limit: u32, max_limit: u32) -> Result<Self, String> {
        let config = Self {
            default_limit,
            max_limit,
        };
        config.validate()?;
        Ok(config)
    }

    /// Limit used when the caller passes none.
    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Larger requested limits are clamped to this value.
    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.default_limit == 0 {
            return Err("default_limit must be a positive integer".to_string());
        }
        if self.default_limit > self.max_limit {
            return Err(format!(
                "default_limit {} exceeds max_limit {}",
                self.default_limit, self.max_limit
            ));
        }
        Ok(())
    }
}
