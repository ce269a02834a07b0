//! Schedule normalization settings.

use chrono::TimeDelta;

/// Offsets applied when turning stop arrivals into trailer windows.
///
/// A trailer must be at the origin `preload_offset` before the driver
/// arrives, and stays attached until `drop_offset` after the driver reaches
/// the next stop.
///
/// # Examples
///
/// ```
/// use chrono::TimeDelta;
/// use u_trailerflow::schedule::ScheduleConfig;
///
/// let config = ScheduleConfig::default()
///     .with_preload_offset(TimeDelta::hours(4))
///     .with_drop_offset(TimeDelta::hours(2));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Subtracted from a stop's arrival to get the leg's ready time.
    pub preload_offset: TimeDelta,

    /// Added to the next stop's arrival to get the leg's release time.
    pub drop_offset: TimeDelta,

    /// Loading activity tag carried for reporting. Does not shape the network.
    pub loading_type: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            preload_offset: TimeDelta::hours(6),
            drop_offset: TimeDelta::hours(8),
            loading_type: "DAHK".into(),
        }
    }
}

impl ScheduleConfig {
    pub fn with_preload_offset(mut self, offset: TimeDelta) -> Self {
        self.preload_offset = offset;
        self
    }

    pub fn with_drop_offset(mut self, offset: TimeDelta) -> Self {
        self.drop_offset = offset;
        self
    }

    pub fn with_loading_type(mut self, tag: impl Into<String>) -> Self {
        self.loading_type = tag.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.preload_offset < TimeDelta::zero() {
            return Err(format!(
                "preload_offset must be non-negative, got {}",
                self.preload_offset
            ));
        }
        if self.drop_offset < TimeDelta::zero() {
            return Err(format!(
                "drop_offset must be non-negative, got {}",
                self.drop_offset
            ));
        }
        if self.loading_type.trim().is_empty() {
            return Err("loading_type must not be empty".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScheduleConfig::default();
        assert_eq!(config.preload_offset, TimeDelta::hours(6));
        assert_eq!(config.drop_offset, TimeDelta::hours(8));
        assert_eq!(config.loading_type, "DAHK");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_negative_offsets() {
        let config = ScheduleConfig::default().with_preload_offset(TimeDelta::hours(-1));
        assert!(config.validate().is_err());

        let config = ScheduleConfig::default().with_drop_offset(TimeDelta::minutes(-5));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_loading_type() {
        let config = ScheduleConfig::default().with_loading_type("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_offsets_allowed() {
        let config = ScheduleConfig::default()
            .with_preload_offset(TimeDelta::zero())
            .with_drop_offset(TimeDelta::zero());
        assert!(config.validate().is_ok());
    }
}
