//! Tuning knobs for threaded machines.

use super::{DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_POLL_PERIOD};
use crate::builder::BuildError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration applied when a builder is finalized.
///
/// Only threaded machines use these values; an immediate machine has an
/// unbounded queue and never polls.
///
/// # Example
///
/// ```rust
/// use statecraft::engine::MachineConfig;
/// use std::time::Duration;
///
/// let config: MachineConfig = serde_json::from_str(r#"{ "poll_period": 25 }"#).unwrap();
///
/// assert_eq!(config.poll_period, Duration::from_millis(25));
/// assert_eq!(config.event_queue_capacity, 50);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Capacity of the event channel and of the re-evaluation channel.
    pub event_queue_capacity: usize,

    /// Fallback guard re-evaluation period, in milliseconds on the wire.
    #[serde(with = "millis")]
    pub poll_period: Duration,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            poll_period: DEFAULT_POLL_PERIOD,
        }
    }
}

impl MachineConfig {
    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.event_queue_capacity == 0 {
            return Err(BuildError::InvalidConfig(
                "event_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.poll_period.is_zero() {
            return Err(BuildError::InvalidConfig(
                "poll_period must be longer than zero".to_string(),
            ));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let config = MachineConfig::default();

        assert_eq!(config.event_queue_capacity, 50);
        assert_eq!(config.poll_period, Duration::from_millis(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_values_are_rejected() {
        let no_queue = MachineConfig::default().with_event_queue_capacity(0);
        let no_poll = MachineConfig::default().with_poll_period(Duration::ZERO);

        assert!(matches!(no_queue.validate(), Err(BuildError::InvalidConfig(_))));
        assert!(matches!(no_poll.validate(), Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn config_serializes_poll_period_as_millis() {
        let config = MachineConfig::default()
            .with_event_queue_capacity(8)
            .with_poll_period(Duration::from_millis(40));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["poll_period"], 40);
        assert_eq!(json["event_queue_capacity"], 8);

        let back: MachineConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: MachineConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config, MachineConfig::default());
    }
}
