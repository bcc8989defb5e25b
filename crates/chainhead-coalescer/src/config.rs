//! Coalescer configuration.

use crate::error::{CoalescerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default quiescence window.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

/// Configuration for a head change coalescer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoalescerConfig {
    /// Quiescence window, measured from the first head change of a burst.
    #[serde(rename = "delay_ms", with = "duration_ms")]
    pub delay: Duration,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
        }
    }
}

impl CoalescerConfig {
    /// Creates a configuration with the given window.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Loads configuration from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: CoalescerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: CoalescerConfig =
            serde_yaml::from_str(&content).map_err(|e| CoalescerError::Yaml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// File-loaded configuration must carry a non-zero window.
    pub fn validate(&self) -> Result<()> {
        if self.delay.is_zero() {
            return Err(CoalescerError::InvalidConfig("delay_ms must be non-zero".into()));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis())
            .map_err(|_| S::Error::custom("delay_ms does not fit in u64"))?;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
