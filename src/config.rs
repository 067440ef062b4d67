use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::interconnect::{Delays, CACHE_DELAY, CACHE_TRANSFER, DIRECTORY_DELAY};

/// Simulation parameters, loadable from TOML. Missing keys keep their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterconnectConfig {   // unit         default
    pub processors: usize,          //              4
    pub cache_delay: u64,           // ticks        10
    pub cache_transfer: u64,        // ticks        10
    pub directory_delay: u64,       // ticks        6
    pub memory_latency: u64,        // ticks        100
    pub max_ticks: u64,             // ticks        1_000_000
}

impl Default for InterconnectConfig {
    fn default() -> Self {
        InterconnectConfig {
            processors: 4,
            cache_delay: CACHE_DELAY,
            cache_transfer: CACHE_TRANSFER,
            directory_delay: DIRECTORY_DELAY,
            memory_latency: 100,
            max_ticks: 1_000_000,
        }
    }
}

impl InterconnectConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: InterconnectConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processors == 0 {
            return Err(ConfigError::NoProcessors);
        }
        Ok(())
    }

    pub fn delays(&self) -> Delays {
        Delays {
            cache_delay: self.cache_delay,
            cache_transfer: self.cache_transfer,
            directory_delay: self.directory_delay,
        }
    }
}
