//! # Memory Configuration
//!
//! Debug fill patterns and leak policy, loaded once at startup.
//!
//! ```toml
//! fill_memory = true
//! uninit_pattern = 0xCD
//! freed_pattern = 0xDD
//! leak_policy = "abort"
//! ```
//!
//! Fill patterns only apply in builds with allocation headers
//! (`debug_assertions`). The installed config is process-wide.

use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, MemoryResult};

/// What the teardown leak check does when allocations are still live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeakPolicy {
    /// Log the leak at error level and abort the process.
    Abort,
    /// Log the leak at error level and continue.
    Log,
}

/// Process-wide memory diagnostics configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Fill fresh and released bytes with the patterns below.
    pub fill_memory: bool,
    /// Byte written into freshly allocated, not yet constructed memory.
    pub uninit_pattern: u8,
    /// Byte written over memory right before it is released.
    pub freed_pattern: u8,
    /// Teardown behavior when the global counters are not back at zero.
    pub leak_policy: LeakPolicy,
}

impl MemoryConfig {
    /// The configuration used until [`install`] is called.
    pub const DEFAULT: Self = Self {
        fill_memory: true,
        uninit_pattern: 0xCD,
        freed_pattern: 0xDD,
        leak_policy: LeakPolicy::Abort,
    };

    /// Parses a configuration from TOML text.
    ///
    /// Missing keys fall back to [`MemoryConfig::DEFAULT`].
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::ConfigParse`] on malformed TOML and
    /// [`MemoryError::InvalidConfig`] when validation fails.
    pub fn from_toml_str(text: &str) -> MemoryResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::ConfigIo`] if the file cannot be read, otherwise
    /// the same errors as [`MemoryConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] when filling is enabled but both
    /// patterns are the same byte, which would make use-after-free
    /// indistinguishable from use-before-init.
    pub fn validate(&self) -> MemoryResult<()> {
        if self.fill_memory && self.uninit_pattern == self.freed_pattern {
            return Err(MemoryError::InvalidConfig(format!(
                "uninit_pattern and freed_pattern must differ (both 0x{:02X})",
                self.uninit_pattern
            )));
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static CURRENT: RwLock<MemoryConfig> = parking_lot::const_rwlock(MemoryConfig::DEFAULT);

/// Installs `config` as the process-wide configuration.
///
/// Allocations made before the call keep whatever bytes they were filled
/// with; only later allocator calls observe the new patterns.
pub fn install(config: MemoryConfig) {
    *CURRENT.write() = config;
    tracing::debug!(
        fill_memory = config.fill_memory,
        uninit_pattern = config.uninit_pattern,
        freed_pattern = config.freed_pattern,
        leak_policy = ?config.leak_policy,
        "memory config installed"
    );
}

/// Returns a copy of the installed configuration.
#[inline]
#[must_use]
pub fn current() -> MemoryConfig {
    *CURRENT.read()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_keys() {
        let config = MemoryConfig::from_toml_str("fill_memory = false").unwrap();
        assert!(!config.fill_memory);
        assert_eq!(config.uninit_pattern, MemoryConfig::DEFAULT.uninit_pattern);
        assert_eq!(config.leak_policy, LeakPolicy::Abort);
    }

    #[test]
    fn test_full_config() {
        let text = r#"
            fill_memory = true
            uninit_pattern = 0xAB
            freed_pattern = 0xEF
            leak_policy = "log"
        "#;
        let config = MemoryConfig::from_toml_str(text).unwrap();
        assert_eq!(config.uninit_pattern, 0xAB);
        assert_eq!(config.freed_pattern, 0xEF);
        assert_eq!(config.leak_policy, LeakPolicy::Log);
    }

    #[test]
    fn test_identical_patterns_rejected() {
        let text = "uninit_pattern = 1\nfreed_pattern = 1";
        let err = MemoryConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidConfig(_)));

        // Irrelevant when filling is off.
        let text = "fill_memory = false\nuninit_pattern = 1\nfreed_pattern = 1";
        assert!(MemoryConfig::from_toml_str(text).is_ok());
    }

    #[test]
    fn test_malformed_toml() {
        let err = MemoryConfig::from_toml_str("leak_policy = \"explode\"").unwrap_err();
        assert!(matches!(err, MemoryError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = MemoryConfig::from_file("/nonexistent/oroboros_memory.toml").unwrap_err();
        assert!(matches!(err, MemoryError::ConfigIo(_)));
    }
}
