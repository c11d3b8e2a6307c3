//! Lock manager configuration structures.

use serde::{Deserialize, Serialize};

/// Lock manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Number of independent lockable resources, fixed at startup.
    pub resource_count: usize,
    /// Bound on concurrently open handles across all resources.
    #[serde(default = "default_max_handles")]
    pub max_handles: usize,
    /// Bound on the in-memory event buffer, when event recording is on.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

const fn default_max_handles() -> usize {
    256
}

const fn default_event_buffer() -> usize {
    1024
}

impl Default for ManagerConfig {
    fn default() -> Self {
        // The original deployment shipped four devices.
        Self {
            resource_count: 4,
            max_handles: default_max_handles(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ManagerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.resource_count == 0 {
            return Err("resource_count must be greater than 0".into());
        }
        if self.max_handles == 0 {
            return Err("max_handles must be greater than 0".into());
        }
        if self.event_buffer == 0 {
            return Err("event_buffer must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message for parse failures or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = ManagerConfig::default();
        assert_eq!(cfg.resource_count, 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_resources_rejected() {
        let cfg = ManagerConfig {
            resource_count: 0,
            ..ManagerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_max_handles_rejected() {
        let cfg = ManagerConfig {
            max_handles: 0,
            ..ManagerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_json_str_applies_defaults() {
        let cfg = ManagerConfig::from_json_str(r#"{"resource_count": 2}"#).unwrap();
        assert_eq!(cfg.resource_count, 2);
        assert_eq!(cfg.max_handles, 256);
        assert_eq!(cfg.event_buffer, 1024);
    }

    #[test]
    fn test_from_json_str_rejects_invalid() {
        assert!(ManagerConfig::from_json_str(r#"{"resource_count": 0}"#).is_err());
        assert!(ManagerConfig::from_json_str(r#"{"resource_count": 1, "max_handles": 0}"#).is_err());
        assert!(ManagerConfig::from_json_str("not json").is_err());
    }
}
