//! Builder for assembling a [`LockManager`] from configuration.

use crate::config::ManagerConfig;
use crate::core::{EventSink, InMemoryEventSink, LockError, LockManager};

/// Fluent builder over [`ManagerConfig`] plus optional wiring that does
/// not belong in serialized configuration (event sinks).
pub struct ManagerBuilder {
    resource_count: usize,
    max_handles: usize,
    event_sink: Option<Box<dyn EventSink>>,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        let cfg = ManagerConfig::default();
        Self {
            resource_count: cfg.resource_count,
            max_handles: cfg.max_handles,
            event_sink: None,
        }
    }
}

impl ManagerBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a validated configuration, wiring a bounded in-memory
    /// event sink sized by the config.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InvalidConfig`] when validation fails.
    pub fn from_config(cfg: &ManagerConfig) -> Result<Self, LockError> {
        cfg.validate().map_err(LockError::InvalidConfig)?;
        Ok(Self {
            resource_count: cfg.resource_count,
            max_handles: cfg.max_handles,
            event_sink: Some(Box::new(InMemoryEventSink::new(cfg.event_buffer))),
        })
    }

    /// Set the number of managed resources.
    #[must_use]
    pub fn with_resource_count(mut self, count: usize) -> Self {
        self.resource_count = count;
        self
    }

    /// Bound the number of concurrently open handles.
    #[must_use]
    pub fn with_max_handles(mut self, limit: usize) -> Self {
        self.max_handles = limit;
        self
    }

    /// Attach an event sink recording admission decisions.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Build the manager.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InvalidConfig`] for a zero resource count or
    /// a zero handle bound.
    pub fn build(self) -> Result<LockManager, LockError> {
        if self.resource_count == 0 {
            return Err(LockError::InvalidConfig(
                "resource_count must be greater than 0".into(),
            ));
        }
        if self.max_handles == 0 {
            return Err(LockError::InvalidConfig(
                "max_handles must be greater than 0".into(),
            ));
        }
        let manager = LockManager::new(self.resource_count).with_max_handles(self.max_handles);
        Ok(match self.event_sink {
            Some(sink) => manager.with_event_sink(sink),
            None => manager,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_from_defaults() {
        let manager = ManagerBuilder::new().build().unwrap();
        assert_eq!(manager.resource_count(), 4);
    }

    #[test]
    fn test_with_resource_count() {
        let manager = ManagerBuilder::new().with_resource_count(7).build().unwrap();
        assert_eq!(manager.resource_count(), 7);
    }

    #[test]
    fn test_zero_resources_rejected() {
        let err = ManagerBuilder::new().with_resource_count(0).build();
        assert!(matches!(err, Err(LockError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_config_validates() {
        let cfg = ManagerConfig {
            resource_count: 2,
            max_handles: 8,
            event_buffer: 16,
        };
        let manager = ManagerBuilder::from_config(&cfg).unwrap().build().unwrap();
        assert_eq!(manager.resource_count(), 2);

        let bad = ManagerConfig {
            resource_count: 0,
            max_handles: 8,
            event_buffer: 16,
        };
        assert!(ManagerBuilder::from_config(&bad).is_err());
    }

    #[test]
    fn test_handle_bound_flows_from_config() {
        use crate::core::CallerId;

        let cfg = ManagerConfig {
            resource_count: 1,
            max_handles: 1,
            event_buffer: 16,
        };
        let manager = ManagerBuilder::from_config(&cfg).unwrap().build().unwrap();
        let _held = manager.open(0, CallerId::new(1)).unwrap();
        assert_eq!(
            manager.open(0, CallerId::new(2)).unwrap_err(),
            LockError::HandleLimit(1)
        );
    }
}
