//! Registry of named MCA devices.
//!
//! The registry is built once at startup and never mutated afterwards, so
//! lookups need no synchronization. Devices are stored as `Arc<dyn Mca>`
//! trait objects; the server never sees a concrete engine type.

use crate::core::Mca;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable mapping from device name to MCA.
#[derive(Default)]
pub struct McaRegistry {
    devices: BTreeMap<String, Arc<dyn Mca>>,
}

impl McaRegistry {
    /// Start an empty registry builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device under `name`. Builder-style; only used at startup.
    pub fn with_device(mut self, name: impl Into<String>, device: Arc<dyn Mca>) -> Self {
        self.devices.insert(name.into(), device);
        self
    }

    /// Look up a device by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Mca>> {
        self.devices.get(name)
    }

    /// Device names in stable (lexicographic) order.
    pub fn names(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    /// Request termination of every device's background task.
    pub fn shutdown_all(&self) {
        for device in self.devices.values() {
            device.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Snapshot;
    use async_trait::async_trait;

    struct StubMca;

    #[async_trait]
    impl Mca for StubMca {
        fn start(&self) {}
        fn stop(&self) {}
        async fn clear(&self) {}
        async fn snapshot(&self) -> Snapshot {
            Snapshot::empty(16)
        }
        fn is_running(&self) -> bool {
            false
        }
        fn channels(&self) -> usize {
            16
        }
        fn shutdown(&self) {}
    }

    #[test]
    fn test_lookup_and_ordered_names() {
        let registry = McaRegistry::new()
            .with_device("zeta", Arc::new(StubMca))
            .with_device("alpha", Arc::new(StubMca));

        assert!(registry.get("alpha").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }
}
