//! Factory configuration.

use std::collections::HashMap;
use std::time::Duration;

use informer_cache::DEFAULT_RELIST_BACKOFF;
use informer_core::ResourceKey;

/// Configuration for a [`SharedInformerFactory`](crate::SharedInformerFactory).
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Resync interval for informers without an override. Zero disables resync.
    pub default_resync: Duration,
    /// Restrict every informer to one namespace.
    pub namespace: Option<String>,
    /// Per-resource resync overrides.
    pub custom_resync: HashMap<ResourceKey, Duration>,
    /// Wait before relisting after a failed list or watch.
    pub relist_backoff: Duration,
    /// How long `shutdown` waits for informers to stop.
    pub shutdown_grace_period: Duration,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            default_resync: Duration::from_secs(600),
            namespace: None,
            custom_resync: HashMap::new(),
            relist_backoff: DEFAULT_RELIST_BACKOFF,
            shutdown_grace_period: Duration::from_secs(30),
        }
    }
}

impl FactoryConfig {
    /// Resync interval that applies to `resource`.
    pub fn resync_for(&self, resource: &ResourceKey) -> Duration {
        self.custom_resync
            .get(resource)
            .copied()
            .unwrap_or(self.default_resync)
    }
}
