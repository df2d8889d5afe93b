//! Builder for [`SharedInformerFactory`].

use std::sync::Arc;
use std::time::Duration;

use informer_cache::SourceProvider;
use informer_core::{InformerError, InformerResult, Resource, ResourceKey};

use crate::config::FactoryConfig;
use crate::factory::SharedInformerFactory;

/// Builder for creating a [`SharedInformerFactory`].
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use std::time::Duration;
/// use informer_cache::MemorySource;
/// use informer_factory::SharedInformerFactoryBuilder;
///
/// let factory = SharedInformerFactoryBuilder::new()
///     .source(Arc::new(MemorySource::new()))
///     .default_resync(Duration::from_secs(30))
///     .namespace("default")
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct SharedInformerFactoryBuilder {
    source: Option<Arc<dyn SourceProvider>>,
    config: FactoryConfig,
}

impl SharedInformerFactoryBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set where informers list and watch objects. Required.
    pub fn source(mut self, source: Arc<dyn SourceProvider>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the default resync interval.
    pub fn default_resync(mut self, period: Duration) -> Self {
        self.config.default_resync = period;
        self
    }

    /// Restrict all informers to a namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Override the resync interval for resource type `K`.
    pub fn resync_for<K: Resource>(self, period: Duration) -> Self {
        self.resync_for_key(K::resource_key(), period)
    }

    /// Override the resync interval for a resource key.
    pub fn resync_for_key(mut self, resource: ResourceKey, period: Duration) -> Self {
        self.config.custom_resync.insert(resource, period);
        self
    }

    /// Set the wait before relisting after a failure.
    pub fn relist_backoff(mut self, backoff: Duration) -> Self {
        self.config.relist_backoff = backoff;
        self
    }

    /// Set how long `shutdown` waits for informers.
    pub fn shutdown_grace_period(mut self, period: Duration) -> Self {
        self.config.shutdown_grace_period = period;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: FactoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the factory.
    ///
    /// # Errors
    ///
    /// Returns an error if no source was set or the namespace is empty.
    pub fn build(self) -> InformerResult<SharedInformerFactory> {
        let source = self
            .source
            .ok_or_else(|| InformerError::Configuration("source is required".to_string()))?;

        if matches!(self.config.namespace.as_deref(), Some("")) {
            return Err(InformerError::Configuration(
                "namespace must not be empty".to_string(),
            ));
        }

        Ok(SharedInformerFactory::new(source, self.config))
    }
}
