//! Generic informer lookup by resource key.
//!
//! [`InformerRegistry`] resolves a runtime `group/version/resource` triple to
//! a type-erased [`GenericHandle`]. Each entry is a provider that obtains the
//! shared informer from the factory, so a lookup and a typed accessor for the
//! same type always reach the same informer instance.
//!
//! ```rust,ignore
//! let registry = InformerRegistry::builder()
//!     .factory(Arc::clone(&factory))
//!     .with_builtin_types()
//!     .register::<Widget>()
//!     .build()?;
//!
//! let handle = registry.lookup(&ResourceKey::new("", "internal", "pods"))?;
//! let pods = handle.lister().list(&Selector::everything());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use informer_cache::{GenericLister, SharedIndexInformer};
use informer_core::api::{
    admissionregistration, apps, autoscaling, batch, certificates, core as core_api, extensions,
    policy, rbac, settings, storage,
};
use informer_core::{InformerError, InformerResult, Resource, ResourceKey};
use tracing::{debug, trace};

use crate::factory::SharedInformerFactory;

#[cfg(feature = "fx-hash")]
type KeyHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;
#[cfg(not(feature = "fx-hash"))]
type KeyHasher = std::collections::hash_map::RandomState;

/// Type-erased access to a shared informer and its cache.
pub trait GenericInformer: Send + Sync {
    /// The underlying shared informer.
    fn informer(&self) -> Arc<SharedIndexInformer>;

    /// A lister over the informer's cache.
    fn lister(&self) -> GenericLister;
}

/// Handle returned by [`InformerRegistry::lookup`].
#[derive(Debug, Clone)]
pub struct GenericHandle {
    resource: ResourceKey,
    informer: Arc<SharedIndexInformer>,
}

impl GenericHandle {
    /// Pair a resource key with an informer.
    pub fn new(resource: ResourceKey, informer: Arc<SharedIndexInformer>) -> Self {
        Self { resource, informer }
    }

    /// The key this handle was looked up with.
    pub fn resource(&self) -> &ResourceKey {
        &self.resource
    }
}

impl GenericInformer for GenericHandle {
    fn informer(&self) -> Arc<SharedIndexInformer> {
        Arc::clone(&self.informer)
    }

    fn lister(&self) -> GenericLister {
        GenericLister::new(self.informer.indexer(), self.resource.group_resource())
    }
}

/// Obtains the shared informer for one resource type from the factory.
pub type InformerProvider =
    Arc<dyn Fn(&SharedInformerFactory) -> InformerResult<Arc<SharedIndexInformer>> + Send + Sync>;

/// Provider for a statically known resource type.
pub fn provider_for<K: Resource>() -> InformerProvider {
    Arc::new(|factory: &SharedInformerFactory| factory.informer_for::<K>())
}

/// Builder for [`InformerRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    factory: Option<Arc<SharedInformerFactory>>,
    entries: Vec<(ResourceKey, InformerProvider)>,
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("factory", &self.factory.is_some())
            .field(
                "entries",
                &self.entries.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the factory informers are obtained from. Required.
    pub fn factory(mut self, factory: Arc<SharedInformerFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Register `K` under its own resource key.
    pub fn register<K: Resource>(self) -> Self {
        self.register_provider(K::resource_key(), provider_for::<K>())
    }

    /// Register `K` under a different key, e.g. another version of the same type.
    pub fn register_as<K: Resource>(self, key: ResourceKey) -> Self {
        self.register_provider(key, provider_for::<K>())
    }

    /// Register an arbitrary provider.
    pub fn register_provider(mut self, key: ResourceKey, provider: InformerProvider) -> Self {
        self.entries.push((key, provider));
        self
    }

    /// Register every built-in resource type.
    pub fn with_builtin_types(self) -> Self {
        self
            // admissionregistration.k8s.io
            .register::<admissionregistration::ExternalAdmissionHookConfiguration>()
            .register::<admissionregistration::InitializerConfiguration>()
            // apps
            .register::<apps::ControllerRevision>()
            .register::<apps::StatefulSet>()
            // autoscaling
            .register::<autoscaling::HorizontalPodAutoscaler>()
            // batch
            .register::<batch::CronJob>()
            .register::<batch::Job>()
            // certificates.k8s.io
            .register::<certificates::CertificateSigningRequest>()
            // core
            .register::<core_api::ComponentStatus>()
            .register::<core_api::ConfigMap>()
            .register::<core_api::Endpoints>()
            .register::<core_api::Event>()
            .register::<core_api::LimitRange>()
            .register::<core_api::Namespace>()
            .register::<core_api::Node>()
            .register::<core_api::PersistentVolume>()
            .register::<core_api::PersistentVolumeClaim>()
            .register::<core_api::Pod>()
            .register::<core_api::PodTemplate>()
            .register::<core_api::ReplicationController>()
            .register::<core_api::ResourceQuota>()
            .register::<core_api::Secret>()
            .register::<core_api::Service>()
            .register::<core_api::ServiceAccount>()
            // extensions
            .register::<extensions::DaemonSet>()
            .register::<extensions::Deployment>()
            .register::<extensions::Ingress>()
            .register::<extensions::NetworkPolicy>()
            .register::<extensions::PodSecurityPolicy>()
            .register::<extensions::ReplicaSet>()
            .register::<extensions::ThirdPartyResource>()
            // policy
            .register::<policy::PodDisruptionBudget>()
            // rbac.authorization.k8s.io
            .register::<rbac::ClusterRole>()
            .register::<rbac::ClusterRoleBinding>()
            .register::<rbac::Role>()
            .register::<rbac::RoleBinding>()
            // settings.k8s.io
            .register::<settings::PodPreset>()
            // storage.k8s.io
            .register::<storage::StorageClass>()
    }

    /// Build the registry.
    ///
    /// # Errors
    ///
    /// Fails if no factory was set, a key has an empty resource, or the same
    /// key was registered twice.
    pub fn build(self) -> InformerResult<InformerRegistry> {
        let factory = self
            .factory
            .ok_or_else(|| InformerError::Configuration("factory is required".to_string()))?;

        let providers = DashMap::with_capacity_and_hasher(self.entries.len(), KeyHasher::default());
        let mut seen = HashSet::with_capacity(self.entries.len());
        for (key, provider) in self.entries {
            validate_key(&key)?;
            if !seen.insert(key.clone()) {
                return Err(InformerError::DuplicateRegistration { key });
            }
            providers.insert(key, provider);
        }

        debug!(resources = providers.len(), "built informer registry");
        Ok(InformerRegistry { factory, providers })
    }
}

fn validate_key(key: &ResourceKey) -> InformerResult<()> {
    if key.resource().is_empty() {
        return Err(InformerError::InvalidResourceKey {
            key: key.clone(),
            reason: "resource must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Maps resource keys to shared informers.
///
/// Lookups never hold a table lock while the provider runs, so concurrent
/// lookups for different resources do not serialize on each other.
pub struct InformerRegistry {
    factory: Arc<SharedInformerFactory>,
    providers: DashMap<ResourceKey, InformerProvider, KeyHasher>,
}

impl fmt::Debug for InformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InformerRegistry")
            .field("factory", &self.factory)
            .field("resources", &self.providers.len())
            .finish()
    }
}

impl InformerRegistry {
    /// Create a builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with every built-in type registered.
    pub fn with_builtin_types(factory: Arc<SharedInformerFactory>) -> InformerResult<Self> {
        RegistryBuilder::new()
            .factory(factory)
            .with_builtin_types()
            .build()
    }

    /// The factory informers are obtained from.
    pub fn factory(&self) -> &Arc<SharedInformerFactory> {
        &self.factory
    }

    /// Resolve `key` to its shared informer.
    ///
    /// The returned handle carries `key` exactly as given. The key must match
    /// a registration exactly; there is no partial or default-version matching.
    ///
    /// # Errors
    ///
    /// - [`InformerError::InvalidResourceKey`] if the resource is empty
    /// - [`InformerError::UnsupportedResource`] if nothing is registered for `key`
    /// - whatever the provider returns if construction fails
    pub fn lookup(&self, key: &ResourceKey) -> InformerResult<GenericHandle> {
        validate_key(key)?;

        let provider = match self.providers.get(key) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                trace!(resource = %key, "lookup miss");
                return Err(InformerError::UnsupportedResource { key: key.clone() });
            }
        };

        let informer = provider(&self.factory)?;
        trace!(resource = %key, "lookup hit");
        Ok(GenericHandle::new(key.clone(), informer))
    }

    /// Register a provider at runtime.
    ///
    /// # Errors
    ///
    /// Fails if `key` is invalid or already registered.
    pub fn register(&self, key: ResourceKey, provider: InformerProvider) -> InformerResult<()> {
        validate_key(&key)?;
        match self.providers.entry(key) {
            Entry::Occupied(entry) => Err(InformerError::DuplicateRegistration {
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                debug!(resource = %entry.key(), "registered resource");
                entry.insert(provider);
                Ok(())
            }
        }
    }

    /// Register `K` under its own key at runtime.
    pub fn register_resource<K: Resource>(&self) -> InformerResult<()> {
        self.register(K::resource_key(), provider_for::<K>())
    }

    /// Remove a registration. Informers already built stay in the factory.
    pub fn unregister(&self, key: &ResourceKey) -> bool {
        let removed = self.providers.remove(key).is_some();
        if removed {
            debug!(resource = %key, "unregistered resource");
        }
        removed
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.providers.contains_key(key)
    }

    /// Every registered key, sorted.
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<_> = self.providers.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
