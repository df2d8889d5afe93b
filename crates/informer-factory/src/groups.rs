//! Typed accessors per API group and version.
//!
//! `factory.core().internal_version().pods()` reaches the same shared
//! informer as `factory.informer_for::<Pod>()`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use informer_cache::{Lister, SharedIndexInformer};
use informer_core::{api, InformerResult, Resource};

use crate::factory::SharedInformerFactory;
use crate::generic::GenericHandle;

/// Typed access to the shared informer of `K`.
pub struct ResourceInformer<'a, K> {
    factory: &'a SharedInformerFactory,
    _resource: PhantomData<fn() -> K>,
}

impl<K> Clone for ResourceInformer<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for ResourceInformer<'_, K> {}

impl<K: Resource> fmt::Debug for ResourceInformer<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceInformer")
            .field("resource", &K::resource_key())
            .finish()
    }
}

impl<'a, K: Resource> ResourceInformer<'a, K> {
    pub(crate) fn new(factory: &'a SharedInformerFactory) -> Self {
        Self {
            factory,
            _resource: PhantomData,
        }
    }

    /// The shared informer, constructed on first use.
    pub fn informer(&self) -> InformerResult<Arc<SharedIndexInformer>> {
        self.factory.informer_for::<K>()
    }

    /// Typed lister over the shared informer's cache.
    pub fn lister(&self) -> InformerResult<Lister<K>> {
        Ok(Lister::new(self.informer()?.indexer()))
    }

    /// Type-erased handle to the same informer.
    pub fn generic(&self) -> InformerResult<GenericHandle> {
        Ok(GenericHandle::new(K::resource_key(), self.informer()?))
    }
}

macro_rules! informer_group {
    (
        $(#[$meta:meta])*
        $accessor:ident => $group:ident, $version:ident {
            $( $method:ident => $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $group<'a> {
            factory: &'a SharedInformerFactory,
        }

        impl<'a> $group<'a> {
            /// Informers for the internal version of this group.
            pub fn internal_version(&self) -> $version<'a> {
                $version { factory: self.factory }
            }
        }

        #[doc = concat!("Internal version informers of [`", stringify!($group), "`].")]
        #[derive(Debug, Clone, Copy)]
        pub struct $version<'a> {
            factory: &'a SharedInformerFactory,
        }

        impl<'a> $version<'a> {
            $(
                #[doc = concat!("Informer for `", stringify!($ty), "`.")]
                pub fn $method(&self) -> ResourceInformer<'a, $ty> {
                    ResourceInformer::new(self.factory)
                }
            )*
        }

        impl SharedInformerFactory {
            #[doc = concat!("Informers of the `", stringify!($accessor), "` group.")]
            pub fn $accessor(&self) -> $group<'_> {
                $group { factory: self }
            }
        }
    };
}

informer_group! {
    /// Admission registration group.
    admissionregistration => AdmissionRegistrationGroup, AdmissionRegistrationInternal {
        external_admission_hook_configurations => api::admissionregistration::ExternalAdmissionHookConfiguration,
        initializer_configurations => api::admissionregistration::InitializerConfiguration,
    }
}

informer_group! {
    /// Apps group.
    apps => AppsGroup, AppsInternal {
        controller_revisions => api::apps::ControllerRevision,
        stateful_sets => api::apps::StatefulSet,
    }
}

informer_group! {
    /// Autoscaling group.
    autoscaling => AutoscalingGroup, AutoscalingInternal {
        horizontal_pod_autoscalers => api::autoscaling::HorizontalPodAutoscaler,
    }
}

informer_group! {
    /// Batch group.
    batch => BatchGroup, BatchInternal {
        cron_jobs => api::batch::CronJob,
        jobs => api::batch::Job,
    }
}

informer_group! {
    /// Certificates group.
    certificates => CertificatesGroup, CertificatesInternal {
        certificate_signing_requests => api::certificates::CertificateSigningRequest,
    }
}

informer_group! {
    /// Core (legacy, unnamed) group.
    core => CoreGroup, CoreInternal {
        component_statuses => api::core::ComponentStatus,
        config_maps => api::core::ConfigMap,
        endpoints => api::core::Endpoints,
        events => api::core::Event,
        limit_ranges => api::core::LimitRange,
        namespaces => api::core::Namespace,
        nodes => api::core::Node,
        persistent_volumes => api::core::PersistentVolume,
        persistent_volume_claims => api::core::PersistentVolumeClaim,
        pods => api::core::Pod,
        pod_templates => api::core::PodTemplate,
        replication_controllers => api::core::ReplicationController,
        resource_quotas => api::core::ResourceQuota,
        secrets => api::core::Secret,
        services => api::core::Service,
        service_accounts => api::core::ServiceAccount,
    }
}

informer_group! {
    /// Extensions group.
    extensions => ExtensionsGroup, ExtensionsInternal {
        daemon_sets => api::extensions::DaemonSet,
        deployments => api::extensions::Deployment,
        ingresses => api::extensions::Ingress,
        network_policies => api::extensions::NetworkPolicy,
        pod_security_policies => api::extensions::PodSecurityPolicy,
        replica_sets => api::extensions::ReplicaSet,
        third_party_resources => api::extensions::ThirdPartyResource,
    }
}

informer_group! {
    /// Policy group.
    policy => PolicyGroup, PolicyInternal {
        pod_disruption_budgets => api::policy::PodDisruptionBudget,
    }
}

informer_group! {
    /// RBAC group.
    rbac => RbacGroup, RbacInternal {
        cluster_roles => api::rbac::ClusterRole,
        cluster_role_bindings => api::rbac::ClusterRoleBinding,
        roles => api::rbac::Role,
        role_bindings => api::rbac::RoleBinding,
    }
}

informer_group! {
    /// Settings group.
    settings => SettingsGroup, SettingsInternal {
        pod_presets => api::settings::PodPreset,
    }
}

informer_group! {
    /// Storage group.
    storage => StorageGroup, StorageInternal {
        storage_classes => api::storage::StorageClass,
    }
}
