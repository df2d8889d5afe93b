//! Built-in resource types of the internal API version.
//!
//! Each type keeps its metadata typed and its `spec`/`status` schemaless;
//! informers only ever look at metadata.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::object::{Object, ObjectMeta, Resource};
use crate::resource_key::INTERNAL_VERSION;

/// API group names.
pub mod groups {
    /// admissionregistration.
    pub const ADMISSION_REGISTRATION: &str = "admissionregistration.k8s.io";
    /// apps.
    pub const APPS: &str = "apps";
    /// autoscaling.
    pub const AUTOSCALING: &str = "autoscaling";
    /// batch.
    pub const BATCH: &str = "batch";
    /// certificates.
    pub const CERTIFICATES: &str = "certificates.k8s.io";
    /// The core group.
    pub const CORE: &str = "";
    /// extensions.
    pub const EXTENSIONS: &str = "extensions";
    /// policy.
    pub const POLICY: &str = "policy";
    /// rbac.
    pub const RBAC: &str = "rbac.authorization.k8s.io";
    /// settings.
    pub const SETTINGS: &str = "settings.k8s.io";
    /// storage.
    pub const STORAGE: &str = "storage.k8s.io";
}

macro_rules! api_resource {
    ($(#[$doc:meta])* $ty:ident: $group:expr, $plural:literal, namespaced = $ns:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $ty {
            /// Standard object metadata.
            pub metadata: ObjectMeta,
            /// Desired state.
            #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
            pub spec: serde_json::Value,
            /// Observed state.
            #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
            pub status: serde_json::Value,
        }

        impl $ty {
            /// Create an object with the given metadata and empty body.
            #[must_use]
            pub fn new(metadata: ObjectMeta) -> Self {
                Self {
                    metadata,
                    ..Self::default()
                }
            }
        }

        impl Object for $ty {
            fn meta(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
                self
            }
        }

        impl Resource for $ty {
            const GROUP: &'static str = $group;
            const VERSION: &'static str = INTERNAL_VERSION;
            const PLURAL: &'static str = $plural;
            const KIND: &'static str = stringify!($ty);
            const NAMESPACED: bool = $ns;
        }
    };
}

/// Types of the `admissionregistration.k8s.io` group.
pub mod admissionregistration {
    use super::*;

    api_resource!(
        /// External admission webhook configuration.
        ExternalAdmissionHookConfiguration: groups::ADMISSION_REGISTRATION,
        "externaladmissionhookconfigurations", namespaced = false
    );
    api_resource!(
        /// Initializer configuration.
        InitializerConfiguration: groups::ADMISSION_REGISTRATION,
        "initializerconfigurations", namespaced = false
    );
}

/// Types of the `apps` group.
pub mod apps {
    use super::*;

    api_resource!(
        /// Immutable snapshot of controller state.
        ControllerRevision: groups::APPS, "controllerrevisions", namespaced = true
    );
    api_resource!(
        /// Stateful set of pods.
        StatefulSet: groups::APPS, "statefulsets", namespaced = true
    );
}

/// Types of the `autoscaling` group.
pub mod autoscaling {
    use super::*;

    api_resource!(
        /// Horizontal pod autoscaler.
        HorizontalPodAutoscaler: groups::AUTOSCALING, "horizontalpodautoscalers", namespaced = true
    );
}

/// Types of the `batch` group.
pub mod batch {
    use super::*;

    api_resource!(
        /// Scheduled job.
        CronJob: groups::BATCH, "cronjobs", namespaced = true
    );
    api_resource!(
        /// Run-to-completion job.
        Job: groups::BATCH, "jobs", namespaced = true
    );
}

/// Types of the `certificates.k8s.io` group.
pub mod certificates {
    use super::*;

    api_resource!(
        /// Certificate signing request.
        CertificateSigningRequest: groups::CERTIFICATES, "certificatesigningrequests",
        namespaced = false
    );
}

/// Types of the core group.
pub mod core {
    use super::*;

    api_resource!(
        /// Status of a control plane component.
        ComponentStatus: groups::CORE, "componentstatuses", namespaced = false
    );
    api_resource!(
        /// Configuration data.
        ConfigMap: groups::CORE, "configmaps", namespaced = true
    );
    api_resource!(
        /// Addresses backing a service.
        Endpoints: groups::CORE, "endpoints", namespaced = true
    );
    api_resource!(
        /// Cluster event.
        Event: groups::CORE, "events", namespaced = true
    );
    api_resource!(
        /// Per-namespace resource limits.
        LimitRange: groups::CORE, "limitranges", namespaced = true
    );
    api_resource!(
        /// Namespace.
        Namespace: groups::CORE, "namespaces", namespaced = false
    );
    api_resource!(
        /// Worker node.
        Node: groups::CORE, "nodes", namespaced = false
    );
    api_resource!(
        /// Storage volume.
        PersistentVolume: groups::CORE, "persistentvolumes", namespaced = false
    );
    api_resource!(
        /// Claim on a persistent volume.
        PersistentVolumeClaim: groups::CORE, "persistentvolumeclaims", namespaced = true
    );
    api_resource!(
        /// Pod.
        Pod: groups::CORE, "pods", namespaced = true
    );
    api_resource!(
        /// Pod template.
        PodTemplate: groups::CORE, "podtemplates", namespaced = true
    );
    api_resource!(
        /// Replication controller.
        ReplicationController: groups::CORE, "replicationcontrollers", namespaced = true
    );
    api_resource!(
        /// Aggregate resource quota.
        ResourceQuota: groups::CORE, "resourcequotas", namespaced = true
    );
    api_resource!(
        /// Secret data.
        Secret: groups::CORE, "secrets", namespaced = true
    );
    api_resource!(
        /// Service.
        Service: groups::CORE, "services", namespaced = true
    );
    api_resource!(
        /// Service account.
        ServiceAccount: groups::CORE, "serviceaccounts", namespaced = true
    );
}

/// Types of the `extensions` group.
pub mod extensions {
    use super::*;

    api_resource!(
        /// Daemon set.
        DaemonSet: groups::EXTENSIONS, "daemonsets", namespaced = true
    );
    api_resource!(
        /// Deployment.
        Deployment: groups::EXTENSIONS, "deployments", namespaced = true
    );
    api_resource!(
        /// Ingress.
        Ingress: groups::EXTENSIONS, "ingresses", namespaced = true
    );
    api_resource!(
        /// Network policy.
        NetworkPolicy: groups::EXTENSIONS, "networkpolicies", namespaced = true
    );
    api_resource!(
        /// Pod security policy.
        PodSecurityPolicy: groups::EXTENSIONS, "podsecuritypolicies", namespaced = false
    );
    api_resource!(
        /// Replica set.
        ReplicaSet: groups::EXTENSIONS, "replicasets", namespaced = true
    );
    api_resource!(
        /// Third-party resource definition.
        ThirdPartyResource: groups::EXTENSIONS, "thirdpartyresources", namespaced = false
    );
}

/// Types of the `policy` group.
pub mod policy {
    use super::*;

    api_resource!(
        /// Pod disruption budget.
        PodDisruptionBudget: groups::POLICY, "poddisruptionbudgets", namespaced = true
    );
}

/// Types of the `rbac.authorization.k8s.io` group.
pub mod rbac {
    use super::*;

    api_resource!(
        /// Cluster role.
        ClusterRole: groups::RBAC, "clusterroles", namespaced = false
    );
    api_resource!(
        /// Cluster role binding.
        ClusterRoleBinding: groups::RBAC, "clusterrolebindings", namespaced = false
    );
    api_resource!(
        /// Namespaced role.
        Role: groups::RBAC, "roles", namespaced = true
    );
    api_resource!(
        /// Namespaced role binding.
        RoleBinding: groups::RBAC, "rolebindings", namespaced = true
    );
}

/// Types of the `settings.k8s.io` group.
pub mod settings {
    use super::*;

    api_resource!(
        /// Pod preset.
        PodPreset: groups::SETTINGS, "podpresets", namespaced = true
    );
}

/// Types of the `storage.k8s.io` group.
pub mod storage {
    use super::*;

    api_resource!(
        /// Storage class.
        StorageClass: groups::STORAGE, "storageclasses", namespaced = false
    );
}
