//! Resource identifiers.
//!
//! A [`ResourceKey`] names one resource type of the cluster API by group,
//! version and plural resource name. Keys compare exactly: no case folding,
//! no defaulting of the version, no wildcards.

use std::fmt;

/// The core API group, which has an empty name.
pub const CORE_GROUP: &str = "";

/// Version string of the internal (unversioned) API.
pub const INTERNAL_VERSION: &str = "internal";

/// Identifier of a resource type: group, version and resource name.
///
/// # Example
///
/// ```rust
/// use informer_core::{GroupVersion, ResourceKey};
///
/// let pods = ResourceKey::new("", "internal", "pods");
/// assert_eq!(pods, GroupVersion::new("", "internal").with_resource("pods"));
/// assert_ne!(pods, ResourceKey::new("", "v1", "pods"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    group: String,
    version: String,
    resource: String,
}

impl ResourceKey {
    /// Create a key from its three parts.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// API group, empty for the core group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// API version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Lower-case plural resource name.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Drop the version.
    #[must_use]
    pub fn group_resource(&self) -> GroupResource {
        GroupResource::new(self.group.clone(), self.resource.clone())
    }

    /// Drop the resource name.
    #[must_use]
    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(self.group.clone(), self.version.clone())
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "group={:?} version={:?} resource={:?}",
            self.group, self.version, self.resource
        )
    }
}

/// A resource without its version, used to scope lister results and errors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupResource {
    group: String,
    resource: String,
}

impl GroupResource {
    /// Create a group/resource pair.
    #[must_use]
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
        }
    }

    /// API group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Resource name.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

/// An API group at a particular version.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupVersion {
    group: String,
    version: String,
}

impl GroupVersion {
    /// Create a group/version pair.
    #[must_use]
    pub fn new(group: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
        }
    }

    /// The internal version of `group`.
    #[must_use]
    pub fn internal(group: impl Into<String>) -> Self {
        Self::new(group, INTERNAL_VERSION)
    }

    /// Build a full key for a resource of this group version.
    #[must_use]
    pub fn with_resource(&self, resource: impl Into<String>) -> ResourceKey {
        ResourceKey::new(self.group.clone(), self.version.clone(), resource)
    }

    /// API group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// API version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}
