//! Error types for informer operations.
//!
//! This module provides [`InformerError`], the single error type shared by
//! the registry, the informer factory, the stores and the listers.

use crate::{GroupResource, ResourceKey};

/// Error type for informer operations.
///
/// Registry lookups, lister reads and informer construction all report
/// failures through this type. A registry lookup returns whatever error its
/// provider produced, unchanged. The factory reports a source that cannot
/// serve a resource as [`InformerError::ConstructionFailed`], with the
/// source's error kept in the `source` field.
///
/// # Example
///
/// ```rust
/// use informer_core::{InformerError, ResourceKey};
///
/// let err = InformerError::UnsupportedResource {
///     key: ResourceKey::new("", "internal", "widgets"),
/// };
/// assert!(err.to_string().contains("widgets"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum InformerError {
    /// No provider is registered for the requested resource key.
    #[error("no informer found for {key}")]
    UnsupportedResource {
        /// The key that was requested.
        key: ResourceKey,
    },

    /// A provider is already registered for this key.
    #[error("an informer provider is already registered for {key}")]
    DuplicateRegistration {
        /// The key registered twice.
        key: ResourceKey,
    },

    /// The resource key cannot identify any resource type.
    #[error("invalid resource key {key}: {reason}")]
    InvalidResourceKey {
        /// The rejected key.
        key: ResourceKey,
        /// Why the key was rejected.
        reason: String,
    },

    /// Object is not present in the informer's store.
    #[error("{resource} \"{name}\" not found")]
    NotFound {
        /// Resource the lookup was made against.
        resource: GroupResource,
        /// The requested object name.
        name: String,
    },

    /// A provider or the factory failed to build an informer.
    #[error("failed to construct informer for {key}: {message}")]
    ConstructionFailed {
        /// The key whose informer could not be constructed.
        key: ResourceKey,
        /// Error message.
        message: String,
        /// Underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Initial list against the source failed.
    #[error("list failed for {resource}: {message}")]
    ListFailed {
        /// Resource being listed.
        resource: GroupResource,
        /// Error message.
        message: String,
    },

    /// Watch stream could not be opened or terminated with an error.
    #[error("watch failed for {resource}: {message}")]
    WatchFailed {
        /// Resource being watched.
        resource: GroupResource,
        /// Error message.
        message: String,
    },

    /// Event subscription was closed by its receiver.
    #[error("watch closed: watch_id={watch_id}")]
    WatchClosed {
        /// ID of the closed watch.
        watch_id: u64,
    },

    /// Object in the store is not of the type a typed lister expected.
    #[error("object in {resource} store is not a {expected}")]
    TypeMismatch {
        /// Resource of the store.
        resource: GroupResource,
        /// Rust type name that was expected.
        expected: &'static str,
    },

    /// Label selector could not be parsed.
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector {
        /// The selector text.
        selector: String,
        /// Parse failure.
        reason: String,
    },

    /// Index name is not configured on the store.
    #[error("index {0:?} does not exist")]
    UnknownIndex(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The factory or informer has been stopped.
    #[error("informer stopped")]
    Stopped,

    /// Unexpected internal error.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl InformerError {
    /// Create a construction error wrapping the underlying failure.
    pub fn construction<E>(key: ResourceKey, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConstructionFailed {
            key,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error from any error type.
    pub fn internal<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true for lister misses.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true when the registry had no provider for the key.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedResource { .. })
    }
}
