//! Error types for registry operations.

use thiserror::Error;

/// Errors that can occur when resolving a store by namespace.
///
/// Reading and writing a [`Store`](crate::Store) never fails; only the
/// namespace registry has failure modes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A namespace was requested for the first time without an initial state.
    #[error("no store registered under `{namespace}` and no initial state was supplied")]
    MissingInitialState { namespace: String },

    /// A pure lookup found nothing under the namespace.
    #[error("store not found: {namespace}")]
    StoreNotFound { namespace: String },

    /// The namespace holds a store of a different state type.
    #[error("store `{namespace}` does not hold state of type {expected}")]
    TypeMismatch {
        namespace: String,
        expected: &'static str,
    },
}

impl StoreError {
    /// The namespace the failed operation was addressing.
    pub fn namespace(&self) -> &str {
        match self {
            Self::MissingInitialState { namespace }
            | Self::StoreNotFound { namespace }
            | Self::TypeMismatch { namespace, .. } => namespace,
        }
    }
}

/// Convenience type alias for registry operations.
pub type Result<T> = std::result::Result<T, StoreError>;
