//! Error taxonomy for desk operations.
//!
//! Validation and state errors are raised before any mutation. Store
//! failures are logged where they happen and surface as an opaque
//! [`DeskError::Internal`].

use thiserror::Error;

/// Failure reported by a [`DocumentStore`](crate::storage::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key was already taken.
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey { collection: &'static str, key: String },

    /// The backing store could not complete the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by every upward operation.
#[derive(Debug, Error, PartialEq)]
pub enum DeskError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// A two-step update applied its first write but not its second.
    #[error("inconsistent state for case {case_id}: {detail}")]
    Inconsistent { case_id: String, detail: String },

    #[error("authentication required")]
    Unauthenticated,

    #[error("internal error")]
    Internal,
}

impl DeskError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        DeskError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            DeskError::NotFound { .. } => "NOT_FOUND",
            DeskError::InvalidArgument(_) => "INVALID_ARGUMENT",
            DeskError::InvalidState(_) => "INVALID_STATE",
            DeskError::Forbidden(_) => "FORBIDDEN",
            DeskError::Conflict(_) => "CONFLICT",
            DeskError::Inconsistent { .. } => "INCONSISTENT",
            DeskError::Unauthenticated => "UNAUTHENTICATED",
            DeskError::Internal => "INTERNAL",
        }
    }
}

impl From<StoreError> for DeskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { collection, key } => {
                log::warn!("STORE_DUPLICATE_KEY collection={} key={}", collection, key);
                DeskError::Conflict(format!("{} already exists", key))
            }
            StoreError::Unavailable(detail) => {
                log::error!("STORE_FAILURE detail={}", detail);
                DeskError::Internal
            }
        }
    }
}

pub type DeskResult<T> = Result<T, DeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_is_opaque() {
        let err: DeskError = StoreError::Unavailable("socket closed on 10.0.0.3".to_string()).into();
        assert_eq!(err, DeskError::Internal);
        assert!(!err.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn test_duplicate_key_maps_to_conflict() {
        let err: DeskError = StoreError::DuplicateKey {
            collection: "missions",
            key: "CS-1".to_string(),
        }
        .into();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn test_not_found_message() {
        let err = DeskError::not_found("case", "CS-X");
        assert_eq!(err.to_string(), "case not found: CS-X");
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
