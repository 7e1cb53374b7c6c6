//! Domain error model for the scheduling core.
//!
//! Errors are grouped by kind rather than by type name: validation failures
//! are fail-fast and happen before any lock or transaction is acquired;
//! conflicts and not-found outcomes are expected and translated by upper
//! layers; infrastructure failures are surfaced after rollback and never
//! recovered from inside the core.

use crate::db::RepositoryError;

/// Result alias used by the service layer.
pub type CoreResult<T> = Result<T, CoreError>;

/// Business conflicts surfaced to callers so they can re-query state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    /// The requested slot window intersects a blocking agenda entry.
    #[error("slot is not available")]
    SlotUnavailable,

    /// The listing is not in a status that allows photo scheduling, or a
    /// guarded status transition found the listing already moved.
    #[error("listing is not eligible for a photo session")]
    ListingNotEligible,

    /// The booking still awaits the photographer's decision.
    #[error("photo session is pending photographer approval")]
    PhotoSessionPending,

    /// The booking already reached a terminal state.
    #[error("photo session is already finalized")]
    PhotoSessionAlreadyFinal,

    /// The booking is in a state that cannot be cancelled.
    #[error("photo session cannot be cancelled")]
    PhotoSessionNotCancelable,

    /// A booking status transition outside the allowed state machine.
    #[error("session is not in a transitionable state")]
    TransitionNotAllowed,

    /// A uniqueness constraint was violated (e.g. duplicate service area).
    #[error("resource already exists")]
    AlreadyExists,
}

/// Error type for all scheduling core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed input rejected before any transaction is opened.
    #[error("validation failed on {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Caller identity missing or does not own the targeted resource.
    #[error("unauthorized: {0}")]
    Auth(String),

    /// Caller is authenticated but not allowed to act on the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// An expected business conflict.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Unrecoverable infrastructure failure (transaction management,
    /// collaborator I/O). Always surfaced after rollback.
    #[error("infrastructure failure: {message}")]
    Infra {
        message: String,
        #[source]
        source: Option<RepositoryError>,
    },
}

impl CoreError {
    /// Build a validation error for a named input field.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Build an infrastructure error without an underlying cause.
    pub fn infra(message: impl Into<String>) -> Self {
        CoreError::Infra {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a repository error as an infrastructure failure.
    pub fn infra_from(message: impl Into<String>, source: RepositoryError) -> Self {
        CoreError::Infra {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Whether the error is an expected business outcome rather than a bug
    /// or an outage.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            CoreError::Validation { .. }
                | CoreError::Auth(_)
                | CoreError::Forbidden(_)
                | CoreError::NotFound(_)
                | CoreError::Conflict(_)
        )
    }
}

/// Map a repository error into the domain, translating the explicit
/// not-found and conflict variants and treating everything else as
/// infrastructure.
pub fn map_repo_err(entity: &'static str, err: RepositoryError) -> CoreError {
    map_repo_err_conflict(entity, err, ConflictError::AlreadyExists)
}

/// Like [`map_repo_err`], selecting the conflict kind a store conflict
/// means in the calling context.
pub fn map_repo_err_conflict(
    entity: &'static str,
    err: RepositoryError,
    conflict: ConflictError,
) -> CoreError {
    match err {
        RepositoryError::NotFound { .. } => CoreError::NotFound(entity),
        RepositoryError::Conflict { .. } => CoreError::Conflict(conflict),
        other => CoreError::Infra {
            message: format!("repository failure on {entity}"),
            source: Some(other),
        },
    }
}
