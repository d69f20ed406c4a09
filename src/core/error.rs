//! Error kinds shared by every service and mapped per transport boundary.

use thiserror::Error;

/// Tagged outcome of a service call.
///
/// Each HTTP route group and the tool-protocol server maps these kinds to its
/// own transport codes; the services themselves never know about status codes.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Any credential/token problem. Collapsed on purpose so a caller cannot
    /// tell a bad signature from an expired token.
    #[error("authentication failed")]
    Unauthenticated,

    /// Input failed shape or bounds validation.
    #[error("{0}")]
    Invalid(String),

    /// The entity does not exist for this owner. Whether it exists at all is
    /// deliberately not observable.
    #[error("not found")]
    NotFound,

    /// The entity exists but belongs to someone else. Only the conversation
    /// surface distinguishes this from `NotFound`.
    #[error("access denied")]
    Forbidden,

    /// Anything unexpected. Detail stays server-side.
    #[error(transparent)]
    Server(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Server(err.into())
    }
}
