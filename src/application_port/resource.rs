use crate::application_port::AuthError;

/// Error taxonomy shared by the per-user resource services. Mutations of a
/// resource already in the desired state are not conflicts; they succeed as
/// no-ops and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("user not found")]
    UserNotFound,
    #[error("resource not found")]
    NotFound,
    #[error("store error: {0}")]
    Store(String),
}

impl From<AuthError> for DomainError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserNotFound => DomainError::UserNotFound,
            other => DomainError::Store(other.to_string()),
        }
    }
}
