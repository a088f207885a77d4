use service_core::error::AppError;
use thiserror::Error;

/// Message shared by every session rejection so callers cannot tell them apart.
pub const NOT_AUTHENTICATED: &str = "User wasn't authenticated";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User with email : {0} already exist")]
    EmailAlreadyRegistered(String),

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("No tokens provided")]
    NoTokensProvided,

    #[error("Session not found or expired")]
    SessionInvalid,

    #[error("Session fingerprint mismatch")]
    FingerprintMismatch,
}

impl ServiceError {
    /// Rejections that should also wipe the caller's auth cookies.
    pub fn clears_cookies(&self) -> bool {
        matches!(
            self,
            ServiceError::NoTokensProvided
                | ServiceError::SessionInvalid
                | ServiceError::FingerprintMismatch
        )
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            e @ ServiceError::EmailAlreadyRegistered(_) => {
                AppError::BadRequest(anyhow::anyhow!(e.to_string()))
            }
            e @ (ServiceError::InvalidCredentials | ServiceError::NoTokensProvided) => {
                AppError::BadRequest(anyhow::anyhow!(e.to_string()))
            }
            ServiceError::SessionInvalid | ServiceError::FingerprintMismatch => {
                AppError::Unauthorized(anyhow::anyhow!(NOT_AUTHENTICATED))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_client_errors_are_bad_request() {
        assert_eq!(status_of(ServiceError::InvalidCredentials), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ServiceError::NoTokensProvided), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(ServiceError::EmailAlreadyRegistered("a@x.com".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_session_errors_are_unauthorized() {
        assert_eq!(status_of(ServiceError::SessionInvalid), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(ServiceError::FingerprintMismatch), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_errors_are_500() {
        assert_eq!(
            status_of(ServiceError::Internal(anyhow::anyhow!("signing failed"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_duplicate_email_message() {
        let err = ServiceError::EmailAlreadyRegistered("a@x.com".to_string());
        assert_eq!(err.to_string(), "User with email : a@x.com already exist");
    }
}
