//! Service errors with HTTP status code mapping.

use http::StatusCode;
use thiserror::Error;

use crate::{authz::AuthzError, db::DbError};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Always rendered as the same generic message.
    #[error(transparent)]
    Unauthorized(#[from] AuthzError),

    #[error("Not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => Self::NotFound,
            DbError::Conflict(msg) => Self::Conflict(msg),
            DbError::Validation(msg) => Self::InvalidInput(msg),
            DbError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl ServiceError {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller. Server errors are logged and
    /// replaced with a generic message.
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "Internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }

    /// JSON error body.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.public_message(),
            "status": self.status_code().as_u16(),
        })
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::authz::{Action, ResourceKind};

    #[rstest]
    #[case(ServiceError::Unauthorized(AuthzError::unauthorized(ResourceKind::Task, Action::Destroy)), StatusCode::FORBIDDEN)]
    #[case(ServiceError::NotFound, StatusCode::NOT_FOUND)]
    #[case(ServiceError::InvalidInput("bad".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(ServiceError::Conflict("dup".into()), StatusCode::CONFLICT)]
    #[case(ServiceError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_status_codes(#[case] error: ServiceError, #[case] expected: StatusCode) {
        assert_eq!(error.status_code(), expected);
    }

    #[test]
    fn test_unauthorized_message_is_generic() {
        let err = ServiceError::from(AuthzError::unauthorized(ResourceKind::Patient, Action::View));
        assert_eq!(err.public_message(), "Not authorized");
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = ServiceError::from(DbError::Internal("lock poisoned".into()));
        let body = err.to_json();
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["status"], 500);
    }

    #[test]
    fn test_db_errors_map() {
        assert!(matches!(ServiceError::from(DbError::NotFound), ServiceError::NotFound));
        assert!(matches!(
            ServiceError::from(DbError::Conflict("x".into())),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from(DbError::Validation("x".into())),
            ServiceError::InvalidInput(_)
        ));
    }
}
