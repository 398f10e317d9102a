//! Domain error type.
//!
//! Every service and repository returns [`MissionBoardError`]. The web layer
//! converts it into [`AppError`], which picks the status code and hides the
//! detail of datastore failures from clients.

use missionboard_web::AppError;

/// Errors produced by MissionBoard services and repositories
#[derive(Debug, thiserror::Error)]
pub enum MissionBoardError {
    /// Entity does not exist (or is not visible to the caller)
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Kind of entity
        resource: &'static str,
        /// Requested identifier
        id: String,
    },

    /// Malformed input or a business rule rejected the request
    #[error("{0}")]
    Validation(String),

    /// Request conflicts with existing data
    #[error("{0}")]
    Conflict(String),

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    /// Datastore failure
    #[error("Database error: {0}")]
    Database(String),
}

impl MissionBoardError {
    /// Shorthand for [`MissionBoardError::NotFound`]
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`MissionBoardError::Validation`]
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for [`MissionBoardError::Conflict`]
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<sqlx::Error> for MissionBoardError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource: "Row",
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let what = db_err.constraint().unwrap_or("unique constraint");
                Self::Conflict(format!("Duplicate value violates {what}"))
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                let what = db_err.constraint().unwrap_or("foreign key");
                Self::Conflict(format!("Operation violates {what}"))
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for MissionBoardError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<MissionBoardError> for AppError {
    fn from(err: MissionBoardError) -> Self {
        match err {
            MissionBoardError::NotFound { resource, id } => Self::not_found(resource, id),
            MissionBoardError::Validation(message) => Self::validation(message),
            MissionBoardError::Conflict(message) => Self::conflict(message),
            MissionBoardError::Unauthorized(message) => Self::unauthorized(message),
            MissionBoardError::Forbidden(message) => Self::forbidden(message),
            MissionBoardError::Database(message) => Self::internal(message),
        }
    }
}

/// Result type for MissionBoard operations
pub type Result<T> = std::result::Result<T, MissionBoardError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (MissionBoardError::not_found("Event", "42"), StatusCode::NOT_FOUND),
            (MissionBoardError::validation("bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (MissionBoardError::conflict("dup"), StatusCode::CONFLICT),
            (
                MissionBoardError::Unauthorized("no token".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                MissionBoardError::Forbidden("admins only".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                MissionBoardError::Database("pool closed".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_not_found_message() {
        let err = MissionBoardError::not_found("Event", "42");
        assert_eq!(err.to_string(), "Event with id 42 not found");
        assert_eq!(AppError::from(err).message(), "Event with id 42 not found");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = MissionBoardError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, MissionBoardError::NotFound { .. }));
    }

    #[test]
    fn test_pool_timeout_maps_to_database() {
        let err = MissionBoardError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, MissionBoardError::Database(_)));
    }
}
