//! Error types for the reconcile server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the reconcile server
#[derive(Debug, Error)]
pub enum Error {
    // Agent errors (2000-2999)
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent already exists: {0}")]
    AgentAlreadyExists(String),

    // Workspace errors (3000-3999)
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Workspace already exists for agent: {0}")]
    WorkspaceAlreadyExists(String),

    #[error("Desired state not settable: {0}")]
    DesiredStateNotSettable(String),

    // Reconcile errors (4000-4999)
    #[error("Invalid workspace state: {0}")]
    InvalidWorkspaceState(String),

    #[error("Invalid update type: {0}")]
    InvalidUpdateType(String),

    // Infrastructure errors (6000-6999)
    #[error("Database error: {0}")]
    DatabaseError(String),

    // General errors (1000-1999)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the error code
    pub fn code(&self) -> u32 {
        match self {
            // Agent errors (2000-2999)
            Error::AgentNotFound(_) => 2001,
            Error::AgentAlreadyExists(_) => 2002,

            // Workspace errors (3000-3999)
            Error::WorkspaceNotFound(_) => 3001,
            Error::WorkspaceAlreadyExists(_) => 3002,
            Error::DesiredStateNotSettable(_) => 3003,

            // Reconcile errors (4000-4999)
            Error::InvalidWorkspaceState(_) => 4001,
            Error::InvalidUpdateType(_) => 4002,

            // Infrastructure errors (6000-6999)
            Error::DatabaseError(_) => 6001,

            // General errors (1000-1999)
            Error::Internal(_) => 1001,
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::AgentNotFound(_) | Error::WorkspaceNotFound(_) => StatusCode::NOT_FOUND,

            Error::AgentAlreadyExists(_) | Error::WorkspaceAlreadyExists(_) => {
                StatusCode::CONFLICT
            }

            Error::DesiredStateNotSettable(_)
            | Error::InvalidWorkspaceState(_)
            | Error::InvalidUpdateType(_) => StatusCode::BAD_REQUEST,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

// Implement From for common error types
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
