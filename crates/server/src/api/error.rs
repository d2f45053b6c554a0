//! HTTP error mapping for domain errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use raffle_core::{OrchestratorError, SaleError, TicketError};

/// Error returned by handlers. Rendered as `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Printing needs an image renderer.
    pub fn printing_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Printing not available. Check that [renderer] is configured.",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Request failed");
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<TicketError> for ApiError {
    fn from(e: TicketError) -> Self {
        match e {
            TicketError::NotFound(_) => Self::not_found(e.to_string()),
            TicketError::Conflict { .. } | TicketError::InvalidState { .. } => {
                Self::conflict(e.to_string())
            }
            TicketError::Database(_) => Self::internal(e.to_string()),
        }
    }
}

impl From<SaleError> for ApiError {
    fn from(e: SaleError) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::EmptyRange { .. } | OrchestratorError::UnknownTemplate(_) => {
                Self::bad_request(e.to_string())
            }
            OrchestratorError::JobNotFound(_) => Self::not_found(e.to_string()),
            OrchestratorError::InvalidState { .. }
            | OrchestratorError::AlreadyRunning(_)
            | OrchestratorError::Cancelled => Self::conflict(e.to_string()),
            OrchestratorError::TicketStore(inner) => inner.into(),
            OrchestratorError::JobStore(_) | OrchestratorError::CodeAssignment(_) => {
                Self::internal(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raffle_core::{Category, JobStatus};

    #[test]
    fn test_orchestrator_error_status() {
        let cases = [
            (
                OrchestratorError::EmptyRange {
                    category: Category::A,
                    start: 5,
                    end: 1,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                OrchestratorError::UnknownTemplate("nope".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                OrchestratorError::JobNotFound("j".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                OrchestratorError::InvalidState {
                    job_id: "j".to_string(),
                    status: JobStatus::Completed,
                    operation: "retry".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                OrchestratorError::AlreadyRunning("j".to_string()),
                StatusCode::CONFLICT,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status(), expected);
        }
    }

    #[test]
    fn test_ticket_error_status() {
        assert_eq!(
            ApiError::from(TicketError::NotFound("t".to_string())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TicketError::Database("locked".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
