//! Error types for the NoPass gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nopass_sandbox::DispatchError;
use thiserror::Error;

use crate::clients::ClientError;
use crate::stage::Stage;

/// Generic body for rejected input.
pub const BAD_REQUEST_BODY: &str = "bad request";
/// Generic body for every other failure.
pub const INTERNAL_ERROR_BODY: &str = "internal error";

/// Core error type for gateway operations.
///
/// # Security Notes
///
/// The display strings are for operator logs. HTTP responses only ever
/// carry [`BAD_REQUEST_BODY`] or [`INTERNAL_ERROR_BODY`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request failed validation.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A collaborator service failed or returned garbage.
    #[error("{service} service failed: {source}")]
    Collaborator {
        /// Which collaborator (`risk` or `output_safety`)
        service: &'static str,
        #[source]
        source: ClientError,
    },

    /// The execution environment failed or timed out.
    #[error("Execution failed: {0}")]
    Execution(#[from] DispatchError),

    /// The request deadline passed while in `stage`.
    #[error("Deadline exceeded during {stage}")]
    DeadlineExceeded {
        /// Last stage reached before the deadline passed
        stage: Stage,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true if the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error_response(self.status_code())
    }
}

/// Build the generic JSON error body for `status`.
pub fn error_response(status: StatusCode) -> Response {
    let message = if status.is_client_error() {
        BAD_REQUEST_BODY
    } else {
        INTERNAL_ERROR_BODY
    };
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
