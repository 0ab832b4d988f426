use axum::http::StatusCode;
use axum_core::response::{IntoResponse as AxumCoreIntoResponse, Response};
use deploy_auth::AuthError;
use eyre::Report;

#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error(transparent)]
    Unexpected(#[from] Report),
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthError),
    #[error("Invalid upload request: {0}")]
    BadRequest(String),
    #[error("File too large, maximum is {max_mb}MB")]
    PayloadTooLarge { max_mb: u64 },
    #[error("Failed to read upload body: {0}")]
    Body(String),
    #[error("Failed to save upload: {0}")]
    Storage(String),
    #[error("Invalid receiver configuration: {0}")]
    Config(String),
}

/// Trait implementation to convert this error into an axum http response
impl AxumCoreIntoResponse for ReceiverError {
    fn into_response(self) -> Response {
        match self {
            ReceiverError::Authentication(ref auth) if auth.is_rejection() => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            bad_request_error @ ReceiverError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, bad_request_error.to_string()).into_response()
            }
            too_large_error @ ReceiverError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, too_large_error.to_string()).into_response()
            }
            ReceiverError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save file").into_response()
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something wrong happened.",
            )
                .into_response(),
        }
    }
}
