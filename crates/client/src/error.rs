use std::path::PathBuf;

use deploy_auth::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing or unparseable private key, or auth headers that cannot be
    /// encoded. Raised before any network activity.
    #[error(transparent)]
    Key(#[from] AuthError),

    #[error("Invalid server URL {url}: {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("Invalid file name {0:?}")]
    InvalidFileName(String),

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The receiver refused the request's authentication (HTTP 401).
    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Receiver returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Unexpected response from receiver: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Transport failures may succeed on retry with a freshly signed request.
    /// Every other variant will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_)) || matches!(self, Self::HttpStatus { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_errors_keep_their_message() {
        let err = ClientError::from(AuthError::KeyFormat("bad hex".to_string()));
        assert!(err.to_string().contains("bad hex"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = ClientError::HttpStatus {
            status: 503,
            body: "busy".to_string(),
        };
        assert!(err.is_retryable());

        let err = ClientError::HttpStatus {
            status: 400,
            body: "unknown path key".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(!ClientError::Rejected("Nonce already used".to_string()).is_retryable());
    }
}
