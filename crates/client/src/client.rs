use std::path::Path;
use std::time::Duration;

use deploy_auth::{AuthError, UploadResponse};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::files::{list_files, upload_name};
use crate::request::{UploadRequest, compose_request, endpoint_url};
use crate::signer::UploadSigner;

const MIB: u64 = 1024 * 1024;
const BASE_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// One minute plus a second per MiB, capped at thirty minutes.
pub fn upload_timeout(payload_len: usize) -> Duration {
    let per_mib = Duration::from_secs(payload_len as u64 / MIB);
    (BASE_UPLOAD_TIMEOUT + per_mib).min(MAX_UPLOAD_TIMEOUT)
}

/// HTTP client for a deploy receiver.
///
/// Uploads need a signer; the health and info endpoints do not.
pub struct DeployClient {
    http: Client,
    base_url: Url,
    signer: Option<UploadSigner>,
    timeout: Option<Duration>,
}

impl DeployClient {
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let http = Client::builder()
            .connect_timeout(STATUS_TIMEOUT)
            .user_agent(concat!("deploy-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            signer: None,
            timeout: None,
        })
    }

    pub fn with_signer(mut self, signer: UploadSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Fixed per-request timeout instead of the size-based default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Signs and sends one upload. A fresh nonce is drawn on every call, so
    /// retrying means calling this again, never resending an old request.
    pub async fn upload(&self, upload: UploadRequest) -> Result<UploadResponse, ClientError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            AuthError::KeyFormat("no private key configured for uploads".to_string())
        })?;

        let size = upload.payload.len();
        let timeout = self.timeout.unwrap_or_else(|| upload_timeout(size));
        let envelope = signer.envelope_for(&upload);
        let request = compose_request(&self.base_url, upload, &envelope)?;

        debug!(
            url_path = %envelope.url_path,
            nonce = %envelope.nonce,
            size,
            ?timeout,
            "sending signed upload"
        );

        let mut request = reqwest::Request::try_from(request)?;
        *request.timeout_mut() = Some(timeout);

        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| ClientError::InvalidResponse(format!("{e}: {body}")));
        }

        warn!(%status, url_path = %envelope.url_path, "upload refused");
        match status {
            StatusCode::UNAUTHORIZED => Err(ClientError::Rejected(body.trim().to_string())),
            _ => Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body: body.trim().to_string(),
            }),
        }
    }

    /// Uploads a single local file under its base name.
    pub async fn upload_file(
        &self,
        path: &Path,
        path_key: &str,
        extract: bool,
    ) -> Result<UploadResponse, ClientError> {
        let file_name = upload_name(path)?;
        let payload = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::io(path, e))?;

        self.upload(UploadRequest::new(path_key, file_name, payload).with_extract(extract))
            .await
    }

    /// Uploads every file below `dir`, keeping the directory layout.
    ///
    /// Files go one at a time, each with its own envelope. Stops at the first
    /// failure; files uploaded before it stay on the receiver.
    pub async fn upload_dir(
        &self,
        dir: &Path,
        path_key: &str,
    ) -> Result<Vec<UploadResponse>, ClientError> {
        let files = list_files(dir)?;
        let total = files.len();
        info!(dir = %dir.display(), total, "uploading directory");

        let mut responses = Vec::with_capacity(total);
        for (index, file) in files.into_iter().enumerate() {
            let payload = tokio::fs::read(&file.path)
                .await
                .map_err(|e| ClientError::io(&file.path, e))?;

            let response = self
                .upload(UploadRequest::new(path_key, file.relative_name.as_str(), payload))
                .await?;
            info!(
                file = %file.relative_name,
                index = index + 1,
                total,
                size = response.size,
                "uploaded"
            );
            responses.push(response);
        }
        Ok(responses)
    }

    /// `GET /health`; succeeds only when the receiver answers `{"status":"ok"}`.
    pub async fn health(&self) -> Result<(), ClientError> {
        let body = self.get_json("health").await?;
        match body.get("status").and_then(Value::as_str) {
            Some("ok") => Ok(()),
            _ => Err(ClientError::InvalidResponse(body.to_string())),
        }
    }

    /// `GET /`: service name, version, configured path keys and counters.
    pub async fn info(&self) -> Result<Value, ClientError> {
        self.get_json("").await
    }

    async fn get_json(&self, segment: &str) -> Result<Value, ClientError> {
        let url = endpoint_url(&self.base_url, [segment])?;
        let response = self.http.get(url).timeout(STATUS_TIMEOUT).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(format!("{e}: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_grows_with_payload_and_is_capped() {
        assert_eq!(upload_timeout(0), Duration::from_secs(60));
        assert_eq!(upload_timeout(10 * MIB as usize), Duration::from_secs(70));
        assert_eq!(upload_timeout(10 * MIB as usize + 1), Duration::from_secs(70));
        assert_eq!(upload_timeout(usize::MAX), Duration::from_secs(1800));
    }

    #[tokio::test]
    async fn upload_without_key_fails_before_connecting() {
        // Nothing listens on port 9 of the discard address; the key check must
        // fire first.
        let client = DeployClient::new(Url::parse("http://127.0.0.1:9").unwrap()).unwrap();
        let err = client
            .upload(UploadRequest::new("web", "a.txt", b"x".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Key(AuthError::KeyFormat(_))));
    }
}
