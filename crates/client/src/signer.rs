use deploy_auth::{AuthEnvelope, AuthError, Ed25519Signer, Nonce, RequestSigner, unix_now};

use crate::request::UploadRequest;

/// Holds the operator's private key and produces one envelope per upload.
pub struct UploadSigner {
    signer: Box<dyn RequestSigner>,
}

impl UploadSigner {
    pub fn new(signer: impl RequestSigner + 'static) -> Self {
        Self {
            signer: Box::new(signer),
        }
    }

    /// Loads a hex private key (32-byte seed or 64-byte keypair form).
    ///
    /// `None` or an empty string is reported as a key error so the caller
    /// fails before contacting the receiver.
    pub fn from_private_key(private_key_hex: Option<&str>) -> Result<Self, AuthError> {
        let key = private_key_hex
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AuthError::KeyFormat(
                    "no private key configured (set DEPLOY_PRIVATE_KEY or pass --key)".to_string(),
                )
            })?;
        Ok(Self::new(Ed25519Signer::from_hex(key)?))
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signer.public_key_bytes())
    }

    /// Signs an arbitrary message and returns the hex signature.
    pub fn sign_message(&self, message: &[u8]) -> String {
        hex::encode(self.signer.sign(message))
    }

    /// Envelope for `upload` with a fresh nonce and the current time.
    pub fn envelope_for(&self, upload: &UploadRequest) -> AuthEnvelope {
        self.envelope_at(upload, unix_now())
    }

    pub fn envelope_at(&self, upload: &UploadRequest, timestamp: i64) -> AuthEnvelope {
        AuthEnvelope::sign(
            self.signer.as_ref(),
            timestamp,
            Nonce::generate(),
            upload.url_path(),
        )
    }
}
