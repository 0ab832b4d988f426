use std::sync::Arc;

use axum::http::HeaderMap;
use deploy_auth::{AuthEnvelope, AuthError, SignatureVerifier};

pub use deploy_auth::unix_now;

use crate::ledger::NonceLedger;

/// Accepts `timestamp` iff `|now - timestamp| <= window`.
pub fn check_freshness(timestamp: i64, now: i64, window: u64) -> Result<(), AuthError> {
    if now.abs_diff(timestamp) <= window {
        Ok(())
    } else {
        Err(AuthError::StaleOrFutureTimestamp {
            timestamp,
            now,
            window,
        })
    }
}

/// Decides whether an inbound upload request is authentic and fresh.
///
/// Holds only the public key and the shared [`NonceLedger`].
#[derive(Clone)]
pub struct RequestVerifier {
    signature_verifier: Arc<dyn SignatureVerifier>,
    ledger: Arc<NonceLedger>,
}

impl RequestVerifier {
    pub fn new(signature_verifier: Arc<dyn SignatureVerifier>, ledger: Arc<NonceLedger>) -> Self {
        Self {
            signature_verifier,
            ledger,
        }
    }

    pub fn window(&self) -> u64 {
        self.ledger.window()
    }

    pub fn ledger(&self) -> &NonceLedger {
        &self.ledger
    }

    pub fn parse_envelope(&self, headers: &HeaderMap, url_path: &str) -> Result<AuthEnvelope, AuthError> {
        AuthEnvelope::from_headers(headers, url_path)
    }

    pub fn check_freshness(&self, envelope: &AuthEnvelope, now: i64) -> Result<(), AuthError> {
        check_freshness(envelope.timestamp, now, self.window())
    }

    /// Records the nonce as used, rejecting it if it was seen before.
    pub fn check_replay(&self, envelope: &AuthEnvelope, now: i64) -> Result<(), AuthError> {
        self.ledger
            .check_and_insert(envelope.nonce, envelope.timestamp, now)
    }

    pub fn verify_signature(&self, envelope: &AuthEnvelope) -> Result<(), AuthError> {
        envelope.verify(self.signature_verifier.as_ref())
    }

    /// Runs parse, freshness, replay and signature checks against the system clock.
    pub fn authenticate(&self, headers: &HeaderMap, url_path: &str) -> Result<AuthEnvelope, AuthError> {
        self.authenticate_at(headers, url_path, unix_now())
    }

    /// Single-pass accept/reject decision, short-circuiting on the first failure.
    ///
    /// The replay check is split in two: a read-only lookup before the signature
    /// check rejects known nonces cheaply, and the atomic insert happens only after
    /// the signature verified. A request that fails any check leaves the ledger
    /// untouched.
    pub fn authenticate_at(
        &self,
        headers: &HeaderMap,
        url_path: &str,
        now: i64,
    ) -> Result<AuthEnvelope, AuthError> {
        let envelope = self.parse_envelope(headers, url_path)?;
        self.check_freshness(&envelope, now)?;

        if self.ledger.contains(&envelope.nonce) {
            return Err(AuthError::ReplayedNonce(envelope.nonce.to_hex()));
        }

        self.verify_signature(&envelope)?;
        self.check_replay(&envelope, now)?;
        Ok(envelope)
    }
}
