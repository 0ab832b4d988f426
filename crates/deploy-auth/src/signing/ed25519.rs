use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use super::signer::{
    PUBLIC_KEY_LENGTH, RequestSigner, SECRET_KEY_LENGTH, SIGNATURE_LENGTH, SignatureVerifier,
};
use crate::error::AuthError;

const ALGORITHM: &str = "ed25519";

/// Ed25519 signer built from the operator's private key.
///
/// Accepts the 32-byte seed or the 64-byte `seed || public_key` form that the
/// key generator prints. Only the seed is used for signing.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn from_bytes(key: &[u8]) -> Result<Self, AuthError> {
        let seed: [u8; SECRET_KEY_LENGTH] = match key.len() {
            SECRET_KEY_LENGTH => key.try_into(),
            len if len == SECRET_KEY_LENGTH + PUBLIC_KEY_LENGTH => key[..SECRET_KEY_LENGTH].try_into(),
            len => {
                return Err(AuthError::KeyFormat(format!(
                    "private key must be {SECRET_KEY_LENGTH} or {} bytes, got {len}",
                    SECRET_KEY_LENGTH + PUBLIC_KEY_LENGTH
                )));
            }
        }
        .map_err(|_| AuthError::KeyFormat("private key seed is not 32 bytes".to_string()))?;

        let signer = Self::from_seed(&seed);
        if key.len() > SECRET_KEY_LENGTH && key[SECRET_KEY_LENGTH..] != signer.public_key_bytes() {
            tracing::warn!("embedded public key does not match the private key seed; using the seed");
        }
        Ok(signer)
    }

    pub fn from_hex(private_key_hex: &str) -> Result<Self, AuthError> {
        let bytes = hex::decode(private_key_hex.trim())
            .map_err(|e| AuthError::KeyFormat(format!("private key is not valid hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    pub fn verifier(&self) -> Ed25519Verifier {
        Ed25519Verifier {
            verifying_key: self.signing_key.verifying_key(),
        }
    }
}

impl RequestSigner for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(message).to_bytes()
    }

    fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    fn algorithm(&self) -> &str {
        ALGORITHM
    }
}

/// Ed25519 verifier built from the receiver's configured public key.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    verifying_key: VerifyingKey,
}

impl Ed25519Verifier {
    pub fn from_bytes(key: &[u8]) -> Result<Self, AuthError> {
        let key: [u8; PUBLIC_KEY_LENGTH] = key.try_into().map_err(|_| {
            AuthError::KeyFormat(format!(
                "public key must be {PUBLIC_KEY_LENGTH} bytes, got {}",
                key.len()
            ))
        })?;
        let verifying_key = VerifyingKey::from_bytes(&key)
            .map_err(|e| AuthError::KeyFormat(format!("invalid ed25519 public key: {e}")))?;
        Ok(Self { verifying_key })
    }

    pub fn from_hex(public_key_hex: &str) -> Result<Self, AuthError> {
        let bytes = hex::decode(public_key_hex.trim())
            .map_err(|e| AuthError::KeyFormat(format!("public key is not valid hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.as_bytes())
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, message: &[u8], signature: &[u8; SIGNATURE_LENGTH]) -> Result<(), AuthError> {
        let signature = Signature::from_bytes(signature);
        self.verifying_key
            .verify(message, &signature)
            .map_err(|_| AuthError::InvalidSignature)
    }

    fn algorithm(&self) -> &str {
        ALGORITHM
    }
}

/// A freshly generated operator key pair.
pub struct SigningKeyPair {
    signing_key: SigningKey,
}

impl SigningKeyPair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// 64-byte `seed || public_key`, hex encoded. Goes to the operator only.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_keypair_bytes())
    }

    /// 32-byte public key, hex encoded. Goes into the receiver config.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().as_bytes())
    }

    pub fn signer(&self) -> Ed25519Signer {
        Ed25519Signer::from_seed(self.signing_key.as_bytes())
    }
}
