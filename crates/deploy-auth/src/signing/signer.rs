use crate::error::AuthError;

pub const SIGNATURE_LENGTH: usize = 64;
pub const PUBLIC_KEY_LENGTH: usize = 32;
pub const SECRET_KEY_LENGTH: usize = 32;

/// Signs canonical request messages on the operator side.
///
/// Implementations are sync; signing is CPU-bound.
pub trait RequestSigner: Send + Sync {
    /// Sign the canonical message bytes. Returns the raw signature.
    fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH];

    /// Public half of the signing key, as configured on the receiver.
    fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH];

    /// Algorithm identifier string (e.g. "ed25519").
    fn algorithm(&self) -> &str;
}

/// Checks request signatures on the receiver side. Holds only public material.
pub trait SignatureVerifier: Send + Sync {
    /// `Err(AuthError::InvalidSignature)` unless `signature` covers `message`.
    fn verify(&self, message: &[u8], signature: &[u8; SIGNATURE_LENGTH]) -> Result<(), AuthError>;

    fn algorithm(&self) -> &str;
}
