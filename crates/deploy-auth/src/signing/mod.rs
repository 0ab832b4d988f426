mod signer;
mod ed25519;

pub use signer::{
    PUBLIC_KEY_LENGTH, RequestSigner, SECRET_KEY_LENGTH, SIGNATURE_LENGTH, SignatureVerifier,
};
pub use self::ed25519::{Ed25519Signer, Ed25519Verifier, SigningKeyPair};
