//! Signed upload protocol shared by the deploy client and the deploy receiver.
//!
//! A request is authenticated by an Ed25519 signature over
//! `timestamp || nonce || url_path`, carried in the `X-Timestamp`, `X-Nonce`
//! and `X-Signature` headers. The payload body is not covered by the signature.

pub mod canonical;
pub mod envelope;
pub mod error;
pub mod nonce;
pub mod response;
pub mod signing;

pub use canonical::{
    NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, UPLOAD_PREFIX, canonical_message, upload_path,
};
pub use envelope::{AuthEnvelope, unix_now};
pub use error::AuthError;
pub use nonce::Nonce;
pub use response::UploadResponse;
pub use signing::{
    Ed25519Signer, Ed25519Verifier, RequestSigner, SignatureVerifier, SigningKeyPair,
};
