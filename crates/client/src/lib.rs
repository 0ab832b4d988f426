//! Signing client for the deploy receiver.
//!
//! Each upload gets its own timestamp and nonce, is signed with the operator's
//! Ed25519 key and sent as `POST /upload/<path_key>/<file_name>`.

pub mod client;
pub mod error;
pub mod files;
pub mod request;
pub mod signer;

pub use client::{DeployClient, upload_timeout};
pub use error::ClientError;
pub use files::{LocalFile, list_files};
pub use request::{UploadRequest, compose_request, parse_server_url};
pub use signer::UploadSigner;
