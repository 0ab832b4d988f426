pub mod config;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod server;
pub mod stats;
pub mod storage;
pub mod verifier;

pub use config::ReceiverConfig;
pub use error::ReceiverError;
pub use extract::ZipExtractor;
pub use ledger::NonceLedger;
pub use server::{AppState, router, run, serve};
pub use storage::{ArchiveExtractor, StoredUpload, UploadStore};
pub use verifier::{RequestVerifier, check_freshness};
