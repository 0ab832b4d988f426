use http::HeaderName;

use crate::nonce::Nonce;

pub const TIMESTAMP_HEADER: HeaderName = HeaderName::from_static("x-timestamp");
pub const NONCE_HEADER: HeaderName = HeaderName::from_static("x-nonce");
pub const SIGNATURE_HEADER: HeaderName = HeaderName::from_static("x-signature");

/// Route prefix shared by the receiver router and the signer's URL builder.
pub const UPLOAD_PREFIX: &str = "/upload";

/// Builds the `/upload/{path_key}/{file_name}` path that gets signed.
///
/// `file_name` may contain `/` separated sub-directories. The query string is
/// never part of the signed path.
pub fn upload_path(path_key: &str, file_name: &str) -> String {
    format!("{UPLOAD_PREFIX}/{path_key}/{file_name}")
}

/// The exact bytes that are signed: `timestamp || nonce || url_path`.
///
/// Decimal timestamp, lowercase hex nonce, no separators. Both sides of the
/// protocol derive the message through this function.
pub fn canonical_message(timestamp: i64, nonce: &Nonce, url_path: &str) -> Vec<u8> {
    let timestamp = timestamp.to_string();
    let nonce = nonce.to_hex();

    let mut message = Vec::with_capacity(timestamp.len() + nonce.len() + url_path.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(nonce.as_bytes());
    message.extend_from_slice(url_path.as_bytes());
    message
}
