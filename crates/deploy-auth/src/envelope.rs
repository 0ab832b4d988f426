use std::time::{SystemTime, UNIX_EPOCH};

use http::{HeaderMap, HeaderValue};

use crate::canonical::{NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, canonical_message};
use crate::error::AuthError;
use crate::nonce::Nonce;
use crate::signing::{RequestSigner, SIGNATURE_LENGTH, SignatureVerifier};

/// Seconds since the Unix epoch, as carried in `X-Timestamp`.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

/// Authentication metadata for exactly one upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEnvelope {
    pub timestamp: i64,
    pub nonce: Nonce,
    pub signature: [u8; SIGNATURE_LENGTH],
    pub url_path: String,
}

impl AuthEnvelope {
    /// Signs `timestamp || nonce || url_path` and packs the result.
    pub fn sign(
        signer: &dyn RequestSigner,
        timestamp: i64,
        nonce: Nonce,
        url_path: impl Into<String>,
    ) -> Self {
        let url_path = url_path.into();
        let signature = signer.sign(&canonical_message(timestamp, &nonce, &url_path));
        Self {
            timestamp,
            nonce,
            signature,
            url_path,
        }
    }

    pub fn canonical_message(&self) -> Vec<u8> {
        canonical_message(self.timestamp, &self.nonce, &self.url_path)
    }

    pub fn signature_hex(&self) -> String {
        hex::encode(self.signature)
    }

    pub fn verify(&self, verifier: &dyn SignatureVerifier) -> Result<(), AuthError> {
        verifier.verify(&self.canonical_message(), &self.signature)
    }

    /// Reads `X-Timestamp`, `X-Nonce` and `X-Signature` from an inbound request.
    ///
    /// `url_path` is the request path as the receiver routed it, without query.
    pub fn from_headers(headers: &HeaderMap, url_path: &str) -> Result<Self, AuthError> {
        let timestamp_str = required_header(headers, &TIMESTAMP_HEADER)?;
        let timestamp: i64 = timestamp_str.parse().map_err(|_| {
            AuthError::MalformedEnvelope(format!("timestamp is not an integer: {timestamp_str:?}"))
        })?;
        // The canonical message uses the decimal rendering, so "+17" or "017"
        // could never verify.
        if timestamp.to_string() != timestamp_str {
            return Err(AuthError::MalformedEnvelope(format!(
                "timestamp is not a plain decimal integer: {timestamp_str:?}"
            )));
        }

        let nonce: Nonce = required_header(headers, &NONCE_HEADER)?.parse()?;

        let signature_str = required_header(headers, &SIGNATURE_HEADER)?;
        let mut signature = [0u8; SIGNATURE_LENGTH];
        hex::decode_to_slice(signature_str, &mut signature).map_err(|e| {
            AuthError::MalformedEnvelope(format!(
                "signature must be {} hex characters: {e}",
                SIGNATURE_LENGTH * 2
            ))
        })?;

        Ok(Self {
            timestamp,
            nonce,
            signature,
            url_path: url_path.to_string(),
        })
    }

    /// Writes the three auth headers into an outbound request.
    pub fn write_headers(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from(self.timestamp));
        headers.insert(
            NONCE_HEADER,
            hex_header_value(&NONCE_HEADER, &self.nonce.to_hex())?,
        );
        headers.insert(
            SIGNATURE_HEADER,
            hex_header_value(&SIGNATURE_HEADER, &self.signature_hex())?,
        );
        Ok(())
    }
}

fn required_header<'a>(
    headers: &'a HeaderMap,
    name: &http::HeaderName,
) -> Result<&'a str, AuthError> {
    let value = headers
        .get(name)
        .ok_or_else(|| AuthError::MalformedEnvelope(format!("missing {name} header")))?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::MalformedEnvelope(format!("{name} header is not ASCII")))?;
    if value.is_empty() {
        return Err(AuthError::MalformedEnvelope(format!("empty {name} header")));
    }
    Ok(value)
}

fn hex_header_value(name: &http::HeaderName, hex: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(hex)
        .map_err(|e| AuthError::MalformedEnvelope(format!("cannot encode {name} header: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::Ed25519Signer;

    const SEED: [u8; 32] = [42u8; 32];

    fn signed() -> AuthEnvelope {
        let signer = Ed25519Signer::from_seed(&SEED);
        AuthEnvelope::sign(&signer, 1_700_000_000, Nonce::from_bytes([1u8; 16]), "/upload/web/a.txt")
    }

    #[test]
    fn headers_round_trip_through_parse() {
        let envelope = signed();
        let mut headers = HeaderMap::new();
        envelope.write_headers(&mut headers).unwrap();

        assert_eq!(headers.get("X-Timestamp").unwrap(), "1700000000");
        assert_eq!(headers.get("X-Nonce").unwrap(), "01010101010101010101010101010101");
        assert_eq!(headers.get("X-Signature").unwrap().len(), 128);

        let parsed = AuthEnvelope::from_headers(&headers, "/upload/web/a.txt").unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn signed_envelope_verifies() {
        let signer = Ed25519Signer::from_seed(&SEED);
        signed().verify(&signer.verifier()).unwrap();
    }

    #[test]
    fn missing_signature_header_is_malformed() {
        let mut headers = HeaderMap::new();
        signed().write_headers(&mut headers).unwrap();
        headers.remove(SIGNATURE_HEADER);

        let err = AuthEnvelope::from_headers(&headers, "/upload/web/a.txt").unwrap_err();
        assert!(matches!(err, AuthError::MalformedEnvelope(msg) if msg.contains("x-signature")));
    }

    #[test]
    fn short_signature_is_malformed() {
        let mut headers = HeaderMap::new();
        signed().write_headers(&mut headers).unwrap();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static("deadbeef"));

        let err = AuthEnvelope::from_headers(&headers, "/upload/web/a.txt").unwrap_err();
        assert!(matches!(err, AuthError::MalformedEnvelope(_)));
    }

    #[test]
    fn non_integer_timestamp_is_malformed() {
        let mut headers = HeaderMap::new();
        signed().write_headers(&mut headers).unwrap();
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_static("yesterday"));

        let err = AuthEnvelope::from_headers(&headers, "/upload/web/a.txt").unwrap_err();
        assert!(matches!(err, AuthError::MalformedEnvelope(_)));
    }

    #[test]
    fn padded_timestamp_is_malformed() {
        let mut headers = HeaderMap::new();
        signed().write_headers(&mut headers).unwrap();
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_static("01700000000"));

        let err = AuthEnvelope::from_headers(&headers, "/upload/web/a.txt").unwrap_err();
        assert!(matches!(err, AuthError::MalformedEnvelope(_)));
    }

    #[test]
    fn uppercase_signature_hex_is_accepted() {
        let envelope = signed();
        let mut headers = HeaderMap::new();
        envelope.write_headers(&mut headers).unwrap();
        let upper = envelope.signature_hex().to_uppercase();
        headers.insert(SIGNATURE_HEADER, HeaderValue::try_from(upper).unwrap());

        let parsed = AuthEnvelope::from_headers(&headers, "/upload/web/a.txt").unwrap();
        assert_eq!(parsed.signature, envelope.signature);
    }

    #[test]
    fn header_encoding_failure_is_an_error_not_a_panic() {
        let err = hex_header_value(&NONCE_HEADER, "00\n11").unwrap_err();
        assert!(matches!(err, AuthError::MalformedEnvelope(msg) if msg.contains("x-nonce")));
    }
}
