/// Failures of the signed-upload protocol.
///
/// `KeyFormat` is a local configuration problem on either side. The other four
/// variants are authentication rejections of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid key material: {0}")]
    KeyFormat(String),
    #[error("Malformed auth headers: {0}")]
    MalformedEnvelope(String),
    #[error("Timestamp outside freshness window (timestamp: {timestamp}, now: {now}, window: {window}s)")]
    StaleOrFutureTimestamp { timestamp: i64, now: i64, window: u64 },
    #[error("Nonce already used: {0}")]
    ReplayedNonce(String),
    #[error("Signature verification failed")]
    InvalidSignature,
}

impl AuthError {
    /// Short stable name for log fields and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyFormat(_) => "key_format",
            Self::MalformedEnvelope(_) => "malformed_envelope",
            Self::StaleOrFutureTimestamp { .. } => "stale_or_future_timestamp",
            Self::ReplayedNonce(_) => "replayed_nonce",
            Self::InvalidSignature => "invalid_signature",
        }
    }

    /// True for errors caused by the inbound request rather than local config.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::KeyFormat(_))
    }
}
