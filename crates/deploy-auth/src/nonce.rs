use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::AuthError;

pub const NONCE_LENGTH: usize = 16;

/// Single-use random value carried in `X-Nonce`.
///
/// Always rendered as 32 lowercase hex characters; that rendering is what goes
/// into the canonical message.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_LENGTH]);

impl Nonce {
    /// Draws a fresh nonce from the operating system CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; NONCE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", self.to_hex())
    }
}

impl FromStr for Nonce {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != NONCE_LENGTH * 2 {
            return Err(AuthError::MalformedEnvelope(format!(
                "nonce must be {} hex characters, got {}",
                NONCE_LENGTH * 2,
                s.len()
            )));
        }
        // Upper-case hex would decode fine but re-render differently in the
        // canonical message.
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(AuthError::MalformedEnvelope(
                "nonce must be lowercase hex".to_string(),
            ));
        }

        let mut bytes = [0u8; NONCE_LENGTH];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| AuthError::MalformedEnvelope(format!("invalid nonce hex: {e}")))?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_nonce_renders_as_32_lowercase_hex_chars() {
        let hex = Nonce::generate().to_hex();
        assert_eq!(hex.len(), 32);
        assert!(hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn generated_nonces_differ() {
        assert_ne!(Nonce::generate(), Nonce::generate());
    }

    #[test]
    fn parses_its_own_rendering() {
        let nonce: Nonce = "00112233445566778899aabbccddeeff".parse().unwrap();
        assert_eq!(nonce.as_bytes()[0], 0x00);
        assert_eq!(nonce.as_bytes()[15], 0xff);
        assert_eq!(nonce.to_string(), "00112233445566778899aabbccddeeff");
    }

    #[test]
    fn rejects_wrong_length() {
        let err = "0011".parse::<Nonce>().unwrap_err();
        assert!(matches!(err, AuthError::MalformedEnvelope(_)));
    }

    #[test]
    fn rejects_uppercase_hex() {
        let err = "00112233445566778899AABBCCDDEEFF".parse::<Nonce>().unwrap_err();
        assert!(matches!(err, AuthError::MalformedEnvelope(_)));
    }

    #[test]
    fn rejects_non_hex() {
        let err = "zz112233445566778899aabbccddeeff".parse::<Nonce>().unwrap_err();
        assert!(matches!(err, AuthError::MalformedEnvelope(_)));
    }
}
