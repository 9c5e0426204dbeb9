//! Shared secret generation and representation.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::base32;
use crate::error::{Error, Result};

/// Default secret length in bytes (160 bits, the RFC 4226 recommendation).
pub const DEFAULT_SECRET_LENGTH: usize = 20;

/// Base32-encoded shared secret (RFC 4648).
///
/// The encoded text and the raw key bytes are interchangeable
/// representations of the same value; [`TotpSecret::to_bytes`] recovers
/// the bytes through the codec.
#[derive(Clone, PartialEq, Eq)]
pub struct TotpSecret {
    encoded: String,
}

impl TotpSecret {
    /// Create a secret from base32 text, normalized to uppercase.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `encoded` contains a character outside the
    /// RFC 4648 alphabet.
    pub fn new(encoded: impl Into<String>) -> Result<Self> {
        let encoded = encoded.into();

        if encoded.is_empty() {
            return Err(Error::Validation {
                field: "secret",
                message: "secret must not be empty",
            });
        }

        base32::decode(&encoded)?;

        Ok(Self {
            encoded: encoded.to_ascii_uppercase(),
        })
    }

    /// Generate a fresh 20-byte secret from the OS random source.
    pub fn generate() -> Result<Self> {
        Self::generate_with_length(DEFAULT_SECRET_LENGTH)
    }

    /// Generate a secret of `length` random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::RandomSource`] if the OS random source
    /// cannot supply bytes. There is no weaker fallback.
    pub fn generate_with_length(length: usize) -> Result<Self> {
        let mut bytes = vec![0u8; length];
        OsRng.try_fill_bytes(&mut bytes)?;

        Ok(Self {
            encoded: base32::encode(&bytes),
        })
    }

    /// Decode into raw key bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        base32::decode(&self.encoded)
    }

    /// Returns the encoded secret as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Consume and return the inner value.
    #[inline]
    pub fn into_inner(self) -> String {
        self.encoded
    }
}

impl std::fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpSecret")
            .field("encoded", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_length() {
        let secret = TotpSecret::generate().unwrap();

        // 20 bytes is 160 bits, exactly 32 base32 symbols.
        assert_eq!(secret.as_str().len(), 32);
        assert_eq!(secret.to_bytes().unwrap().len(), DEFAULT_SECRET_LENGTH);
    }

    #[test]
    fn test_generate_is_unpredictable() {
        let first = TotpSecret::generate().unwrap();
        let second = TotpSecret::generate().unwrap();

        assert_ne!(first.as_str(), second.as_str());
    }

    #[test]
    fn test_generated_alphabet() {
        let secret = TotpSecret::generate_with_length(40).unwrap();

        assert!(secret
            .as_str()
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
    }

    #[test]
    fn test_new_normalizes_case() {
        let secret = TotpSecret::new("jbswy3dpehpk3pxp").unwrap();
        assert_eq!(secret.as_str(), "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn test_new_rejects_invalid_base32() {
        assert!(TotpSecret::new("not base32!").is_err());
        assert!(TotpSecret::new("JBSWY3DP0").is_err());
        assert!(TotpSecret::new("").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = TotpSecret::new("JBSWY3DPEHPK3PXP").unwrap();
        let output = format!("{secret:?}");

        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("JBSWY3DPEHPK3PXP"));
    }
}
