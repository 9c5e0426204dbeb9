//! Error handler for keystep.

pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing keystep failures.
///
/// The taxonomy is narrow on purpose: everything in this crate is local
/// computation, so the only failure sources are malformed base32 input,
/// an unavailable OS random source and invalid configuration values.
/// A verification mismatch is a normal outcome, not an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("character {0:?} is not in the base32 alphabet")]
    InvalidCharacter(char),

    /// No fallback to a non-cryptographic source is permitted.
    #[error("secure random source unavailable")]
    RandomSource(#[from] rand::Error),

    #[error("hmac rejected the decoded secret as a key")]
    Hmac,

    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
}
