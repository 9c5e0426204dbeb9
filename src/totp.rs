//! One-time code computation (RFC 6238 / RFC 4226) using HMAC-SHA1.

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{Error, Result};
use crate::secret::TotpSecret;

/// Time step and digit count used for code computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpConfig {
    /// Time step in seconds (usually 30).
    step_seconds: u64,
    /// Number of digits in the code (usually 6).
    digits: u32,
}

impl TotpConfig {
    pub const DEFAULT_DIGITS: u32 = 6;
    /// Default time step as per RFC 6238.
    pub const DEFAULT_STEP_SECONDS: u64 = 30;

    /// Create a new configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `step_seconds` is zero or if `digits` is not
    /// contained between 4 and 8.
    pub fn new(step_seconds: u64, digits: u32) -> Result<Self> {
        if step_seconds == 0 {
            return Err(Error::Validation {
                field: "step_seconds",
                message: "time step must be greater than 0",
            });
        }

        if !(4..=8).contains(&digits) {
            return Err(Error::Validation {
                field: "digits",
                message: "digits must be between 4 and 8",
            });
        }

        Ok(Self {
            step_seconds,
            digits,
        })
    }

    pub fn step_seconds(&self) -> u64 {
        self.step_seconds
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            step_seconds: Self::DEFAULT_STEP_SECONDS,
            digits: Self::DEFAULT_DIGITS,
        }
    }
}

/// One-time code: exactly `digits` decimal characters, zero-padded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpCode {
    value: String,
}

impl TotpCode {
    /// Create a code with validation.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `value` is not exactly `digits` decimal
    /// characters.
    pub fn new(value: impl Into<String>, digits: u32) -> Result<Self> {
        let value = value.into();

        if value.len() != digits as usize
            || !value.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::Validation {
                field: "code",
                message: "code must be exactly `digits` decimal characters",
            });
        }

        Ok(Self { value })
    }

    /// Returns the code as a string slice.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for TotpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// Current time counter based on Unix epoch.
#[inline]
pub fn time_step(unix_seconds: u64, step_seconds: u64) -> u64 {
    unix_seconds / step_seconds
}

/// Seconds left in the current step, in `1..=step_seconds`.
#[inline]
pub fn seconds_remaining(unix_seconds: u64, step_seconds: u64) -> u64 {
    step_seconds - unix_seconds % step_seconds
}

/// Compute the one-time code for `unix_seconds`.
///
/// Pure in `(secret, unix_seconds / step)`: two calls within the same
/// time step always yield the same code.
pub fn code_at(
    secret: &TotpSecret,
    config: &TotpConfig,
    unix_seconds: u64,
) -> Result<TotpCode> {
    let key = secret.to_bytes()?;
    let counter = time_step(unix_seconds, config.step_seconds());
    let value = hotp(&key, counter, config.digits())?;

    TotpCode::new(value, config.digits())
}

/// HOTP (RFC 4226): HMAC-SHA1 over the 8-byte big-endian counter,
/// then dynamic truncation and reduction modulo `10^digits`.
fn hotp(key: &[u8], counter: u64, digits: u32) -> Result<String> {
    let counter_bytes = counter.to_be_bytes();
    let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|_| Error::Hmac)?;
    mac.update(&counter_bytes);
    let result = mac.finalize().into_bytes();

    // Dynamic truncation: 4 bytes at the offset named by the low nibble
    // of the last digest byte, sign bit masked off.
    let offset = (result[19] & 0x0f) as usize;
    let binary_code = ((result[offset] as u32 & 0x7f) << 24)
        | ((result[offset + 1] as u32) << 16)
        | ((result[offset + 2] as u32) << 8)
        | (result[offset + 3] as u32);

    let code = binary_code % 10u32.pow(digits);

    Ok(format!("{:0>width$}", code, width = digits as usize))
}

/// Check a candidate against the current time step only.
///
/// Exact string equality; no adjacent steps are consulted.
pub fn verify_at(
    secret: &TotpSecret,
    config: &TotpConfig,
    candidate: &str,
    unix_seconds: u64,
) -> Result<bool> {
    Ok(code_at(secret, config, unix_seconds)?.value() == candidate)
}

/// Check a candidate against the current step and `window` adjacent
/// steps on each side, to absorb clock skew between the two parties.
pub fn verify_with_window(
    secret: &TotpSecret,
    config: &TotpConfig,
    candidate: &str,
    unix_seconds: u64,
    window: u8,
) -> Result<bool> {
    let key = secret.to_bytes()?;
    let current = time_step(unix_seconds, config.step_seconds());

    for offset in -(window as i64)..=(window as i64) {
        let counter = (current as i64 + offset) as u64;

        if hotp(&key, counter, config.digits())? == candidate {
            return Ok(true);
        }
    }

    Ok(false)
}
