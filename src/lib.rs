//! keystep is a reference TOTP engine: it decodes base32 secrets,
//! derives 6-digit one-time codes with HMAC-SHA1 (RFC 6238 / RFC 4226)
//! and drives a live, ticking verification session that an external
//! authenticator app can be paired against through an `otpauth://` URI.

#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod base32;
pub mod clock;
pub mod error;
pub mod provisioning;
pub mod secret;
pub mod session;
pub mod totp;

pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};
pub use secret::TotpSecret;
pub use session::{
    SessionHandle, SessionSnapshot, Tick, TotpSession, VerificationResult,
};
pub use totp::{TotpCode, TotpConfig};
