//! Provisioning URI construction for external authenticator apps.

use url::Url;

use crate::secret::TotpSecret;

/// Build an `otpauth://totp/{label}?secret={base32}&issuer={issuer}` URI.
///
/// The URI is what authenticator apps consume, usually rendered as a QR
/// code by the hosting UI. Label and issuer are percent-encoded; the
/// base32 secret text is URI-safe as-is.
pub fn uri(secret: &TotpSecret, label: &str, issuer: &str) -> String {
    // The base is a constant and always parses.
    let mut url =
        Url::parse("otpauth://totp/").expect("static otpauth base URI");

    url.path_segments_mut()
        .expect("otpauth URI has a path")
        .pop_if_empty()
        .push(label);

    url.query_pairs_mut()
        .append_pair("secret", secret.as_str())
        .append_pair("issuer", issuer);

    url.into()
}
