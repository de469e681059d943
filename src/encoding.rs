//! Percent-encoding as required by OAuth 1.0 (RFC 5849, section 3.6).
//!
//! Every byte outside the unreserved set `ALPHA / DIGIT / "-" / "." / "_" / "~"`
//! is encoded as `%XX` with upper-case hex digits. This is stricter than
//! `application/x-www-form-urlencoded`, which is why base strings and
//! Authorization headers never go through a form encoder.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::OAuthError;

const OAUTH_RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a value using the OAuth reserved character rules.
pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_RESERVED).to_string()
}

/// Decode a percent-encoded value.
///
/// `+` is left as is; only form bodies treat it as a space.
pub fn percent_decode(value: &str) -> Result<String, OAuthError> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| OAuthError::InvalidMessage(format!("Invalid percent-encoding: {e}")))
}
