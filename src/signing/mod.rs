//! Message signing.
//!
//! Signatures are computed over the signature base string:
//!
//! ```text
//! base    = ENC(METHOD) & ENC(base URI) & ENC(sorted "name=value" pairs)
//! key     = ENC(consumer_secret) & ENC(token_secret)
//! HMAC-*  = Base64(HMAC(key, base))
//! RSA-*   = Base64(RSASSA-PKCS1-v1_5(private_key, base))
//! PLAINTEXT = key
//! ```
//!
//! `oauth_signature` is never part of the base string. The header `realm` is
//! held outside the field map, so it is never signed either.

mod base_string;
mod context;
mod element;

pub use base_string::{base_string_uri, normalized_parameters, signature_base_string};
pub use context::SigningContext;
pub use element::SigningElement;
