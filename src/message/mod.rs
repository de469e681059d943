//! Protocol messages.
//!
//! This module provides:
//! - [`Message`], the logical field map the binding elements transform
//! - [`WireMessage`], the transmittable form handed to and received from transport
//! - [`MessageFactory`], which assigns a message type to incoming wire fields

mod factory;
#[allow(clippy::module_inception)]
mod message;
mod wire;

pub use factory::{MessageFactory, StandardMessageFactory};
pub use message::{Direction, HttpMethod, Message, MessageType};
pub use wire::{DeliveryMethod, FORM_CONTENT_TYPE, WireMessage};

/// Protocol field names.
pub mod fields {
    /// Identifies the consumer.
    pub const CONSUMER_KEY: &str = "oauth_consumer_key";
    /// Request or access token.
    pub const TOKEN: &str = "oauth_token";
    /// Declared signature method.
    pub const SIGNATURE_METHOD: &str = "oauth_signature_method";
    /// The signature itself.
    pub const SIGNATURE: &str = "oauth_signature";
    /// Seconds since the Unix epoch.
    pub const TIMESTAMP: &str = "oauth_timestamp";
    /// Single-use random value.
    pub const NONCE: &str = "oauth_nonce";
    /// Protocol version, always `1.0` when present.
    pub const VERSION: &str = "oauth_version";
    /// Callback URL or `oob`.
    pub const CALLBACK: &str = "oauth_callback";
    /// Verifier returned after user authorization.
    pub const VERIFIER: &str = "oauth_verifier";
    /// Authorization header parameter naming the protection realm.
    ///
    /// Only the header parameter is excluded from signing; a `realm` field in
    /// the query or body is an ordinary signed field.
    pub const REALM: &str = "realm";

    /// Protocol version value.
    pub const PROTOCOL_VERSION: &str = "1.0";
    /// Callback value for clients that cannot receive redirects.
    pub const OUT_OF_BAND: &str = "oob";

    /// Fields that travel with the message but are never signed.
    pub const TRANSPORT_ONLY: &[&str] = &[SIGNATURE];

    /// Whether a field is covered by the signature.
    pub fn is_signable(name: &str) -> bool {
        !TRANSPORT_ONLY.contains(&name)
    }

    /// Whether a field belongs to the protocol rather than the application.
    pub fn is_protocol(name: &str) -> bool {
        name.starts_with("oauth_")
    }
}
