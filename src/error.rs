//! Error types for the OAuth channel.

use thiserror::Error;

/// The main error type for all channel operations.
///
/// Binding elements return these unchanged; the pipeline and the channel
/// surface the first failure without wrapping it, so callers can match on the
/// kind directly.
#[derive(Error, Debug)]
pub enum OAuthError {
    /// The token manager does not recognise the consumer key or token.
    #[error("Unknown credential: {identifier}")]
    UnknownCredential {
        /// The consumer key or token that failed to resolve
        identifier: String,
    },

    /// The consumer key handed to the channel does not match the one its
    /// token manager serves. The channel refuses to operate.
    #[error("Consumer key mismatch: channel is configured for {expected:?}")]
    CredentialMismatch {
        /// The consumer key the channel was built with
        expected: String,
        /// The consumer key that was presented, if the mismatch involved one
        actual: Option<String>,
    },

    /// The declared signature method is unknown or not allowed.
    #[error("Unsupported signature method: {0}")]
    UnsupportedSigningMethod(String),

    /// The message signature did not verify.
    #[error("Signature verification failed")]
    SignatureVerification,

    /// The message timestamp lies outside the accepted window.
    #[error("Timestamp {timestamp} is outside the {window_secs}s window around {now}")]
    ExpiredTimestamp {
        /// Timestamp carried by the message (seconds since the Unix epoch)
        timestamp: i64,
        /// Local time at the check
        now: i64,
        /// Accepted skew in either direction
        window_secs: u64,
    },

    /// The nonce was already used for this consumer and token.
    #[error("Replay detected: nonce already used")]
    ReplayDetected,

    /// The signing element is already bound to another channel.
    #[error("Signing element is already bound to another channel")]
    BindingElementConflict,

    /// A required protocol field is absent.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The wire message could not be interpreted.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Key material could not be used for signing.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Settings rejected at channel construction.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl OAuthError {
    pub(crate) fn unknown(identifier: impl Into<String>) -> Self {
        Self::UnknownCredential {
            identifier: identifier.into(),
        }
    }

    /// Check whether the caller may retry with a fresh nonce and timestamp.
    ///
    /// Only an expired timestamp qualifies: the client clock may be
    /// resynchronised and the message prepared again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExpiredTimestamp { .. })
    }

    /// Check whether this failure should be treated as a potential attack.
    pub fn is_security_failure(&self) -> bool {
        matches!(self, Self::SignatureVerification | Self::ReplayDetected)
    }

    /// Check whether this failure means the channel itself is misconfigured.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CredentialMismatch { .. } | Self::BindingElementConflict | Self::Config(_)
        )
    }
}
