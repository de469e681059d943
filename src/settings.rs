//! Security settings and signature methods.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OAuthError;

/// Default accepted clock skew, in seconds, in either direction.
pub const DEFAULT_TIMESTAMP_WINDOW_SECS: u64 = 300;

/// Signature methods understood by the signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SigningMethod {
    /// HMAC with SHA-1 (the method mandated by most providers)
    #[serde(rename = "HMAC-SHA1")]
    HmacSha1,
    /// HMAC with SHA-256
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
    /// RSASSA-PKCS1-v1_5 with SHA-1
    #[serde(rename = "RSA-SHA1")]
    RsaSha1,
    /// RSASSA-PKCS1-v1_5 with SHA-256
    #[serde(rename = "RSA-SHA256")]
    RsaSha256,
    /// The shared secrets sent in the clear; HTTPS only
    #[serde(rename = "PLAINTEXT")]
    Plaintext,
}

impl SigningMethod {
    /// The value carried in `oauth_signature_method`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha1 => "HMAC-SHA1",
            Self::HmacSha256 => "HMAC-SHA256",
            Self::RsaSha1 => "RSA-SHA1",
            Self::RsaSha256 => "RSA-SHA256",
            Self::Plaintext => "PLAINTEXT",
        }
    }

    /// Whether the method signs with a key pair rather than shared secrets.
    pub const fn is_asymmetric(&self) -> bool {
        matches!(self, Self::RsaSha1 | Self::RsaSha256)
    }
}

impl fmt::Display for SigningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningMethod {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HMAC-SHA1" => Ok(Self::HmacSha1),
            "HMAC-SHA256" => Ok(Self::HmacSha256),
            "RSA-SHA1" => Ok(Self::RsaSha1),
            "RSA-SHA256" => Ok(Self::RsaSha256),
            "PLAINTEXT" => Ok(Self::Plaintext),
            other => Err(OAuthError::UnsupportedSigningMethod(other.to_string())),
        }
    }
}

/// Security configuration for a channel.
///
/// Settings are moved into the channel at construction and cannot be changed
/// afterwards.
///
/// # Example
///
/// ```rust
/// use oauth1_channel::settings::{SecuritySettings, SigningMethod};
///
/// let settings = SecuritySettings {
///     timestamp_window_secs: 120,
///     allowed_signing_methods: [SigningMethod::HmacSha256].into_iter().collect(),
/// };
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Accepted distance, in seconds, between a message timestamp and the
    /// local clock. This is also the replay window for nonces.
    pub timestamp_window_secs: u64,
    /// Signature methods the channel will produce or accept.
    pub allowed_signing_methods: BTreeSet<SigningMethod>,
}

impl SecuritySettings {
    /// The timestamp window as a [`Duration`].
    pub fn timestamp_window(&self) -> Duration {
        Duration::from_secs(self.timestamp_window_secs)
    }

    /// Check whether a method may be used.
    pub fn is_allowed(&self, method: SigningMethod) -> bool {
        self.allowed_signing_methods.contains(&method)
    }

    /// Reject settings the channel cannot operate with.
    pub fn validate(&self) -> Result<(), OAuthError> {
        if self.timestamp_window_secs == 0 {
            return Err(OAuthError::Config(
                "timestamp_window_secs must be greater than zero".to_string(),
            ));
        }
        if self.allowed_signing_methods.is_empty() {
            return Err(OAuthError::Config(
                "at least one signing method must be allowed".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            timestamp_window_secs: DEFAULT_TIMESTAMP_WINDOW_SECS,
            allowed_signing_methods: [
                SigningMethod::HmacSha1,
                SigningMethod::HmacSha256,
                SigningMethod::RsaSha1,
                SigningMethod::RsaSha256,
            ]
            .into_iter()
            .collect(),
        }
    }
}
