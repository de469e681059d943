//! Consumer and token credentials.

use std::sync::Arc;

use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use secrecy::{ExposeSecret, SecretString};

use crate::error::OAuthError;

/// The consumer's identity, owned by a channel for its whole lifetime.
///
/// The consumer secret is not held here: it is resolved through the
/// [`TokenManager`](super::TokenManager) when the channel is built. An RSA
/// private key is only needed for the `RSA-SHA1` and `RSA-SHA256` methods.
#[derive(Clone)]
pub struct ConsumerCredentials {
    /// The consumer key (public identifier)
    pub consumer_key: String,
    private_key: Option<Arc<RsaPrivateKey>>,
}

impl ConsumerCredentials {
    /// Create credentials for a consumer key.
    pub fn new(consumer_key: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            private_key: None,
        }
    }

    /// Attach an RSA private key for asymmetric signing.
    pub fn with_private_key(mut self, key: RsaPrivateKey) -> Self {
        self.private_key = Some(Arc::new(key));
        self
    }

    /// Attach an RSA private key from PEM, either PKCS#8 or PKCS#1.
    pub fn with_private_key_pem(self, pem: &str) -> Result<Self, OAuthError> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| OAuthError::Crypto(format!("Invalid RSA private key: {e}")))?;
        Ok(self.with_private_key(key))
    }

    /// The RSA private key, if configured.
    pub fn private_key(&self) -> Option<&Arc<RsaPrivateKey>> {
        self.private_key.as_ref()
    }
}

impl std::fmt::Debug for ConsumerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("has_private_key", &self.private_key.is_some())
            .finish()
    }
}

/// A token and its secret, supplied by the caller for a single request.
#[derive(Clone)]
pub struct TokenCredentials {
    /// The token (public identifier)
    pub token: String,
    secret: SecretString,
}

impl TokenCredentials {
    /// Create token credentials.
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// The token secret as a [`SecretString`].
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    /// Get the token secret for signing.
    ///
    /// This method exposes the secret - use carefully.
    pub fn expose_secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl std::fmt::Debug for TokenCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCredentials")
            .field("token", &self.token)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
