//! Token manager contract and an in-memory implementation.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use rsa::RsaPublicKey;
use secrecy::SecretString;

use crate::error::OAuthError;

/// Environment variable read by [`InMemoryTokenManager::try_from_env`].
pub const CONSUMER_KEY_VAR: &str = "OAUTH_CONSUMER_KEY";
/// Environment variable read by [`InMemoryTokenManager::try_from_env`].
pub const CONSUMER_SECRET_VAR: &str = "OAUTH_CONSUMER_SECRET";

/// Lookup of consumer and token secrets.
///
/// Implement this trait to back the channel with a database or a secrets
/// manager. Every method is a read-only lookup and may be called from many
/// requests at once.
pub trait TokenManager: Send + Sync {
    /// Get the shared secret of a consumer.
    ///
    /// Returns [`OAuthError::UnknownCredential`] for unrecognised keys.
    fn consumer_secret(&self, consumer_key: &str) -> Result<SecretString, OAuthError>;

    /// Get the secret paired with a token.
    ///
    /// Returns [`OAuthError::UnknownCredential`] for unrecognised or revoked
    /// tokens.
    fn token_secret(&self, token: &str) -> Result<SecretString, OAuthError>;

    /// Get the public key used to verify a consumer's RSA signatures.
    fn consumer_public_key(&self, consumer_key: &str) -> Result<RsaPublicKey, OAuthError> {
        Err(OAuthError::unknown(consumer_key))
    }
}

/// Token manager holding everything in memory.
///
/// # Example
///
/// ```rust
/// use oauth1_channel::credentials::{InMemoryTokenManager, TokenManager};
/// use secrecy::ExposeSecret;
///
/// let manager = InMemoryTokenManager::new()
///     .with_consumer("dpf43f3p2l4k3l03", "kd94hf93k423kf44")
///     .with_token("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
///
/// let secret = manager.token_secret("nnch734d00sl2jdk").unwrap();
/// assert_eq!(secret.expose_secret(), "pfkkdhi9sl3r4s00");
/// ```
#[derive(Default)]
pub struct InMemoryTokenManager {
    consumers: RwLock<HashMap<String, SecretString>>,
    tokens: RwLock<HashMap<String, SecretString>>,
    public_keys: RwLock<HashMap<String, RsaPublicKey>>,
}

impl InMemoryTokenManager {
    /// Create an empty token manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token manager for the consumer named by the default
    /// environment variables.
    ///
    /// Reads `OAUTH_CONSUMER_KEY` and `OAUTH_CONSUMER_SECRET`; returns `None`
    /// if either is not set.
    pub fn try_from_env() -> Option<(String, Self)> {
        Self::try_from_env_vars(CONSUMER_KEY_VAR, CONSUMER_SECRET_VAR)
    }

    /// Like [`InMemoryTokenManager::try_from_env`] with custom variable names.
    pub fn try_from_env_vars(key_var: &str, secret_var: &str) -> Option<(String, Self)> {
        let consumer_key = std::env::var(key_var).ok()?;
        let consumer_secret = std::env::var(secret_var).ok()?;
        let manager = Self::new().with_consumer(consumer_key.clone(), consumer_secret);
        Some((consumer_key, manager))
    }

    /// Register a consumer.
    pub fn with_consumer(self, consumer_key: impl Into<String>, secret: impl Into<String>) -> Self {
        write(&self.consumers).insert(consumer_key.into(), SecretString::from(secret.into()));
        self
    }

    /// Register a token.
    pub fn with_token(self, token: impl Into<String>, secret: impl Into<String>) -> Self {
        self.insert_token(token, secret);
        self
    }

    /// Register the RSA public key of a consumer.
    pub fn with_consumer_public_key(self, consumer_key: impl Into<String>, key: RsaPublicKey) -> Self {
        write(&self.public_keys).insert(consumer_key.into(), key);
        self
    }

    /// Add or replace a token at runtime.
    pub fn insert_token(&self, token: impl Into<String>, secret: impl Into<String>) {
        write(&self.tokens).insert(token.into(), SecretString::from(secret.into()));
    }

    /// Revoke a token. Returns whether it was known.
    pub fn revoke_token(&self, token: &str) -> bool {
        write(&self.tokens).remove(token).is_some()
    }
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

impl TokenManager for InMemoryTokenManager {
    fn consumer_secret(&self, consumer_key: &str) -> Result<SecretString, OAuthError> {
        read(&self.consumers)
            .get(consumer_key)
            .cloned()
            .ok_or_else(|| OAuthError::unknown(consumer_key))
    }

    fn token_secret(&self, token: &str) -> Result<SecretString, OAuthError> {
        read(&self.tokens)
            .get(token)
            .cloned()
            .ok_or_else(|| OAuthError::unknown(token))
    }

    fn consumer_public_key(&self, consumer_key: &str) -> Result<RsaPublicKey, OAuthError> {
        read(&self.public_keys)
            .get(consumer_key)
            .cloned()
            .ok_or_else(|| OAuthError::unknown(consumer_key))
    }
}

impl std::fmt::Debug for InMemoryTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTokenManager")
            .field("consumers", &read(&self.consumers).len())
            .field("tokens", &read(&self.tokens).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_lookup() {
        let manager = InMemoryTokenManager::new()
            .with_consumer("key", "consumer_secret")
            .with_token("token", "token_secret");

        assert_eq!(
            manager.consumer_secret("key").unwrap().expose_secret(),
            "consumer_secret"
        );
        assert_eq!(
            manager.token_secret("token").unwrap().expose_secret(),
            "token_secret"
        );
    }

    #[test]
    fn test_unknown_identifiers() {
        let manager = InMemoryTokenManager::new();
        assert!(matches!(
            manager.consumer_secret("nope"),
            Err(OAuthError::UnknownCredential { identifier }) if identifier == "nope"
        ));
        assert!(matches!(
            manager.consumer_public_key("nope"),
            Err(OAuthError::UnknownCredential { .. })
        ));
    }

    #[test]
    fn test_revoke_token() {
        let manager = InMemoryTokenManager::new().with_token("token", "secret");
        assert!(manager.revoke_token("token"));
        assert!(!manager.revoke_token("token"));
        assert!(manager.token_secret("token").is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let manager = InMemoryTokenManager::new().with_consumer("key", "hunter2");
        let debug_str = format!("{:?}", manager);
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn test_try_from_env_missing() {
        assert!(
            InMemoryTokenManager::try_from_env_vars(
                "OAUTH1_CHANNEL_TEST_UNSET_KEY",
                "OAUTH1_CHANNEL_TEST_UNSET_SECRET"
            )
            .is_none()
        );
    }
}
