//! Secret resolution for binding elements.
//!
//! A consumer-side channel serves exactly one consumer key: its secret is
//! resolved once at construction and any other key is refused. A
//! provider-side channel serves every consumer its token manager knows.

use std::sync::Arc;

use rsa::{RsaPrivateKey, RsaPublicKey};
use secrecy::SecretString;

use crate::credentials::{ConsumerCredentials, TokenManager};
use crate::error::OAuthError;

/// Resolves the secrets the signer needs for a message.
#[derive(Clone)]
pub enum SecretResolver {
    /// Resolver for a consumer application.
    Consumer(ConsumerResolver),
    /// Resolver for a service provider.
    Provider(ProviderResolver),
}

impl SecretResolver {
    /// Build a consumer-side resolver.
    ///
    /// Fails with [`OAuthError::CredentialMismatch`] when the token manager
    /// does not recognise the configured consumer key.
    pub fn consumer(
        credentials: ConsumerCredentials,
        token_manager: Arc<dyn TokenManager>,
    ) -> Result<Self, OAuthError> {
        ConsumerResolver::new(credentials, token_manager).map(Self::Consumer)
    }

    /// Build a provider-side resolver.
    pub fn provider(token_manager: Arc<dyn TokenManager>) -> Self {
        Self::Provider(ProviderResolver { token_manager })
    }

    /// The consumer key this resolver is pinned to, if any.
    pub fn consumer_key(&self) -> Option<&str> {
        match self {
            Self::Consumer(resolver) => Some(&resolver.credentials.consumer_key),
            Self::Provider(_) => None,
        }
    }

    /// Get the shared secret of a consumer.
    pub fn consumer_secret(&self, consumer_key: &str) -> Result<SecretString, OAuthError> {
        require_identifier(consumer_key)?;
        match self {
            Self::Consumer(resolver) => {
                resolver.check_key(consumer_key)?;
                Ok(resolver.consumer_secret.clone())
            }
            Self::Provider(resolver) => resolver.token_manager.consumer_secret(consumer_key),
        }
    }

    /// Get the secret paired with a token. Never cached.
    pub fn token_secret(&self, token: &str) -> Result<SecretString, OAuthError> {
        require_identifier(token)?;
        self.token_manager().token_secret(token)
    }

    /// Get the private key used to produce RSA signatures.
    pub fn consumer_private_key(&self, consumer_key: &str) -> Result<Arc<RsaPrivateKey>, OAuthError> {
        require_identifier(consumer_key)?;
        match self {
            Self::Consumer(resolver) => {
                resolver.check_key(consumer_key)?;
                resolver.credentials.private_key().cloned().ok_or_else(|| {
                    OAuthError::Crypto("No RSA private key configured for the consumer".to_string())
                })
            }
            Self::Provider(_) => Err(OAuthError::unknown(consumer_key)),
        }
    }

    /// Get the public key used to verify RSA signatures.
    pub fn consumer_public_key(&self, consumer_key: &str) -> Result<RsaPublicKey, OAuthError> {
        require_identifier(consumer_key)?;
        match self {
            Self::Consumer(resolver) => {
                resolver.check_key(consumer_key)?;
                match resolver.token_manager.consumer_public_key(consumer_key) {
                    Err(OAuthError::UnknownCredential { .. }) => resolver
                        .credentials
                        .private_key()
                        .map(|key| RsaPublicKey::from(key.as_ref()))
                        .ok_or_else(|| OAuthError::unknown(consumer_key)),
                    other => other,
                }
            }
            Self::Provider(resolver) => resolver.token_manager.consumer_public_key(consumer_key),
        }
    }

    fn token_manager(&self) -> &Arc<dyn TokenManager> {
        match self {
            Self::Consumer(resolver) => &resolver.token_manager,
            Self::Provider(resolver) => &resolver.token_manager,
        }
    }
}

impl std::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consumer(resolver) => f
                .debug_struct("Consumer")
                .field("credentials", &resolver.credentials)
                .finish_non_exhaustive(),
            Self::Provider(_) => f.debug_struct("Provider").finish_non_exhaustive(),
        }
    }
}

/// Consumer-side resolver state.
#[derive(Clone)]
pub struct ConsumerResolver {
    credentials: ConsumerCredentials,
    consumer_secret: SecretString,
    token_manager: Arc<dyn TokenManager>,
}

impl ConsumerResolver {
    fn new(
        credentials: ConsumerCredentials,
        token_manager: Arc<dyn TokenManager>,
    ) -> Result<Self, OAuthError> {
        require_identifier(&credentials.consumer_key)?;
        let consumer_secret = match token_manager.consumer_secret(&credentials.consumer_key) {
            Ok(secret) => secret,
            Err(OAuthError::UnknownCredential { .. }) => {
                return Err(OAuthError::CredentialMismatch {
                    expected: credentials.consumer_key,
                    actual: None,
                });
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            credentials,
            consumer_secret,
            token_manager,
        })
    }

    fn check_key(&self, consumer_key: &str) -> Result<(), OAuthError> {
        if consumer_key == self.credentials.consumer_key {
            Ok(())
        } else {
            Err(OAuthError::CredentialMismatch {
                expected: self.credentials.consumer_key.clone(),
                actual: Some(consumer_key.to_string()),
            })
        }
    }
}

/// Provider-side resolver state.
#[derive(Clone)]
pub struct ProviderResolver {
    token_manager: Arc<dyn TokenManager>,
}

fn require_identifier(identifier: &str) -> Result<(), OAuthError> {
    if identifier.is_empty() {
        Err(OAuthError::unknown(identifier))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::InMemoryTokenManager;
    use secrecy::ExposeSecret;

    fn manager() -> Arc<dyn TokenManager> {
        Arc::new(
            InMemoryTokenManager::new()
                .with_consumer("A", "secret_a")
                .with_consumer("B", "secret_b")
                .with_token("token", "token_secret"),
        )
    }

    #[test]
    fn test_consumer_resolver_pins_key() {
        let resolver = SecretResolver::consumer(ConsumerCredentials::new("A"), manager()).unwrap();

        assert_eq!(resolver.consumer_key(), Some("A"));
        assert_eq!(
            resolver.consumer_secret("A").unwrap().expose_secret(),
            "secret_a"
        );
        assert!(matches!(
            resolver.consumer_secret("B"),
            Err(OAuthError::CredentialMismatch { expected, actual })
                if expected == "A" && actual.as_deref() == Some("B")
        ));
    }

    #[test]
    fn test_consumer_resolver_probe_fails_closed() {
        let only_b: Arc<dyn TokenManager> =
            Arc::new(InMemoryTokenManager::new().with_consumer("B", "secret_b"));

        let result = SecretResolver::consumer(ConsumerCredentials::new("A"), only_b);
        assert!(matches!(
            result,
            Err(OAuthError::CredentialMismatch { expected, actual: None }) if expected == "A"
        ));
    }

    #[test]
    fn test_provider_resolver_serves_all_consumers() {
        let resolver = SecretResolver::provider(manager());
        assert_eq!(resolver.consumer_key(), None);
        assert_eq!(
            resolver.consumer_secret("B").unwrap().expose_secret(),
            "secret_b"
        );
        assert!(matches!(
            resolver.consumer_secret("C"),
            Err(OAuthError::UnknownCredential { .. })
        ));
    }

    #[test]
    fn test_token_secret_and_empty_identifiers() {
        let resolver = SecretResolver::provider(manager());
        assert_eq!(
            resolver.token_secret("token").unwrap().expose_secret(),
            "token_secret"
        );
        assert!(matches!(
            resolver.token_secret(""),
            Err(OAuthError::UnknownCredential { .. })
        ));
        assert!(matches!(
            resolver.consumer_secret(""),
            Err(OAuthError::UnknownCredential { .. })
        ));
    }

    #[test]
    fn test_missing_private_key() {
        let resolver = SecretResolver::consumer(ConsumerCredentials::new("A"), manager()).unwrap();
        assert!(matches!(
            resolver.consumer_private_key("A"),
            Err(OAuthError::Crypto(_))
        ));
        assert!(matches!(
            resolver.consumer_public_key("A"),
            Err(OAuthError::UnknownCredential { .. })
        ));
    }
}
