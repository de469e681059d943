//! Per-message signing state and the signature algorithms.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::credentials::{SecretResolver, TokenCredentials};
use crate::encoding::percent_encode;
use crate::error::OAuthError;
use crate::message::{Message, fields};
use crate::settings::SigningMethod;
use crate::signing::signature_base_string;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

enum KeyMaterial {
    Shared(SecretString),
    Private(Arc<RsaPrivateKey>),
    Public(RsaPublicKey),
}

/// Everything needed to sign or verify one message.
///
/// Built inside a single prepare or verify call and dropped at its end.
pub struct SigningContext {
    base_string: String,
    method: SigningMethod,
    key: KeyMaterial,
}

impl SigningContext {
    /// Build a context for producing a signature.
    ///
    /// Caller-supplied token credentials take precedence over the resolver
    /// when they name the message's token.
    pub fn for_signing(
        message: &Message,
        method: SigningMethod,
        resolver: &SecretResolver,
        token: Option<&TokenCredentials>,
    ) -> Result<Self, OAuthError> {
        let consumer_key = message.require(fields::CONSUMER_KEY)?;
        let key = if method.is_asymmetric() {
            KeyMaterial::Private(resolver.consumer_private_key(consumer_key)?)
        } else {
            let token_secret = match (message.token(), token) {
                (Some(name), Some(supplied)) if supplied.token == name => {
                    Some(supplied.secret().clone())
                }
                (Some(name), _) => Some(resolver.token_secret(name)?),
                (None, _) => None,
            };
            KeyMaterial::Shared(shared_key(
                &resolver.consumer_secret(consumer_key)?,
                token_secret.as_ref(),
            ))
        };

        Ok(Self {
            base_string: signature_base_string(message),
            method,
            key,
        })
    }

    /// Build a context for checking a received signature.
    pub fn for_verification(
        message: &Message,
        method: SigningMethod,
        resolver: &SecretResolver,
    ) -> Result<Self, OAuthError> {
        let consumer_key = message.require(fields::CONSUMER_KEY)?;
        let key = if method.is_asymmetric() {
            KeyMaterial::Public(resolver.consumer_public_key(consumer_key)?)
        } else {
            let token_secret = message
                .token()
                .map(|token| resolver.token_secret(token))
                .transpose()?;
            KeyMaterial::Shared(shared_key(
                &resolver.consumer_secret(consumer_key)?,
                token_secret.as_ref(),
            ))
        };

        Ok(Self {
            base_string: signature_base_string(message),
            method,
            key,
        })
    }

    /// The signature base string.
    pub fn base_string(&self) -> &str {
        &self.base_string
    }

    /// The signature method.
    pub fn method(&self) -> SigningMethod {
        self.method
    }

    /// Compute the signature.
    pub fn sign(&self) -> Result<String, OAuthError> {
        let data = self.base_string.as_bytes();
        match (&self.key, self.method) {
            (KeyMaterial::Shared(key), SigningMethod::Plaintext) => {
                Ok(key.expose_secret().to_string())
            }
            (KeyMaterial::Shared(key), SigningMethod::HmacSha1) => {
                let mut mac = HmacSha1::new_from_slice(key.expose_secret().as_bytes())
                    .map_err(|e| OAuthError::Crypto(format!("Invalid HMAC key: {e}")))?;
                mac.update(data);
                Ok(BASE64.encode(mac.finalize().into_bytes()))
            }
            (KeyMaterial::Shared(key), SigningMethod::HmacSha256) => {
                let mut mac = HmacSha256::new_from_slice(key.expose_secret().as_bytes())
                    .map_err(|e| OAuthError::Crypto(format!("Invalid HMAC key: {e}")))?;
                mac.update(data);
                Ok(BASE64.encode(mac.finalize().into_bytes()))
            }
            (KeyMaterial::Private(key), SigningMethod::RsaSha1) => {
                let signature = SigningKey::<Sha1>::new(key.as_ref().clone())
                    .try_sign(data)
                    .map_err(|e| OAuthError::Crypto(format!("RSA signing failed: {e}")))?;
                Ok(BASE64.encode(signature.to_vec()))
            }
            (KeyMaterial::Private(key), SigningMethod::RsaSha256) => {
                let signature = SigningKey::<Sha256>::new(key.as_ref().clone())
                    .try_sign(data)
                    .map_err(|e| OAuthError::Crypto(format!("RSA signing failed: {e}")))?;
                Ok(BASE64.encode(signature.to_vec()))
            }
            _ => Err(OAuthError::Crypto(format!(
                "Key material cannot produce {} signatures",
                self.method
            ))),
        }
    }

    /// Check a received signature.
    ///
    /// Every mismatch is reported as [`OAuthError::SignatureVerification`]
    /// with no further detail.
    pub fn verify(&self, signature: &str) -> Result<(), OAuthError> {
        match (&self.key, self.method) {
            (KeyMaterial::Shared(_), _) => {
                let expected = self.sign()?;
                if constant_time_eq(&expected, signature) {
                    Ok(())
                } else {
                    Err(OAuthError::SignatureVerification)
                }
            }
            (KeyMaterial::Public(key), SigningMethod::RsaSha1) => {
                let signature = decode_rsa_signature(signature)?;
                VerifyingKey::<Sha1>::new(key.clone())
                    .verify(self.base_string.as_bytes(), &signature)
                    .map_err(|_| OAuthError::SignatureVerification)
            }
            (KeyMaterial::Public(key), SigningMethod::RsaSha256) => {
                let signature = decode_rsa_signature(signature)?;
                VerifyingKey::<Sha256>::new(key.clone())
                    .verify(self.base_string.as_bytes(), &signature)
                    .map_err(|_| OAuthError::SignatureVerification)
            }
            _ => Err(OAuthError::Crypto(format!(
                "Key material cannot verify {} signatures",
                self.method
            ))),
        }
    }
}

impl std::fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("base_string", &self.base_string)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// `ENC(consumer_secret) & ENC(token_secret)`, the key for HMAC and PLAINTEXT.
fn shared_key(consumer_secret: &SecretString, token_secret: Option<&SecretString>) -> SecretString {
    let token_secret = token_secret
        .map(|secret| percent_encode(secret.expose_secret()))
        .unwrap_or_default();
    SecretString::from(format!(
        "{}&{}",
        percent_encode(consumer_secret.expose_secret()),
        token_secret
    ))
}

fn decode_rsa_signature(signature: &str) -> Result<Signature, OAuthError> {
    let bytes = BASE64
        .decode(signature)
        .map_err(|_| OAuthError::SignatureVerification)?;
    Signature::try_from(bytes.as_slice()).map_err(|_| OAuthError::SignatureVerification)
}

/// Compare two strings without revealing where they differ.
///
/// Both sides are hashed first so the comparison time does not depend on
/// their lengths either.
fn constant_time_eq(expected: &str, provided: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let provided = Sha256::digest(provided.as_bytes());
    expected.as_slice().ct_eq(provided.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{ConsumerCredentials, InMemoryTokenManager, TokenManager};
    use crate::message::{HttpMethod, MessageType};

    fn resolver() -> SecretResolver {
        let manager: Arc<dyn TokenManager> = Arc::new(
            InMemoryTokenManager::new()
                .with_consumer("dpf43f3p2l4k3l03", "kd94hf93k423kf44")
                .with_token("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00"),
        );
        SecretResolver::consumer(ConsumerCredentials::new("dpf43f3p2l4k3l03"), manager).unwrap()
    }

    fn reference_message() -> Message {
        Message::parse(
            MessageType::ResourceAuthorized,
            HttpMethod::Get,
            "http://photos.example.net/photos?file=vacation.jpg&size=original",
        )
        .unwrap()
        .with_field("oauth_consumer_key", "dpf43f3p2l4k3l03")
        .with_field("oauth_token", "nnch734d00sl2jdk")
        .with_field("oauth_signature_method", "HMAC-SHA1")
        .with_field("oauth_timestamp", "1191242096")
        .with_field("oauth_nonce", "kllo9940pd9333jh")
    }

    #[test]
    fn test_reference_hmac_sha1_signature() {
        let ctx = SigningContext::for_signing(
            &reference_message(),
            SigningMethod::HmacSha1,
            &resolver(),
            None,
        )
        .unwrap();

        assert_eq!(ctx.sign().unwrap(), "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");
        assert!(ctx.verify("tR3+Ty81lMeYAr/Fid0kMTYa/WM=").is_ok());
        assert!(matches!(
            ctx.verify("tR3+Ty81lMeYAr/Fid0kMTYa/WM"),
            Err(OAuthError::SignatureVerification)
        ));
    }

    #[test]
    fn test_supplied_token_secret_takes_precedence() {
        let supplied = TokenCredentials::new("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
        let ctx = SigningContext::for_signing(
            &reference_message(),
            SigningMethod::HmacSha1,
            &resolver(),
            Some(&supplied),
        )
        .unwrap();
        assert_eq!(ctx.sign().unwrap(), "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");

        let wrong = TokenCredentials::new("nnch734d00sl2jdk", "other");
        let ctx = SigningContext::for_signing(
            &reference_message(),
            SigningMethod::HmacSha1,
            &resolver(),
            Some(&wrong),
        )
        .unwrap();
        assert_ne!(ctx.sign().unwrap(), "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");
    }

    #[test]
    fn test_plaintext_signature_is_the_key() {
        let ctx = SigningContext::for_signing(
            &reference_message(),
            SigningMethod::Plaintext,
            &resolver(),
            None,
        )
        .unwrap();
        assert_eq!(ctx.sign().unwrap(), "kd94hf93k423kf44&pfkkdhi9sl3r4s00");
    }

    #[test]
    fn test_hmac_sha256_length() {
        let ctx = SigningContext::for_signing(
            &reference_message(),
            SigningMethod::HmacSha256,
            &resolver(),
            None,
        )
        .unwrap();
        let signature = ctx.sign().unwrap();
        assert_eq!(BASE64.decode(&signature).unwrap().len(), 32);
    }

    #[test]
    fn test_shared_key_encoding() {
        let key = shared_key(&SecretString::from("a&b c".to_string()), None);
        assert_eq!(key.expose_secret(), "a%26b%20c&");
    }

    #[test]
    fn test_unknown_token_fails() {
        let message = reference_message().with_field("oauth_token", "unknown");
        let result =
            SigningContext::for_signing(&message, SigningMethod::HmacSha1, &resolver(), None);
        assert!(matches!(result, Err(OAuthError::UnknownCredential { .. })));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
