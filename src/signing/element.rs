//! Tamper protection binding element.

use std::sync::{Arc, OnceLock};

use crate::channel::BindingContext;
use crate::error::OAuthError;
use crate::message::{Message, fields};
use crate::settings::{SecuritySettings, SigningMethod};
use crate::signing::SigningContext;

struct SigningInner {
    preferred: SigningMethod,
    bound_to: OnceLock<u64>,
}

/// Signs outgoing messages and verifies incoming ones.
///
/// Clones share their channel binding: a signing element, or any clone of it,
/// can serve exactly one channel.
#[derive(Clone)]
pub struct SigningElement {
    inner: Arc<SigningInner>,
}

impl SigningElement {
    /// Create an element that signs with `preferred` unless the outgoing
    /// message declares another method.
    pub fn new(preferred: SigningMethod) -> Self {
        Self {
            inner: Arc::new(SigningInner {
                preferred,
                bound_to: OnceLock::new(),
            }),
        }
    }

    /// Create an `HMAC-SHA1` signing element.
    pub fn hmac_sha1() -> Self {
        Self::new(SigningMethod::HmacSha1)
    }

    /// The method used when a message does not declare one.
    pub fn preferred_method(&self) -> SigningMethod {
        self.inner.preferred
    }

    /// Whether the element already serves a channel.
    pub fn is_bound(&self) -> bool {
        self.inner.bound_to.get().is_some()
    }

    /// Associate the element with a channel.
    pub(crate) fn bind(&self, channel_id: u64) -> Result<(), OAuthError> {
        if *self.inner.bound_to.get_or_init(|| channel_id) == channel_id {
            Ok(())
        } else {
            Err(OAuthError::BindingElementConflict)
        }
    }

    /// Declare the signature method and attach the signature.
    pub fn prepare(&self, message: &mut Message, ctx: &BindingContext<'_>) -> Result<(), OAuthError> {
        let method = match message.field(fields::SIGNATURE_METHOD) {
            Some(declared) => declared.parse()?,
            None => self.inner.preferred,
        };
        check_method(method, message, ctx.settings)?;

        message.set_field(fields::SIGNATURE_METHOD, method.as_str());
        message.remove_field(fields::SIGNATURE);

        let signature =
            SigningContext::for_signing(message, method, ctx.resolver, ctx.token)?.sign()?;
        message.set_field(fields::SIGNATURE, signature);
        Ok(())
    }

    /// Recompute and compare the signature of a received message.
    pub fn verify(&self, message: &Message, ctx: &BindingContext<'_>) -> Result<(), OAuthError> {
        let method: SigningMethod = message.require(fields::SIGNATURE_METHOD)?.parse()?;
        check_method(method, message, ctx.settings)?;
        let signature = message.require(fields::SIGNATURE)?;

        let result = SigningContext::for_verification(message, method, ctx.resolver)?.verify(signature);
        if let Err(OAuthError::SignatureVerification) = &result {
            tracing::warn!(
                consumer_key = message.consumer_key().unwrap_or_default(),
                message_type = ?message.message_type(),
                %method,
                "Signature verification failed"
            );
        }
        result
    }
}

fn check_method(
    method: SigningMethod,
    message: &Message,
    settings: &SecuritySettings,
) -> Result<(), OAuthError> {
    if !settings.is_allowed(method) {
        return Err(OAuthError::UnsupportedSigningMethod(method.to_string()));
    }
    if method == SigningMethod::Plaintext && message.endpoint().scheme() != "https" {
        return Err(OAuthError::UnsupportedSigningMethod(format!(
            "{method} requires an HTTPS endpoint"
        )));
    }
    Ok(())
}

impl std::fmt::Debug for SigningElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningElement")
            .field("preferred", &self.inner.preferred)
            .field("bound", &self.is_bound())
            .finish()
    }
}
