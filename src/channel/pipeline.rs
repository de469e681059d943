//! The ordered binding element pipeline.
//!
//! Order is fixed, not configurable:
//!
//! ```text
//! outgoing: ReplayProtection -> TamperProtection -> Protocol
//! incoming: Protocol -> TamperProtection -> ReplayProtection
//! ```
//!
//! Outgoing, the nonce and timestamp are attached before signing so the
//! signature covers them. Incoming, the signature is checked before the nonce
//! store is written, so an unauthenticated sender cannot fill it.

use crate::credentials::{SecretResolver, TokenCredentials};
use crate::error::OAuthError;
use crate::message::{Message, fields};
use crate::nonce::NonceGuard;
use crate::settings::SecuritySettings;
use crate::signing::SigningElement;

/// What binding elements may consult while processing one message.
#[derive(Debug, Clone, Copy)]
pub struct BindingContext<'a> {
    pub(crate) settings: &'a SecuritySettings,
    pub(crate) resolver: &'a SecretResolver,
    pub(crate) token: Option<&'a TokenCredentials>,
}

impl<'a> BindingContext<'a> {
    /// Create a context; `token` carries caller-supplied token credentials.
    pub fn new(
        settings: &'a SecuritySettings,
        resolver: &'a SecretResolver,
        token: Option<&'a TokenCredentials>,
    ) -> Self {
        Self {
            settings,
            resolver,
            token,
        }
    }
}

/// Checks the fields each message type requires.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolElement;

impl ProtocolElement {
    /// Check a message against its type's requirements.
    pub fn check(&self, message: &Message) -> Result<(), OAuthError> {
        for &name in message.message_type().required_fields() {
            message.require(name)?;
        }
        match message.field(fields::VERSION) {
            None | Some(fields::PROTOCOL_VERSION) => Ok(()),
            Some(other) => Err(OAuthError::InvalidMessage(format!(
                "Unsupported protocol version: {other}"
            ))),
        }
    }
}

/// Kinds of binding element, in outgoing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKind {
    /// Nonce and timestamp.
    ReplayProtection,
    /// Signature.
    TamperProtection,
    /// Required protocol fields.
    Protocol,
}

/// One step of the pipeline.
#[derive(Debug, Clone)]
pub enum BindingElement {
    /// Nonce and timestamp handling.
    ReplayProtection(NonceGuard),
    /// Signing and signature verification.
    TamperProtection(SigningElement),
    /// Required field checks.
    Protocol(ProtocolElement),
}

impl BindingElement {
    /// The kind of this element.
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::ReplayProtection(_) => ElementKind::ReplayProtection,
            Self::TamperProtection(_) => ElementKind::TamperProtection,
            Self::Protocol(_) => ElementKind::Protocol,
        }
    }

    fn applies_to(&self, message: &Message) -> bool {
        match self {
            Self::Protocol(_) => true,
            Self::ReplayProtection(_) | Self::TamperProtection(_) => {
                message.message_type().is_protected()
            }
        }
    }

    fn prepare(&self, message: &mut Message, ctx: &BindingContext<'_>) -> Result<(), OAuthError> {
        match self {
            Self::ReplayProtection(guard) => guard.prepare(message),
            Self::TamperProtection(signer) => signer.prepare(message, ctx),
            Self::Protocol(protocol) => protocol.check(message),
        }
    }

    fn verify(&self, message: &Message, ctx: &BindingContext<'_>) -> Result<(), OAuthError> {
        match self {
            Self::ReplayProtection(guard) => guard.verify(message),
            Self::TamperProtection(signer) => signer.verify(message, ctx),
            Self::Protocol(protocol) => protocol.check(message),
        }
    }
}

/// The statically ordered list of binding elements.
#[derive(Debug, Clone)]
pub struct Pipeline {
    elements: Vec<BindingElement>,
}

impl Pipeline {
    /// Assemble the pipeline from its stateful elements.
    pub fn new(nonce_guard: NonceGuard, signing: SigningElement) -> Self {
        Self {
            elements: vec![
                BindingElement::ReplayProtection(nonce_guard),
                BindingElement::TamperProtection(signing),
                BindingElement::Protocol(ProtocolElement),
            ],
        }
    }

    /// Element kinds in the order outgoing messages visit them.
    pub fn outgoing_order(&self) -> Vec<ElementKind> {
        self.elements.iter().map(BindingElement::kind).collect()
    }

    /// Element kinds in the order incoming messages visit them.
    pub fn incoming_order(&self) -> Vec<ElementKind> {
        self.elements.iter().rev().map(BindingElement::kind).collect()
    }

    /// Run every applicable element's outgoing step, stopping at the first
    /// failure.
    pub fn prepare_outgoing(
        &self,
        message: &mut Message,
        ctx: &BindingContext<'_>,
    ) -> Result<(), OAuthError> {
        for element in &self.elements {
            if element.applies_to(message) {
                element.prepare(message, ctx)?;
            }
        }
        Ok(())
    }

    /// Run every applicable element's incoming step in reverse order,
    /// stopping at the first failure.
    pub fn process_incoming(
        &self,
        message: &Message,
        ctx: &BindingContext<'_>,
    ) -> Result<(), OAuthError> {
        for element in self.elements.iter().rev() {
            if element.applies_to(message) {
                element.verify(message, ctx)?;
            }
        }
        Ok(())
    }
}
