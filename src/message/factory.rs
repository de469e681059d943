//! Message type assignment for incoming wire messages.

use std::collections::BTreeMap;

use crate::error::OAuthError;
use crate::message::{MessageType, fields};

/// Decides which message type a set of incoming fields represents.
///
/// Implement this trait when the type follows from something the fields alone
/// do not carry, for example the endpoint a server is handling.
pub trait MessageFactory: Send + Sync {
    /// Determine the message type of the given fields.
    fn message_type(&self, fields: &BTreeMap<String, String>) -> Result<MessageType, OAuthError>;
}

/// Infers the message type from the protocol fields present.
///
/// Only protected types are ever inferred. A message without a consumer key
/// is rejected rather than read as a user authorization redirect, so a sender
/// cannot skip signature and nonce checks by leaving fields out. Servers that
/// receive authorization redirects supply a factory that recognises them by
/// endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMessageFactory;

impl MessageFactory for StandardMessageFactory {
    fn message_type(&self, received: &BTreeMap<String, String>) -> Result<MessageType, OAuthError> {
        let has = |name: &str| received.get(name).is_some_and(|value| !value.is_empty());

        match (has(fields::CONSUMER_KEY), has(fields::TOKEN)) {
            (true, true) if has(fields::VERIFIER) => Ok(MessageType::AccessToken),
            (true, true) => Ok(MessageType::ResourceAuthorized),
            (true, false) => Ok(MessageType::RequestToken),
            (false, _) => Err(OAuthError::InvalidMessage(
                "Fields do not describe a signed OAuth message".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_standard_factory_inference() {
        let factory = StandardMessageFactory;

        let rt = fields_of(&[("oauth_consumer_key", "k"), ("oauth_callback", "oob")]);
        assert_eq!(factory.message_type(&rt).unwrap(), MessageType::RequestToken);

        let at = fields_of(&[
            ("oauth_consumer_key", "k"),
            ("oauth_token", "t"),
            ("oauth_verifier", "v"),
        ]);
        assert_eq!(factory.message_type(&at).unwrap(), MessageType::AccessToken);

        let res = fields_of(&[("oauth_consumer_key", "k"), ("oauth_token", "t")]);
        assert_eq!(factory.message_type(&res).unwrap(), MessageType::ResourceAuthorized);

    }

    #[test]
    fn test_standard_factory_never_infers_unprotected() {
        let factory = StandardMessageFactory;
        for fields in [
            fields_of(&[("oauth_token", "t")]),
            fields_of(&[("oauth_token", "t"), ("status", "hello")]),
            fields_of(&[("oauth_consumer_key", ""), ("oauth_token", "t")]),
        ] {
            assert!(matches!(
                factory.message_type(&fields),
                Err(OAuthError::InvalidMessage(_))
            ));
        }
    }

    #[test]
    fn test_standard_factory_rejects_non_oauth() {
        let factory = StandardMessageFactory;
        let fields = fields_of(&[("status", "hello"), ("oauth_token", "")]);
        assert!(matches!(
            factory.message_type(&fields),
            Err(OAuthError::InvalidMessage(_))
        ));
    }
}
