//! The logical protocol message.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::OAuthError;
use crate::message::fields;

/// Whether a message is being sent or has been received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Built locally, heading to transport.
    Outgoing,
    /// Received from transport.
    Incoming,
}

/// The kind of protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Request for an unauthorized request token.
    RequestToken,
    /// Redirect of the user to the provider for approval. Not signed.
    UserAuthorization,
    /// Exchange of an authorized request token for an access token.
    AccessToken,
    /// Call to a protected resource with an access token.
    ResourceAuthorized,
}

impl MessageType {
    /// Fields that must be present and non-empty.
    pub const fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::RequestToken => &[fields::CONSUMER_KEY, fields::CALLBACK],
            Self::UserAuthorization => &[fields::TOKEN],
            Self::AccessToken => &[fields::CONSUMER_KEY, fields::TOKEN, fields::VERIFIER],
            Self::ResourceAuthorized => &[fields::CONSUMER_KEY, fields::TOKEN],
        }
    }

    /// Whether the message is signed and replay protected.
    pub const fn is_protected(&self) -> bool {
        !matches!(self, Self::UserAuthorization)
    }
}

/// HTTP verb used in the signature base string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
}

impl HttpMethod {
    /// Upper-case method name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }

    /// Whether the method carries a request body.
    pub const fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            other => Err(OAuthError::InvalidMessage(format!("Unsupported HTTP method: {other}"))),
        }
    }
}

/// A protocol message: a field map plus the request line it is bound to.
///
/// Query parameters in the endpoint are moved into the field map so that the
/// endpoint only ever holds the base URI. Once signed, changing any field
/// other than `oauth_signature` invalidates the signature. The header `realm`
/// is kept apart from the fields and never signed.
///
/// # Example
///
/// ```rust
/// use oauth1_channel::message::{HttpMethod, Message, MessageType};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let message = Message::parse(
///     MessageType::ResourceAuthorized,
///     HttpMethod::Get,
///     "https://api.example.com/photos?size=original",
/// )?
/// .with_field("oauth_token", "nnch734d00sl2jdk");
///
/// assert_eq!(message.field("size"), Some("original"));
/// assert_eq!(message.endpoint().as_str(), "https://api.example.com/photos");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    message_type: MessageType,
    direction: Direction,
    method: HttpMethod,
    endpoint: Url,
    fields: BTreeMap<String, String>,
    realm: Option<String>,
}

impl Message {
    /// Create an outgoing message.
    ///
    /// Sets `oauth_version`, and `oauth_callback=oob` for request token
    /// messages; both can be overridden with [`Message::with_field`].
    pub fn new(message_type: MessageType, method: HttpMethod, endpoint: Url) -> Self {
        let mut message = Self::from_parts(
            message_type,
            Direction::Outgoing,
            method,
            endpoint,
            BTreeMap::new(),
        );
        if message_type.is_protected() {
            message.set_field(fields::VERSION, fields::PROTOCOL_VERSION);
        }
        if message_type == MessageType::RequestToken {
            message.set_field(fields::CALLBACK, fields::OUT_OF_BAND);
        }
        message
    }

    /// Create an outgoing message from an endpoint string.
    pub fn parse(
        message_type: MessageType,
        method: HttpMethod,
        endpoint: &str,
    ) -> Result<Self, OAuthError> {
        Ok(Self::new(message_type, method, Url::parse(endpoint)?))
    }

    /// Create an incoming message from fields already read off the wire.
    pub fn incoming(
        message_type: MessageType,
        method: HttpMethod,
        endpoint: Url,
        fields: BTreeMap<String, String>,
    ) -> Self {
        Self::from_parts(message_type, Direction::Incoming, method, endpoint, fields)
    }

    fn from_parts(
        message_type: MessageType,
        direction: Direction,
        method: HttpMethod,
        mut endpoint: Url,
        mut fields: BTreeMap<String, String>,
    ) -> Self {
        for (key, value) in endpoint.query_pairs() {
            fields
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        endpoint.set_query(None);
        endpoint.set_fragment(None);

        Self {
            message_type,
            direction,
            method,
            endpoint,
            fields,
            realm: None,
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Set a field, replacing any previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Remove a field, returning its value.
    pub fn remove_field(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// Builder-style setter for the `Authorization` header realm.
    ///
    /// Only header delivery transmits it.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// The `Authorization` header realm, if any.
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// Get a field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Get a field that must be present and non-empty.
    pub fn require(&self, name: &'static str) -> Result<&str, OAuthError> {
        self.field(name)
            .filter(|value| !value.is_empty())
            .ok_or(OAuthError::MissingField(name))
    }

    /// All fields, sorted by name.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Application fields, i.e. everything that is not a protocol field.
    pub fn application_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(name, _)| !fields::is_protocol(name))
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// The consumer key, if set.
    pub fn consumer_key(&self) -> Option<&str> {
        self.field(fields::CONSUMER_KEY)
    }

    /// The token, if set and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.field(fields::TOKEN).filter(|token| !token.is_empty())
    }

    /// The signature, if set.
    pub fn signature(&self) -> Option<&str> {
        self.field(fields::SIGNATURE)
    }

    /// The nonce, if set.
    pub fn nonce(&self) -> Option<&str> {
        self.field(fields::NONCE)
    }

    /// The timestamp field, if set.
    pub fn timestamp(&self) -> Option<&str> {
        self.field(fields::TIMESTAMP)
    }

    /// The message type.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The message direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The endpoint, without query or fragment.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}
