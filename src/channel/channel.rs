//! The OAuth message channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use secrecy::SecretString;

use crate::channel::{BindingContext, Pipeline};
use crate::credentials::{ConsumerCredentials, SecretResolver, TokenCredentials, TokenManager};
use crate::error::OAuthError;
use crate::message::{
    DeliveryMethod, Direction, Message, MessageFactory, StandardMessageFactory, WireMessage, fields,
};
use crate::nonce::{MemoryNonceStore, NonceGuard, NonceProvider, NonceStore};
use crate::settings::SecuritySettings;
use crate::signing::SigningElement;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Prepares outgoing messages and validates incoming ones.
///
/// A channel holds only configuration and collaborator handles; all
/// per-message state lives inside a single call, so one channel can serve
/// many threads at once.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use oauth1_channel::channel::Channel;
/// use oauth1_channel::credentials::{ConsumerCredentials, InMemoryTokenManager};
/// use oauth1_channel::message::{HttpMethod, Message, MessageType};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = Arc::new(
///     InMemoryTokenManager::new()
///         .with_consumer("consumer_key", "consumer_secret")
///         .with_token("access_token", "token_secret"),
/// );
/// let channel = Channel::builder()
///     .consumer(ConsumerCredentials::new("consumer_key"))
///     .token_manager(tokens)
///     .build()?;
///
/// let message = Message::parse(
///     MessageType::ResourceAuthorized,
///     HttpMethod::Get,
///     "https://api.example.com/1/statuses?count=5",
/// )?
/// .with_field("oauth_token", "access_token");
///
/// let wire = channel.prepare_outgoing(message)?;
/// assert!(wire.authorization.unwrap().contains("oauth_signature="));
/// # Ok(())
/// # }
/// ```
pub struct Channel {
    id: u64,
    settings: Arc<SecuritySettings>,
    resolver: SecretResolver,
    pipeline: Pipeline,
    message_factory: Arc<dyn MessageFactory>,
    delivery: DeliveryMethod,
}

impl Channel {
    /// Create a new channel builder.
    pub fn builder() -> ChannelBuilder {
        ChannelBuilder::new()
    }

    /// Run the outgoing pipeline and render the message for transport.
    pub fn prepare_outgoing(&self, message: Message) -> Result<WireMessage, OAuthError> {
        let message = self.sign_outgoing(message, None)?;
        Ok(WireMessage::from_message(&message, self.delivery))
    }

    /// Like [`Channel::prepare_outgoing`], signing with caller-supplied token
    /// credentials instead of looking the token secret up.
    pub fn prepare_outgoing_with_token(
        &self,
        message: Message,
        token: &TokenCredentials,
    ) -> Result<WireMessage, OAuthError> {
        let message = self.sign_outgoing(message, Some(token))?;
        Ok(WireMessage::from_message(&message, self.delivery))
    }

    /// Run the outgoing pipeline and return the prepared message.
    ///
    /// Fills in the channel's consumer key, and the token of `token`, when
    /// the message does not carry them.
    pub fn sign_outgoing(
        &self,
        mut message: Message,
        token: Option<&TokenCredentials>,
    ) -> Result<Message, OAuthError> {
        if message.direction() != Direction::Outgoing {
            return Err(OAuthError::InvalidMessage(
                "Only outgoing messages can be prepared".to_string(),
            ));
        }

        if message.message_type().is_protected() && message.consumer_key().is_none() {
            if let Some(consumer_key) = self.resolver.consumer_key() {
                message.set_field(fields::CONSUMER_KEY, consumer_key);
            }
        }

        if let Some(token) = token {
            match message.token() {
                None => message.set_field(fields::TOKEN, token.token.clone()),
                Some(existing) if existing == token.token => {}
                Some(_) => {
                    return Err(OAuthError::InvalidMessage(
                        "Token credentials do not match the message token".to_string(),
                    ));
                }
            }
        }

        let ctx = BindingContext::new(&self.settings, &self.resolver, token);
        self.pipeline.prepare_outgoing(&mut message, &ctx)?;

        tracing::debug!(
            channel = self.id,
            message_type = ?message.message_type(),
            endpoint = %message.endpoint(),
            "Prepared outgoing message"
        );
        Ok(message)
    }

    /// Read a wire message, run the incoming pipeline and return the
    /// verified message.
    pub fn process_incoming(&self, wire: &WireMessage) -> Result<Message, OAuthError> {
        let received = wire.fields()?;
        let message_type = self.message_factory.message_type(&received)?;
        let mut message = Message::incoming(message_type, wire.method, wire.endpoint(), received);
        if let Some(realm) = wire.realm()? {
            message = message.with_realm(realm);
        }
        self.verify_incoming(message)
    }

    /// Run the incoming pipeline on an already decoded message.
    pub fn verify_incoming(&self, message: Message) -> Result<Message, OAuthError> {
        if message.direction() != Direction::Incoming {
            return Err(OAuthError::InvalidMessage(
                "Only incoming messages can be verified".to_string(),
            ));
        }

        let ctx = BindingContext::new(&self.settings, &self.resolver, None);
        self.pipeline.process_incoming(&message, &ctx)?;

        tracing::debug!(
            channel = self.id,
            message_type = ?message.message_type(),
            "Verified incoming message"
        );
        Ok(message)
    }

    /// Get a consumer secret through the channel's resolver.
    ///
    /// On a consumer channel any key but the configured one is
    /// [`OAuthError::CredentialMismatch`].
    pub fn consumer_secret(&self, consumer_key: &str) -> Result<SecretString, OAuthError> {
        self.resolver.consumer_secret(consumer_key)
    }

    /// The consumer key of a consumer channel.
    pub fn consumer_key(&self) -> Option<&str> {
        self.resolver.consumer_key()
    }

    /// The channel's security settings.
    pub fn settings(&self) -> &SecuritySettings {
        &self.settings
    }

    /// The binding element pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// How outgoing messages are rendered.
    pub fn delivery_method(&self) -> DeliveryMethod {
        self.delivery
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .field("resolver", &self.resolver)
            .field("delivery", &self.delivery)
            .finish()
    }
}

/// Builder for [`Channel`].
pub struct ChannelBuilder {
    consumer: Option<ConsumerCredentials>,
    token_manager: Option<Arc<dyn TokenManager>>,
    nonce_store: Option<Arc<dyn NonceStore>>,
    nonce_provider: Option<Arc<dyn NonceProvider>>,
    signing_element: Option<SigningElement>,
    message_factory: Option<Arc<dyn MessageFactory>>,
    settings: SecuritySettings,
    delivery: DeliveryMethod,
}

impl ChannelBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            consumer: None,
            token_manager: None,
            nonce_store: None,
            nonce_provider: None,
            signing_element: None,
            message_factory: None,
            settings: SecuritySettings::default(),
            delivery: DeliveryMethod::default(),
        }
    }

    /// Build a consumer-side channel for these credentials.
    ///
    /// Without consumer credentials the channel is provider-side.
    pub fn consumer(mut self, credentials: ConsumerCredentials) -> Self {
        self.consumer = Some(credentials);
        self
    }

    /// Set the token manager (required).
    pub fn token_manager(mut self, token_manager: Arc<dyn TokenManager>) -> Self {
        self.token_manager = Some(token_manager);
        self
    }

    /// Set the nonce store. Defaults to a [`MemoryNonceStore`] sized to the
    /// timestamp window.
    pub fn nonce_store(mut self, store: Arc<dyn NonceStore>) -> Self {
        self.nonce_store = Some(store);
        self
    }

    /// Set a custom nonce provider.
    pub fn nonce_provider(mut self, provider: Arc<dyn NonceProvider>) -> Self {
        self.nonce_provider = Some(provider);
        self
    }

    /// Set the signing element. Defaults to `HMAC-SHA1`.
    pub fn signing_element(mut self, element: SigningElement) -> Self {
        self.signing_element = Some(element);
        self
    }

    /// Set the message factory for incoming messages.
    pub fn message_factory(mut self, factory: Arc<dyn MessageFactory>) -> Self {
        self.message_factory = Some(factory);
        self
    }

    /// Set the security settings.
    pub fn settings(mut self, settings: SecuritySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set how outgoing messages are rendered.
    pub fn delivery_method(mut self, delivery: DeliveryMethod) -> Self {
        self.delivery = delivery;
        self
    }

    /// Build the channel.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::Config`] for invalid settings or a missing token manager
    /// - [`OAuthError::CredentialMismatch`] when the token manager does not
    ///   serve the configured consumer key
    /// - [`OAuthError::BindingElementConflict`] when the signing element
    ///   already belongs to another channel
    pub fn build(self) -> Result<Channel, OAuthError> {
        self.settings.validate()?;

        let token_manager = self
            .token_manager
            .ok_or_else(|| OAuthError::Config("a token manager is required".to_string()))?;

        let signing = self.signing_element.unwrap_or_else(SigningElement::hmac_sha1);
        if !self.settings.is_allowed(signing.preferred_method()) {
            return Err(OAuthError::Config(format!(
                "preferred signing method {} is not allowed",
                signing.preferred_method()
            )));
        }

        let resolver = match self.consumer {
            Some(credentials) => SecretResolver::consumer(credentials, token_manager)?,
            None => SecretResolver::provider(token_manager),
        };

        let window = self.settings.timestamp_window();
        let store = self
            .nonce_store
            .unwrap_or_else(|| Arc::new(MemoryNonceStore::new(window)));
        let mut nonce_guard = NonceGuard::new(store, window);
        if let Some(provider) = self.nonce_provider {
            nonce_guard = nonce_guard.with_nonce_provider(provider);
        }

        let id = NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed);
        signing.bind(id)?;

        tracing::debug!(
            channel = id,
            consumer_key = resolver.consumer_key(),
            method = %signing.preferred_method(),
            "Built OAuth channel"
        );

        Ok(Channel {
            id,
            settings: Arc::new(self.settings),
            resolver,
            pipeline: Pipeline::new(nonce_guard, signing),
            message_factory: self
                .message_factory
                .unwrap_or_else(|| Arc::new(StandardMessageFactory)),
            delivery: self.delivery,
        })
    }
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
