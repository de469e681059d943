//! # OAuth 1.0a Channel
//!
//! The message-processing core of an OAuth 1.0a consumer or service provider.
//!
//! ## Features
//!
//! - Signature base string construction and percent-encoding
//! - `HMAC-SHA1`, `HMAC-SHA256`, `RSA-SHA1`, `RSA-SHA256` and `PLAINTEXT` signing
//! - Nonce and timestamp replay protection with an atomic nonce store
//! - A fixed-order binding element pipeline shared by both directions
//! - Consumer-side and provider-side secret resolution
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use oauth1_channel::channel::Channel;
//! use oauth1_channel::credentials::{ConsumerCredentials, InMemoryTokenManager};
//! use oauth1_channel::message::{HttpMethod, Message, MessageType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = Arc::new(
//!     InMemoryTokenManager::new()
//!         .with_consumer("consumer_key", "consumer_secret")
//!         .with_token("access_token", "token_secret"),
//! );
//!
//! let consumer = Channel::builder()
//!     .consumer(ConsumerCredentials::new("consumer_key"))
//!     .token_manager(tokens.clone())
//!     .build()?;
//! let provider = Channel::builder().token_manager(tokens).build()?;
//!
//! let message = Message::parse(
//!     MessageType::ResourceAuthorized,
//!     HttpMethod::Post,
//!     "https://api.example.com/statuses/update",
//! )?
//! .with_field("oauth_token", "access_token")
//! .with_field("status", "hello");
//!
//! let wire = consumer.prepare_outgoing(message)?;
//! let received = provider.process_incoming(&wire)?;
//! assert_eq!(received.field("status"), Some("hello"));
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod credentials;
pub mod encoding;
pub mod error;
pub mod message;
pub mod nonce;
pub mod settings;
pub mod signing;

// Re-export commonly used types at crate root
pub use channel::{Channel, ChannelBuilder};
pub use error::OAuthError;
pub use message::{HttpMethod, Message, MessageType, WireMessage};
pub use settings::{SecuritySettings, SigningMethod};

/// Result type alias using OAuthError
pub type Result<T> = std::result::Result<T, OAuthError>;
