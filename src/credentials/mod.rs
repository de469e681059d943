//! Credentials and secret resolution.
//!
//! This module provides:
//! - Consumer and token credentials with redacted secrets
//! - The [`TokenManager`] lookup contract and an in-memory implementation
//! - [`SecretResolver`], the consumer-side or provider-side view binding
//!   elements use to obtain secrets

#[allow(clippy::module_inception)]
mod credentials;
mod resolver;
mod token_manager;

pub use credentials::{ConsumerCredentials, TokenCredentials};
pub use resolver::{ConsumerResolver, ProviderResolver, SecretResolver};
pub use token_manager::{CONSUMER_KEY_VAR, CONSUMER_SECRET_VAR, InMemoryTokenManager, TokenManager};
