//! Replay protection.
//!
//! This module provides:
//! - Nonce generation for outgoing messages
//! - The [`NonceStore`] contract with its atomic check-and-insert primitive
//! - An in-memory store built on a TTL cache
//! - [`NonceGuard`], the binding element that enforces the timestamp window
//!   and rejects replayed nonces

mod generator;
mod guard;
mod store;
mod ttl_cache;

pub use generator::{DEFAULT_NONCE_LENGTH, NonceProvider, RandomNonce};
pub use guard::NonceGuard;
pub use store::{MemoryNonceStore, NonceStore};
use ttl_cache::TtlCache;
