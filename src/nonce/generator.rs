//! Nonce generation for outgoing messages.

use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;

/// Default nonce length. 32 alphanumeric characters carry about 190 bits.
pub const DEFAULT_NONCE_LENGTH: usize = 32;

/// Trait for providing nonces for outgoing messages.
///
/// Values must be unique per message with overwhelming probability and use
/// only characters that survive percent-encoding unchanged.
pub trait NonceProvider: Send + Sync {
    /// Generate the next nonce value.
    fn next_nonce(&self) -> String;
}

/// Random alphanumeric nonces drawn from the operating system RNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomNonce {
    length: usize,
}

impl RandomNonce {
    /// Create a provider producing nonces of the default length.
    pub fn new() -> Self {
        Self {
            length: DEFAULT_NONCE_LENGTH,
        }
    }

    /// Create a provider producing nonces of a custom length.
    ///
    /// Lengths below 22 characters (128 bits) are raised to 22.
    pub fn with_length(length: usize) -> Self {
        Self {
            length: length.max(22),
        }
    }
}

impl Default for RandomNonce {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceProvider for RandomNonce {
    fn next_nonce(&self) -> String {
        Alphanumeric.sample_string(&mut OsRng, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_nonce_shape() {
        let nonce = RandomNonce::new().next_nonce();
        assert_eq!(nonce.len(), DEFAULT_NONCE_LENGTH);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_minimum_length() {
        assert_eq!(RandomNonce::with_length(8).next_nonce().len(), 22);
    }

    #[test]
    fn test_nonce_unique_across_threads() {
        let provider = std::sync::Arc::new(RandomNonce::new());
        let mut handles = vec![];

        for _ in 0..4 {
            let p = provider.clone();
            handles.push(thread::spawn(move || {
                let mut nonces = Vec::new();
                for _ in 0..1000 {
                    nonces.push(p.next_nonce());
                }
                nonces
            }));
        }

        let mut all_nonces = HashSet::new();
        for handle in handles {
            let nonces = handle.join().unwrap();
            for nonce in nonces {
                assert!(
                    all_nonces.insert(nonce),
                    "Nonce must be unique across threads"
                );
            }
        }
    }
}
