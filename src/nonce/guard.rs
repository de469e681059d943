//! Replay protection binding element.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::error::OAuthError;
use crate::message::{Message, fields};
use crate::nonce::{NonceProvider, NonceStore, RandomNonce};

/// Attaches nonce and timestamp to outgoing messages and rejects stale or
/// replayed incoming ones.
#[derive(Clone)]
pub struct NonceGuard {
    store: Arc<dyn NonceStore>,
    nonce_provider: Arc<dyn NonceProvider>,
    window_secs: u64,
}

impl NonceGuard {
    /// Create a guard backed by `store` with the given timestamp window.
    pub fn new(store: Arc<dyn NonceStore>, timestamp_window: Duration) -> Self {
        Self {
            store,
            nonce_provider: Arc::new(RandomNonce::new()),
            window_secs: timestamp_window.as_secs(),
        }
    }

    /// Use a custom nonce provider for outgoing messages.
    pub fn with_nonce_provider(mut self, provider: Arc<dyn NonceProvider>) -> Self {
        self.nonce_provider = provider;
        self
    }

    /// Attach a fresh nonce and the current timestamp.
    pub fn prepare(&self, message: &mut Message) -> Result<(), OAuthError> {
        message.set_field(fields::NONCE, self.nonce_provider.next_nonce());
        message.set_field(fields::TIMESTAMP, unix_now().to_string());
        Ok(())
    }

    /// Check the timestamp window, then record the nonce.
    pub fn verify(&self, message: &Message) -> Result<(), OAuthError> {
        let consumer_key = message.require(fields::CONSUMER_KEY)?;
        let nonce = message.require(fields::NONCE)?;
        let timestamp = parse_timestamp(message.require(fields::TIMESTAMP)?)?;

        self.check_timestamp(timestamp, unix_now())?;

        let token = message.token().unwrap_or_default();
        if !self.store.try_record(consumer_key, token, nonce, timestamp) {
            tracing::warn!(
                consumer_key,
                message_type = ?message.message_type(),
                "Replayed nonce rejected"
            );
            return Err(OAuthError::ReplayDetected);
        }
        Ok(())
    }

    /// Accept timestamps no more than one window behind or ahead of `now`.
    pub fn check_timestamp(&self, timestamp: i64, now: i64) -> Result<(), OAuthError> {
        if timestamp.abs_diff(now) > self.window_secs {
            return Err(OAuthError::ExpiredTimestamp {
                timestamp,
                now,
                window_secs: self.window_secs,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for NonceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceGuard")
            .field("window_secs", &self.window_secs)
            .finish_non_exhaustive()
    }
}

/// Current time in seconds since the Unix epoch.
pub(crate) fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn parse_timestamp(value: &str) -> Result<i64, OAuthError> {
    // Positive integer only: no sign, no fraction.
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OAuthError::InvalidMessage(format!("Invalid timestamp: {value}")));
    }
    value
        .parse()
        .map_err(|_| OAuthError::InvalidMessage(format!("Invalid timestamp: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{HttpMethod, MessageType};
    use crate::nonce::MemoryNonceStore;

    fn guard() -> NonceGuard {
        let store = Arc::new(MemoryNonceStore::new(Duration::from_secs(300)));
        NonceGuard::new(store, Duration::from_secs(300))
    }

    fn message() -> Message {
        Message::parse(
            MessageType::ResourceAuthorized,
            HttpMethod::Get,
            "https://api.example.com/resource",
        )
        .unwrap()
        .with_field(fields::CONSUMER_KEY, "consumer")
        .with_field(fields::TOKEN, "token")
    }

    #[test]
    fn test_prepare_attaches_fresh_values() {
        let guard = guard();
        let mut first = message();
        let mut second = message();
        guard.prepare(&mut first).unwrap();
        guard.prepare(&mut second).unwrap();

        assert_ne!(first.nonce(), second.nonce());
        let timestamp: i64 = first.timestamp().unwrap().parse().unwrap();
        assert!(timestamp.abs_diff(unix_now()) <= 1);
    }

    #[test]
    fn test_verify_then_replay() {
        let guard = guard();
        let mut msg = message();
        guard.prepare(&mut msg).unwrap();

        assert!(guard.verify(&msg).is_ok());
        assert!(matches!(guard.verify(&msg), Err(OAuthError::ReplayDetected)));
    }

    #[test]
    fn test_old_timestamp_rejected_even_with_new_nonce() {
        let guard = guard();
        let msg = message()
            .with_field(fields::NONCE, "never-seen")
            .with_field(fields::TIMESTAMP, (unix_now() - 301).to_string());

        assert!(matches!(
            guard.verify(&msg),
            Err(OAuthError::ExpiredTimestamp { window_secs: 300, .. })
        ));
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let guard = guard();
        let msg = message()
            .with_field(fields::NONCE, "never-seen")
            .with_field(fields::TIMESTAMP, (unix_now() + 400).to_string());

        assert!(matches!(
            guard.verify(&msg),
            Err(OAuthError::ExpiredTimestamp { .. })
        ));
    }

    #[test]
    fn test_window_boundaries() {
        let guard = guard();
        assert!(guard.check_timestamp(1000, 1300).is_ok());
        assert!(guard.check_timestamp(1300, 1000).is_ok());
        assert!(guard.check_timestamp(999, 1300).is_err());
        assert!(guard.check_timestamp(1301, 1000).is_err());
    }

    #[test]
    fn test_future_dated_message_cannot_be_replayed_at_window_edge() {
        let window = Duration::from_secs(1);
        let guard = NonceGuard::new(Arc::new(MemoryNonceStore::new(window)), window);

        // Start late in a second so the message stays acceptable for as long
        // as possible after it is first recorded.
        while OffsetDateTime::now_utc().nanosecond() < 850_000_000 {
            std::thread::sleep(Duration::from_millis(10));
        }
        let msg = message()
            .with_field(fields::NONCE, "edge")
            .with_field(fields::TIMESTAMP, (unix_now() + 1).to_string());
        assert!(guard.verify(&msg).is_ok());

        std::thread::sleep(Duration::from_millis(2050));
        assert!(matches!(
            guard.verify(&msg),
            Err(OAuthError::ReplayDetected | OAuthError::ExpiredTimestamp { .. })
        ));
    }

    #[test]
    fn test_expired_message_does_not_consume_nonce() {
        let guard = guard();
        let now = unix_now();
        let stale = message()
            .with_field(fields::NONCE, "n")
            .with_field(fields::TIMESTAMP, (now - 1000).to_string());
        assert!(guard.verify(&stale).is_err());

        let fresh = message()
            .with_field(fields::NONCE, "n")
            .with_field(fields::TIMESTAMP, now.to_string());
        assert!(guard.verify(&fresh).is_ok());
    }

    #[test]
    fn test_malformed_fields() {
        let guard = guard();
        let missing_nonce = message().with_field(fields::TIMESTAMP, unix_now().to_string());
        assert!(matches!(
            guard.verify(&missing_nonce),
            Err(OAuthError::MissingField("oauth_nonce"))
        ));

        let bad_timestamp = message()
            .with_field(fields::NONCE, "n")
            .with_field(fields::TIMESTAMP, "-5");
        assert!(matches!(
            guard.verify(&bad_timestamp),
            Err(OAuthError::InvalidMessage(_))
        ));
    }
}
