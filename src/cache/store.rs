//! The cache store contract.
//!
//! A store performs key-based get-or-populate with TTL expiry. The storage
//! engine behind it (and its eviction, persistence, and transport) is the
//! store's own business; this module only fixes the protocol the caching
//! middleware speaks to it.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::Response;

/// Cache configuration shared read-only across all requests of one
/// middleware instance.
///
/// The TTL governs both the store-side expiry of entries and the
/// `Cache-Control: max-age` value advertised to clients.
///
/// # Examples
///
/// ```
/// use recache::cache::CacheOptions;
///
/// let options = CacheOptions::from_secs(90);
/// assert_eq!(options.max_age_secs(), 90);
/// assert_eq!(
///     options.cache_control(),
///     "public, max-age=90, must-revalidate",
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CacheOptions {
    /// Time-to-live for stored entries, in milliseconds.
    pub ttl_ms: u64,
}

impl CacheOptions {
    /// Creates options with the given TTL in milliseconds.
    pub fn from_millis(ttl_ms: u64) -> Self {
        Self { ttl_ms }
    }

    /// Creates options with the given TTL in seconds.
    pub fn from_secs(ttl_secs: u64) -> Self {
        Self {
            ttl_ms: ttl_secs * 1000,
        }
    }

    /// The TTL as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// The `max-age` advertised to clients: `floor(ttl_ms / 1000)`.
    pub fn max_age_secs(&self) -> u64 {
        self.ttl_ms / 1000
    }

    /// The full `Cache-Control` header value advertised on every GET
    /// passing through the caching middleware.
    pub fn cache_control(&self) -> String {
        format!(
            "public, max-age={}, must-revalidate",
            self.max_age_secs()
        )
    }
}

/// A store-internal failure.
///
/// Never fatal for the request: a store error only suppresses the caching
/// optimization, it must not block response delivery.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// What a populate computation yields on a cache miss.
///
/// The `response` is forwarded to the client immediately; `entry` resolves
/// separately, at the response's completion point, with the encoded cache
/// entry — or `None` when the response turned out not to be cacheable
/// (empty body, missing content-type, oversized content-type). A dropped
/// sender counts as `None`: a response that is never finalized stores
/// nothing.
pub struct Populated {
    pub response: Response,
    pub entry: oneshot::Receiver<Option<Bytes>>,
}

impl Populated {
    /// Builds a `Populated` whose entry is already known.
    ///
    /// Useful for stores and tests that do not go through a response
    /// completion point.
    pub fn ready(response: Response, entry: Option<Bytes>) -> Self {
        let (tx, rx) = oneshot::channel();
        // Receiver is still alive, the send cannot fail.
        let _ = tx.send(entry);
        Self {
            response,
            entry: rx,
        }
    }
}

/// Future returned by a populate computation.
pub type PopulateFuture = Pin<Box<dyn Future<Output = Populated> + Send>>;

/// The miss-path computation handed to [`CacheStore::get_set`].
///
/// Invoked by the store only when no live entry exists for the key. Running
/// it drives the downstream pipeline, so a store that serializes populates
/// per key must invoke at most one concurrently for the same key.
pub type Populate = Box<dyn FnOnce() -> PopulateFuture + Send>;

/// Outcome of a get-or-populate round trip.
pub enum Lookup {
    /// A true hit: the entry bytes came from the cache and the populate
    /// computation never ran.
    Hit(Bytes),
    /// A miss: the populate computation ran and produced this response.
    /// The captured entry (if any) is the store's to keep; nothing more to
    /// do on this path.
    Miss(Response),
    /// The store failed internally. The contract requires the store to have
    /// run the populate computation anyway, so a response always exists and
    /// the client is never blocked by a cache failure.
    Failed(Response, StoreError),
}

/// Key-based get-or-populate cache with TTL expiry.
///
/// On a hit the store returns the stored bytes without invoking `populate`.
/// On a miss it invokes `populate`, returns the produced response to the
/// caller right away, and stores the entry once the populate's `entry`
/// channel resolves. `options.ttl` governs expiry of the stored value.
///
/// Stores may or may not serialize concurrent populates for the same key;
/// callers must be correct under either discipline.
pub trait CacheStore: Send + Sync {
    /// Performs one get-or-populate round trip for `key`.
    fn get_set<'a>(
        &'a self,
        key: &'a str,
        populate: Populate,
        options: &'a CacheOptions,
    ) -> Pin<Box<dyn Future<Output = Lookup> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_age_floors_sub_second_ttl() {
        assert_eq!(CacheOptions::from_millis(1999).max_age_secs(), 1);
        assert_eq!(CacheOptions::from_millis(999).max_age_secs(), 0);
    }

    #[test]
    fn cache_control_value() {
        let options = CacheOptions::from_secs(300);
        assert_eq!(
            options.cache_control(),
            "public, max-age=300, must-revalidate"
        );
    }

    #[test]
    fn options_deserialize_from_config() {
        let options: CacheOptions = serde_json::from_str(r#"{"ttl_ms": 60000}"#).unwrap();
        assert_eq!(options, CacheOptions::from_secs(60));
    }

    #[tokio::test]
    async fn ready_populated_resolves_immediately() {
        let populated = Populated::ready(
            Response::default().body("x"),
            Some(Bytes::from_static(b"entry")),
        );
        let entry = populated.entry.await.unwrap();
        assert_eq!(entry.as_deref(), Some(&b"entry"[..]));
    }
}
