//! Response caching — middleware, key derivation, entry codec, and stores.
//!
//! [`CacheMiddleware`] intercepts GET requests flowing through the pipeline.
//! On a hit it decodes the stored entry and short-circuits the chain; on a
//! miss it lets the downstream pipeline run, captures the final content-type
//! and body at the response's completion point, and hands the encoded entry
//! to the [`CacheStore`] for future requests with the same key.
//!
//! Only GET requests are ever cached. Every GET passing through the
//! middleware is answered with `Cache-Control: public, max-age=<ttl>,
//! must-revalidate`, hit or miss. Store failures are logged and degrade to
//! an uncached pass-through; they never block response delivery.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::context::Context;
use crate::middleware::{Middleware, Next};
use crate::{Request, Response, StatusCode};

pub mod entry;
pub mod key;
pub mod memory;
pub mod store;

pub use key::{CacheKey, KeyFn, KeySource};
pub use memory::MemoryStore;
pub use store::{
    CacheOptions, CacheStore, Lookup, Populate, PopulateFuture, Populated, StoreError,
};

/// Middleware that serves GET responses from a [`CacheStore`] and captures
/// uncached ones as they complete.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use recache::cache::{CacheMiddleware, CacheOptions, MemoryStore};
///
/// let caching = CacheMiddleware::new(Arc::new(MemoryStore::new()), CacheOptions::from_secs(60))
///     .key_fn(|req| format!("{}{}", req.method(), req.url()));
/// ```
pub struct CacheMiddleware {
    store: Arc<dyn CacheStore>,
    key_source: KeySource,
    options: CacheOptions,
}

impl CacheMiddleware {
    /// Creates caching middleware over the given store.
    ///
    /// Keys default to the request URL (path plus query); override with
    /// [`key`](Self::key), [`key_static`](Self::key_static), or
    /// [`key_fn`](Self::key_fn).
    pub fn new(store: Arc<dyn CacheStore>, options: CacheOptions) -> Self {
        Self {
            store,
            key_source: KeySource::default(),
            options,
        }
    }

    /// Sets the key source.
    #[must_use]
    pub fn key(mut self, source: KeySource) -> Self {
        self.key_source = source;
        self
    }

    /// Keys every matching request under one fixed string — effectively a
    /// single-entry cache, so only useful for a route with exactly one
    /// representation. An empty string falls back to URL keying.
    #[must_use]
    pub fn key_static(self, key: impl Into<String>) -> Self {
        self.key(KeySource::from_static(key))
    }

    /// Derives the key from the request with `f`, invoked once per request.
    #[must_use]
    pub fn key_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key(KeySource::from_fn(f))
    }
}

impl Middleware for CacheMiddleware {
    fn handle(&self, mut ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let store = Arc::clone(&self.store);
        let key_source = self.key_source.clone();
        let options = self.options;

        Box::pin(async move {
            // Hard precondition: anything but GET passes straight through —
            // no key, no header, no store round trip.
            if !ctx.request().method().is_cacheable() {
                return next.run(ctx).await;
            }

            let key = key_source.resolve(ctx.request());
            ctx.extensions_mut().insert(CacheKey(key.clone()));

            let cache_control = options.cache_control();

            let populate: Populate = {
                let key = key.clone();
                let cache_control = cache_control.clone();
                Box::new(move || -> PopulateFuture {
                    Box::pin(async move {
                        debug!(key = %key, "cache miss");
                        let mut response = next.run(ctx).await;
                        response.set_header("Cache-Control", &cache_control);

                        let (tx, rx) = oneshot::channel();
                        response.set_on_finalize(Box::new(move |headers, body| {
                            let captured = if body.is_empty() {
                                // Nothing worth storing.
                                None
                            } else {
                                match headers.get("content-type") {
                                    Some(content_type) => {
                                        let encoded = entry::encode(content_type, body);
                                        if encoded.is_none() {
                                            debug!(
                                                key = %key,
                                                "content-type too long — response not cached"
                                            );
                                        }
                                        encoded
                                    }
                                    // No content-type at completion time:
                                    // skip capture rather than guess one.
                                    None => None,
                                }
                            };
                            let _ = tx.send(captured);
                        }));

                        Populated {
                            response,
                            entry: rx,
                        }
                    })
                })
            };

            match store.get_set(&key, populate, &options).await {
                Lookup::Hit(bytes) => match entry::decode(&bytes) {
                    Some((content_type, body)) => {
                        debug!(key = %key, "cache hit");
                        Response::new(StatusCode::Ok)
                            .header("Content-Type", content_type)
                            .header("Cache-Control", &cache_control)
                            .body_bytes(body)
                    }
                    // Entries are written only by our own encoder; a buffer
                    // that does not decode is a corrupted store.
                    None => {
                        error!(key = %key, "corrupt cache entry — refusing to serve it");
                        Response::new(StatusCode::InternalServerError)
                            .body("Corrupt cache entry")
                    }
                },
                // The populate path already produced and decorated the real
                // response; nothing more to do with the echoed value.
                Lookup::Miss(response) => response,
                Lookup::Failed(response, err) => {
                    warn!(key = %key, error = %err, "cache store error — serving uncached response");
                    response
                }
            }
        })
    }
}
