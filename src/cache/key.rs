//! Cache key derivation.
//!
//! Every cacheable request resolves to exactly one string key, derived from
//! a [`KeySource`] configured once when the middleware is built.

use std::fmt;
use std::sync::Arc;

use crate::Request;

/// A per-request key-generating function.
pub type KeyFn = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// Where a request's cache key comes from.
///
/// Resolved once at configuration time; [`resolve`](Self::resolve) is then a
/// straight dispatch with no per-request type inspection.
///
/// # Examples
///
/// ```
/// use recache::cache::KeySource;
///
/// // Default: the request URL (path + query) is the key.
/// let url = KeySource::default();
///
/// // Key on method + URL instead.
/// let per_method = KeySource::from_fn(|req| format!("{}{}", req.method(), req.url()));
///
/// // A fixed key — effectively a single-entry cache.
/// let fixed = KeySource::from_static("homepage");
/// ```
#[derive(Clone, Default)]
pub enum KeySource {
    /// The request's URL: path plus query string. Varies per distinct resource.
    #[default]
    Url,
    /// A fixed key shared by every matching request.
    Static(String),
    /// A function of the request, invoked exactly once per request.
    ///
    /// The rest of the system assumes the function is deterministic for a
    /// given request; that is the caller's responsibility.
    Func(KeyFn),
}

impl KeySource {
    /// Builds a static key source.
    ///
    /// An empty string means "no key supplied" and falls back to [`Url`]
    /// rather than caching everything under `""`.
    ///
    /// [`Url`]: KeySource::Url
    pub fn from_static(key: impl Into<String>) -> Self {
        let key = key.into();
        if key.is_empty() {
            Self::Url
        } else {
            Self::Static(key)
        }
    }

    /// Builds a key source from a per-request function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        Self::Func(Arc::new(f))
    }

    /// Derives the cache key for `request`.
    ///
    /// A [`Func`](KeySource::Func) source is invoked exactly once; its return
    /// value is used for both lookup and store within the request's lifecycle.
    pub fn resolve(&self, request: &Request) -> String {
        match self {
            Self::Url => request.url(),
            Self::Static(key) => key.clone(),
            Self::Func(f) => f(request),
        }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url => f.write_str("KeySource::Url"),
            Self::Static(key) => f.debug_tuple("KeySource::Static").field(key).finish(),
            Self::Func(_) => f.write_str("KeySource::Func(..)"),
        }
    }
}

/// The key resolved for the current request, attached to the request
/// context's extensions for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey(pub String);

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn make_request(raw: &[u8]) -> Request {
        let (req, _) = Request::parse(raw).unwrap();
        req
    }

    #[test]
    fn url_source_uses_path_and_query() {
        let req = make_request(b"GET /items?page=2 HTTP/1.1\r\nHost: x\r\n\r\n");
        assert_eq!(KeySource::Url.resolve(&req), "/items?page=2");
    }

    #[test]
    fn static_source_ignores_request() {
        let req = make_request(b"GET /whatever HTTP/1.1\r\nHost: x\r\n\r\n");
        let source = KeySource::from_static("fixed");
        assert_eq!(source.resolve(&req), "fixed");
    }

    #[test]
    fn empty_static_falls_back_to_url() {
        let req = make_request(b"GET /fallback?a=1 HTTP/1.1\r\nHost: x\r\n\r\n");
        let source = KeySource::from_static("");
        assert!(matches!(&source, KeySource::Url));
        assert_eq!(source.resolve(&req), "/fallback?a=1");
    }

    #[test]
    fn fn_source_invoked_exactly_once_per_resolve() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let source = KeySource::from_fn(|req| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            format!("{}{}", req.method(), req.url())
        });

        let req = make_request(b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n");
        assert_eq!(source.resolve(&req), "GET/a");
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);

        assert_eq!(source.resolve(&req), "GET/a");
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }
}
