//! # recache
//!
//! Response caching middleware for async HTTP pipelines.
//!
//! `recache` intercepts GET requests flowing through a middleware chain,
//! serves previously cached bodies on a hit, and on a miss captures the
//! generated response (content type plus body) into a TTL-bound cache entry.
//! The cache backend is pluggable through the [`cache::CacheStore`] trait;
//! an in-memory reference store is included.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recache::cache::{CacheMiddleware, CacheOptions, MemoryStore};
//! use recache::context::Context;
//! use recache::middleware::{Next, from_handler, from_middleware};
//! use recache::{Request, Response, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::new());
//!     let caching = CacheMiddleware::new(store, CacheOptions::from_secs(60));
//!
//!     let chain = vec![
//!         from_middleware(Arc::new(caching)),
//!         from_handler(|_ctx| async {
//!             Response::new(StatusCode::Ok)
//!                 .header("Content-Type", "text/plain")
//!                 .body("Hello, World!")
//!         }),
//!     ];
//!
//!     let raw = b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n";
//!     let (request, _) = Request::parse(raw).unwrap();
//!     let response = Next::new(chain).run(Context::new(request)).await;
//!     let _wire = response.into_bytes();
//! }
//! ```

// ── Modules ───────────────────────────────────────────────────────────────────
pub mod cache;
pub mod context;
pub mod http;
pub mod middleware;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheMiddleware, CacheOptions, MemoryStore};
pub use http::{Headers, Method, Request, Response, StatusCode};
