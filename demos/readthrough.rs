//! Read-through caching over a simulated pipeline.
//!
//! Runs the same GET twice through a middleware chain: the first request
//! reaches the handler and its response is captured, the second is served
//! straight from the in-memory store. Run with:
//!
//! ```sh
//! RUST_LOG=debug cargo run --example readthrough
//! ```

use std::sync::Arc;

use recache::cache::{CacheMiddleware, CacheOptions, MemoryStore};
use recache::context::Context;
use recache::middleware::{LoggerMiddleware, Next, from_handler, from_middleware};
use recache::{Request, Response, StatusCode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = Arc::new(MemoryStore::new());
    let caching = Arc::new(CacheMiddleware::new(
        store.clone(),
        CacheOptions::from_secs(60),
    ));

    let chain = || {
        Next::new(vec![
            from_middleware(Arc::new(LoggerMiddleware)),
            from_middleware(caching.clone()),
            from_handler(|ctx: Context| async move {
                println!("  handler invoked for {}", ctx.request().url());
                Response::new(StatusCode::Ok)
                    .header("Content-Type", "text/plain")
                    .body("Hello from the pipeline!")
            }),
        ])
    };

    let raw = b"GET /greeting HTTP/1.1\r\nHost: localhost\r\n\r\n";

    println!("first request (miss):");
    let (request, _) = Request::parse(raw).expect("well-formed request");
    let response = chain().run(Context::new(request)).await;
    // Serializing the response is its completion point; the cache entry is
    // captured here.
    let wire = response.into_bytes();
    println!("  sent {} bytes", wire.len());

    // Let the store finish its write-back.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    println!("store now holds {} entry(ies)", store.len());

    println!("second request (hit, handler stays quiet):");
    let (request, _) = Request::parse(raw).expect("well-formed request");
    let response = chain().run(Context::new(request)).await;
    let wire = response.into_bytes();
    println!("  sent {} bytes", wire.len());
}
