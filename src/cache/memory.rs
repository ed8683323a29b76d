//! In-memory reference implementation of [`CacheStore`].
//!
//! A `HashMap` of TTL-bound entries with per-key in-flight population
//! tracking: the first miss for a key owns the populate computation and
//! concurrent requests for the same key wait for its outcome instead of
//! running the downstream pipeline again. Expired entries are dropped
//! lazily on lookup.
//!
//! This is deliberately not a storage engine — no LRU, no size bound, no
//! persistence. It backs tests, demos, and small single-process deployments;
//! anything bigger should implement [`CacheStore`] over a real backend.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use super::store::{CacheOptions, CacheStore, Lookup, Populate, PopulateFuture, Populated};

struct StoredEntry {
    bytes: Bytes,
    expires_at: Instant,
}

struct State {
    entries: HashMap<String, StoredEntry>,
    // Key -> signal that flips once the owning populate has resolved.
    inflight: HashMap<String, watch::Receiver<()>>,
}

enum Claim {
    // This call owns the populate; dropping the guard releases the waiters.
    Owner(InflightGuard),
    Waiter(watch::Receiver<()>),
}

// Clears the owner's in-flight marker and wakes waiters on drop. The owner's
// future can be dropped at any await point (the caller's task may be
// cancelled mid-populate), so cleanup cannot live on the happy path alone:
// tying it to drop guarantees waiters are never stranded on a marker whose
// owner is gone.
struct InflightGuard {
    state: Arc<Mutex<State>>,
    key: String,
    release: watch::Sender<()>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        // Only this guard removes the marker, so the entry under `key` is
        // still ours. Remove it before signalling: a woken waiter must not
        // find the stale marker and go back to sleep on a closed channel.
        lock(&self.state).inflight.remove(&self.key);
        let _ = self.release.send(());
    }
}

/// In-memory, TTL-expiring cache store with per-key populate serialization.
///
/// Cheap to share: wrap it in an [`Arc`] and clone the handle.
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
                inflight: HashMap::new(),
            })),
        }
    }

    /// Number of entries currently held, including not-yet-collected
    /// expired ones.
    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    /// Returns `true` when the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// A poisoned lock only means another thread panicked mid-operation; the map
// itself is still structurally sound, so recover the guard.
fn lock(state: &Mutex<State>) -> std::sync::MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CacheStore for MemoryStore {
    fn get_set<'a>(
        &'a self,
        key: &'a str,
        populate: Populate,
        options: &'a CacheOptions,
    ) -> Pin<Box<dyn Future<Output = Lookup> + Send + 'a>> {
        Box::pin(async move {
            let guard = loop {
                let claim = {
                    let mut state = lock(&self.state);
                    let now = Instant::now();

                    match state.entries.get(key) {
                        Some(entry) if entry.expires_at > now => {
                            return Lookup::Hit(entry.bytes.clone());
                        }
                        Some(_) => {
                            state.entries.remove(key);
                        }
                        None => {}
                    }

                    if let Some(rx) = state.inflight.get(key) {
                        Claim::Waiter(rx.clone())
                    } else {
                        let (tx, rx) = watch::channel(());
                        state.inflight.insert(key.to_owned(), rx);
                        Claim::Owner(InflightGuard {
                            state: Arc::clone(&self.state),
                            key: key.to_owned(),
                            release: tx,
                        })
                    }
                };

                match claim {
                    Claim::Owner(guard) => break guard,
                    Claim::Waiter(mut rx) => {
                        // Owner resolved (or went away) — re-check from the top.
                        let _ = rx.changed().await;
                    }
                }
            };

            let Populated { response, entry } = populate().await;

            // Write-back happens once the entry channel resolves at the
            // response's completion point. The guard moves into the task so
            // the in-flight marker clears and waiters release only after the
            // entry is durably in the map.
            let state = Arc::clone(&self.state);
            let key = key.to_owned();
            let ttl = options.ttl();
            tokio::spawn(async move {
                let stored = entry.await.ok().flatten();
                {
                    let mut state = lock(&state);
                    match stored {
                        Some(bytes) => {
                            debug!(key = %key, len = bytes.len(), "cache store: entry written");
                            state.entries.insert(
                                key.clone(),
                                StoredEntry {
                                    bytes,
                                    expires_at: Instant::now() + ttl,
                                },
                            );
                        }
                        None => {
                            debug!(key = %key, "cache store: populate produced no entry");
                        }
                    }
                }
                drop(guard);
            });

            Lookup::Miss(response)
        })
    }
}
