//! Rotating credential pool.
//!
//! The pool keeps the immutable set of configured keys alongside the subset
//! that has not failed since the last reset (the current generation). Keys
//! are drawn at random from the available subset, evicted when a request
//! made with them fails, and the subset is refilled from the full set once
//! it runs dry.
//!
//! All state transitions happen under a single mutex that is only held for
//! the transition itself, never across a network call.

use crate::credential::ApiKey;
use crate::random::{RandomSource, ThreadRandom};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of [`CredentialPool::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    /// A key was drawn.
    Drawn {
        /// The selected key.
        key: ApiKey,
        /// True if the available set was empty and had to be refilled first.
        reset: bool,
        /// Keys left in the current generation, including `key`.
        remaining: usize,
    },
    /// No keys are configured at all.
    Unconfigured,
}

/// The full and currently-usable sets of API keys.
pub struct CredentialPool {
    all: Vec<ApiKey>,
    available: Mutex<Vec<ApiKey>>,
    random: Box<dyn RandomSource>,
}

impl CredentialPool {
    /// Creates a pool drawing with the thread-local RNG.
    #[must_use]
    pub fn new(keys: Vec<ApiKey>) -> Self {
        Self::with_random_source(keys, ThreadRandom)
    }

    /// Creates a pool with an explicit random source.
    #[must_use]
    pub fn with_random_source(keys: Vec<ApiKey>, random: impl RandomSource + 'static) -> Self {
        if keys.is_empty() {
            tracing::warn!("Credential pool created without any keys");
        } else {
            tracing::info!(credentials = keys.len(), "Credential pool initialized");
        }

        Self {
            available: Mutex::new(keys.clone()),
            all: keys,
            random: Box::new(random),
        }
    }

    /// Draws a key uniformly at random without removing it.
    ///
    /// Returns `None` if the available set is empty. Does not reset.
    #[must_use]
    pub fn draw(&self) -> Option<ApiKey> {
        let available = self.lock_available();
        self.pick(&available)
    }

    /// Removes a key from the available set.
    ///
    /// Returns true if the key was present. Evicting an absent key is a no-op.
    pub fn evict(&self, key: &ApiKey) -> bool {
        let mut available = self.lock_available();
        let Some(position) = available.iter().position(|k| k == key) else {
            return false;
        };
        available.remove(position);
        tracing::debug!(
            credential = %key.redacted(),
            remaining = available.len(),
            "Evicted credential"
        );
        true
    }

    /// Refills the available set with a fresh copy of every configured key.
    pub fn reset(&self) {
        let mut available = self.lock_available();
        self.refill(&mut available);
    }

    /// Resets the pool if it is empty, then draws a key.
    ///
    /// Both steps happen under one lock acquisition, so a concurrent
    /// eviction cannot empty the set between the refill and the draw.
    #[must_use]
    pub fn acquire(&self) -> Acquired {
        let mut available = self.lock_available();

        let reset = available.is_empty();
        if reset {
            self.refill(&mut available);
        }

        match self.pick(&available) {
            Some(key) => Acquired::Drawn {
                key,
                reset,
                remaining: available.len(),
            },
            None => Acquired::Unconfigured,
        }
    }

    /// Returns the number of configured keys.
    #[must_use]
    pub fn len_all(&self) -> usize {
        self.all.len()
    }

    /// Returns the number of keys in the current generation.
    #[must_use]
    pub fn len_available(&self) -> usize {
        self.lock_available().len()
    }

    /// Returns true if no keys are configured.
    #[must_use]
    pub fn is_unconfigured(&self) -> bool {
        self.all.is_empty()
    }

    /// Returns every configured key, in configuration order.
    #[must_use]
    pub fn all(&self) -> &[ApiKey] {
        &self.all
    }

    /// Returns a snapshot of the current generation.
    #[must_use]
    pub fn available(&self) -> Vec<ApiKey> {
        self.lock_available().clone()
    }

    fn pick(&self, available: &[ApiKey]) -> Option<ApiKey> {
        if available.is_empty() {
            return None;
        }
        let index = self.random.index(available.len()).min(available.len() - 1);
        Some(available[index].clone())
    }

    fn refill(&self, available: &mut Vec<ApiKey>) {
        *available = self.all.clone();
        if available.is_empty() {
            tracing::warn!("Attempted to reset credential pool, but no keys are configured");
        } else {
            tracing::info!(credentials = available.len(), "Credential pool reset");
        }
    }

    fn lock_available(&self) -> MutexGuard<'_, Vec<ApiKey>> {
        // Every critical section leaves the Vec consistent, so a panic while
        // holding the lock cannot corrupt it.
        self.available
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("all", &self.all.len())
            .field("available", &self.len_available())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always picks the first available key.
    struct First;

    impl RandomSource for First {
        fn index(&self, _len: usize) -> usize {
            0
        }
    }

    /// Cycles through indices 0, 1, 2, ...
    struct Cycle(AtomicUsize);

    impl RandomSource for Cycle {
        fn index(&self, len: usize) -> usize {
            self.0.fetch_add(1, Ordering::SeqCst) % len
        }
    }

    fn keys(raw: &[&str]) -> Vec<ApiKey> {
        raw.iter().map(|k| k.parse().expect("valid key")).collect()
    }

    #[test]
    fn new_pool_has_everything_available() {
        let pool = CredentialPool::new(keys(&["k1", "k2", "k3"]));
        assert_eq!(pool.len_all(), 3);
        assert_eq!(pool.len_available(), 3);
        assert_eq!(pool.available(), pool.all().to_vec());
    }

    #[test]
    fn draw_does_not_remove() {
        let pool = CredentialPool::with_random_source(keys(&["k1", "k2"]), First);
        let first = pool.draw().expect("key");
        let second = pool.draw().expect("key");
        assert_eq!(first, second);
        assert_eq!(pool.len_available(), 2);
    }

    #[test]
    fn draw_on_empty_pool_returns_none() {
        let pool = CredentialPool::new(keys(&["k1"]));
        let key = pool.draw().expect("key");
        pool.evict(&key);
        assert!(pool.draw().is_none());
    }

    #[test]
    fn evict_is_idempotent() {
        let pool = CredentialPool::new(keys(&["k1", "k2"]));
        let k1 = pool.all()[0].clone();
        assert!(pool.evict(&k1));
        assert!(!pool.evict(&k1));
        assert_eq!(pool.len_available(), 1);
        assert_eq!(pool.len_all(), 2);
    }

    #[test]
    fn evicted_key_is_never_drawn_again_within_generation() {
        let pool = CredentialPool::with_random_source(
            keys(&["k1", "k2", "k3"]),
            Cycle(AtomicUsize::new(0)),
        );
        let k2 = pool.all()[1].clone();
        pool.evict(&k2);

        for _ in 0..30 {
            assert_ne!(pool.draw().expect("key"), k2);
        }

        pool.reset();
        let drawn: HashSet<ApiKey> = (0..30).filter_map(|_| pool.draw()).collect();
        assert!(drawn.contains(&k2));
    }

    #[test]
    fn reset_restores_full_set_without_aliasing() {
        let pool = CredentialPool::new(keys(&["k1", "k2"]));
        for key in pool.all().to_vec() {
            pool.evict(&key);
        }
        assert_eq!(pool.len_available(), 0);
        assert_eq!(pool.len_all(), 2);

        pool.reset();
        assert_eq!(pool.available(), pool.all().to_vec());

        pool.evict(&pool.all()[0].clone());
        assert_eq!(pool.len_all(), 2);
    }

    #[test]
    fn acquire_resets_exhausted_pool_before_drawing() {
        let pool = CredentialPool::with_random_source(keys(&["k1"]), First);
        let k1 = pool.all()[0].clone();
        pool.evict(&k1);
        assert_eq!(pool.len_available(), 0);

        match pool.acquire() {
            Acquired::Drawn {
                key,
                reset,
                remaining,
            } => {
                assert_eq!(key, k1);
                assert!(reset);
                assert_eq!(remaining, 1);
            }
            Acquired::Unconfigured => panic!("expected a key"),
        }
        assert_eq!(pool.available(), pool.all().to_vec());
    }

    #[test]
    fn acquire_without_reset() {
        let pool = CredentialPool::with_random_source(keys(&["k1", "k2"]), First);
        match pool.acquire() {
            Acquired::Drawn { reset, remaining, .. } => {
                assert!(!reset);
                assert_eq!(remaining, 2);
            }
            Acquired::Unconfigured => panic!("expected a key"),
        }
    }

    #[test]
    fn acquire_on_unconfigured_pool() {
        let pool = CredentialPool::new(Vec::new());
        assert!(pool.is_unconfigured());
        assert_eq!(pool.acquire(), Acquired::Unconfigured);

        pool.reset();
        assert_eq!(pool.len_available(), 0);
    }

    #[test]
    fn out_of_range_random_source_is_clamped() {
        struct TooBig;
        impl RandomSource for TooBig {
            fn index(&self, len: usize) -> usize {
                len + 10
            }
        }

        let pool = CredentialPool::with_random_source(keys(&["k1", "k2"]), TooBig);
        assert_eq!(pool.draw(), Some(pool.all()[1].clone()));
    }

    #[test]
    fn concurrent_evictions_keep_subset_invariant() {
        let pool = Arc::new(CredentialPool::new(keys(&["a", "b", "c", "d"])));
        let all: HashSet<ApiKey> = pool.all().iter().cloned().collect();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if let Acquired::Drawn { key, .. } = pool.acquire() {
                            pool.evict(&key);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }

        let available: HashSet<ApiKey> = pool.available().into_iter().collect();
        assert!(available.is_subset(&all));
        assert_eq!(pool.len_all(), 4);
    }
}
