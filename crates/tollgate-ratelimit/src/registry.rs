use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A bucket refused a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denied {
    /// Time until the bucket holds a token again
    pub wait: Duration,
}

struct Entry {
    limiter: Arc<DefaultDirectRateLimiter>,
    per_second: NonZeroU32,
    last_seen: Instant,
}

impl Entry {
    fn new(per_second: NonZeroU32, now: Instant) -> Self {
        // Burst capacity is twice the sustained rate
        let burst = NonZeroU32::new(per_second.get().saturating_mul(2)).unwrap_or(per_second);
        let quota = Quota::per_second(per_second).allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            per_second,
            last_seen: now,
        }
    }
}

/// Process-wide map from scope key to token bucket
///
/// The mutex guards only lookup-or-create and eviction. Draws happen on a
/// cloned `Arc` after the lock is released; each bucket synchronizes
/// internally. A draw racing with eviction lands on the evicted bucket and
/// the next request starts a fresh one.
pub struct LimiterRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    idle_timeout: Duration,
}

impl LimiterRegistry {
    /// Create an empty registry evicting entries idle longer than `idle_timeout`
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Draw one token from the bucket for `key`, creating it on first use
    pub fn check(&self, key: &str, per_second: NonZeroU32) -> Result<(), Denied> {
        let limiter = self.limiter_for(key, per_second);

        limiter.check().map_err(|not_until| Denied {
            wait: not_until.wait_time_from(DefaultClock::default().now()),
        })
    }

    fn limiter_for(&self, key: &str, per_second: NonZeroU32) -> Arc<DefaultDirectRateLimiter> {
        let now = Instant::now();
        let mut entries = self.lock();

        match entries.get_mut(key) {
            Some(entry) if entry.per_second == per_second => {
                entry.last_seen = now;
                Arc::clone(&entry.limiter)
            }
            // Unknown key, or the configured rate changed since the bucket was built
            _ => {
                let entry = Entry::new(per_second, now);
                let limiter = Arc::clone(&entry.limiter);
                entries.insert(key.to_owned(), entry);
                limiter
            }
        }
    }

    /// Remove every entry not touched within the idle timeout as of `now`
    ///
    /// Returns the number of evicted entries.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.idle_timeout);
        before - entries.len()
    }

    /// Number of live buckets
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no buckets are live
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether a bucket exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Run eviction every `interval` until `shutdown` fires or the registry is dropped
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(registry) = registry.upgrade() else {
                            break;
                        };
                        let evicted = registry.evict_idle(Instant::now());
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining = registry.len(), "evicted idle rate limiters");
                        }
                    }
                }
            }

            tracing::debug!("rate limiter sweeper stopped");
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
