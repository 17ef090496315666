//! Per-client token buckets protecting the login endpoint.
//!
//! Every bucket holds at most `rate` tokens and refills at `rate` tokens per
//! second, so a steady client is never denied and a burst beyond `rate`
//! within one second is. Keys are the 64-bit client identifiers produced by
//! [`crate::request::client_key`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::warn;

/// Upper bound on tracked keys. Entries idle past the grace period are swept
/// when the map would grow beyond it; correctness does not depend on this.
const MAX_KEYS: usize = 100_000;
const IDLE_GRACE_SECS: f64 = 300.0;

struct Bucket {
    tokens: f64,
    last_update: Instant,
}

pub struct RateLimiter {
    /// Tokens per second; also the bucket capacity.
    rate: f64,
    buckets: Mutex<HashMap<u64, Bucket>>,
}

impl RateLimiter {
    pub fn new(auths_per_second: u32) -> Self {
        Self {
            rate: f64::from(auths_per_second),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Refills the bucket for `key` and takes one token from it. Returns
    /// false when the bucket is empty, i.e. the request must be denied.
    pub fn try_consume(&self, key: u64) -> bool {
        self.try_consume_at(key, Instant::now())
    }

    fn try_consume_at(&self, key: u64, now: Instant) -> bool {
        let mut buckets = self.lock();

        if !buckets.contains_key(&key) && buckets.len() >= MAX_KEYS {
            Self::sweep(&mut buckets, now);
            if buckets.len() >= MAX_KEYS {
                warn!("rate limiter tracking {} keys, none idle", buckets.len());
            }
        }

        let bucket = buckets.entry(key).or_insert(Bucket {
            tokens: self.rate,
            last_update: now,
        });

        let elapsed = now.duration_since(bucket.last_update).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.rate);
        bucket.last_update = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn sweep(buckets: &mut HashMap<u64, Bucket>, now: Instant) {
        buckets
            .retain(|_, b| now.duration_since(b.last_update).as_secs_f64() < IDLE_GRACE_SECS);
    }

    // A poisoned lock still holds a usable map; keep serving.
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
