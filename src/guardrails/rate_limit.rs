//! Per-identity sliding-window rate limiting
//!
//! Each identity owns an ordered window of request timestamps; entries
//! older than the window are dropped lazily on each check. Identities are
//! sharded across several locks so one hot identity cannot serialize the
//! whole engine.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

const SHARD_COUNT: usize = 16;

/// Rate limit configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per identity within the window
    pub max_requests: usize,
    /// Window length in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_secs: 60,
        }
    }
}

/// Sharded sliding-window limiter
pub struct SlidingWindowLimiter {
    shards: Vec<Mutex<HashMap<String, VecDeque<Instant>>>>,
    config: RateLimitConfig,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
            config,
        }
    }

    fn shard_for(&self, identity: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        (hasher.finish() as usize) % SHARD_COUNT
    }

    /// Instant past which window entries are stale. `None` means the
    /// window reaches back before the clock's epoch, so nothing is stale.
    fn cutoff(&self) -> Option<Instant> {
        Instant::now().checked_sub(Duration::from_secs(self.config.window_secs))
    }

    /// Check and record one request. Returns `true` when the request is
    /// within budget; only allowed requests consume it.
    pub async fn check(&self, identity: &str) -> bool {
        let cutoff = self.cutoff();
        let mut shard = self.shards[self.shard_for(identity)].lock().await;
        let window = shard.entry(identity.to_string()).or_default();

        if let Some(cutoff) = cutoff {
            while window.front().map_or(false, |t| *t < cutoff) {
                window.pop_front();
            }
        }

        if window.len() >= self.config.max_requests {
            return false;
        }

        window.push_back(Instant::now());
        true
    }

    /// Current in-window request count for an identity
    pub async fn count(&self, identity: &str) -> usize {
        let cutoff = self.cutoff();
        let shard = self.shards[self.shard_for(identity)].lock().await;
        shard
            .get(identity)
            .map(|w| {
                w.iter()
                    .filter(|t| cutoff.map_or(true, |c| **t >= c))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
