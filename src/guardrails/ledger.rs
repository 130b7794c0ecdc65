//! Violation ledger: the auditable record of policy breaches
//!
//! Append-only in-memory ledger, sharded by identity hash. Entries expire
//! past a per-severity retention window and are purged lazily whenever a
//! shard is touched; `flush` drains everything for teardown/persistence.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::guardrails::types::{Severity, Violation};

const SHARD_COUNT: usize = 16;

/// Retention windows by data class
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Retention for Low/Medium violations, in seconds
    pub low_secs: u64,
    /// Retention for High/Critical violations, in seconds
    pub high_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            low_secs: 24 * 3600,
            high_secs: 30 * 24 * 3600,
        }
    }
}

impl RetentionConfig {
    fn for_severity(&self, severity: Severity) -> Duration {
        let secs = match severity {
            Severity::Low | Severity::Medium => self.low_secs,
            Severity::High | Severity::Critical => self.high_secs,
        };
        Duration::seconds(secs as i64)
    }
}

/// Aggregate view over a time window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationSummary {
    /// Total violations in the window
    pub total: usize,
    /// Counts by violation kind
    pub by_kind: HashMap<String, usize>,
    /// Counts by severity
    pub by_severity: HashMap<String, usize>,
    /// Number of distinct acting identities
    pub distinct_identities: usize,
}

/// Sharded in-memory violation ledger
pub struct ViolationLedger {
    shards: Vec<Mutex<Vec<Violation>>>,
    retention: RetentionConfig,
}

impl ViolationLedger {
    pub fn new(retention: RetentionConfig) -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(Vec::new())).collect(),
            retention,
        }
    }

    fn shard_for(&self, identity: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        (hasher.finish() as usize) % SHARD_COUNT
    }

    fn is_live(&self, violation: &Violation) -> bool {
        let age = Utc::now() - violation.timestamp;
        age <= self.retention.for_severity(violation.severity)
    }

    /// Append one violation; atomic per record.
    pub async fn record(&self, violation: Violation) {
        let mut shard = self.shards[self.shard_for(&violation.identity)].lock().await;
        shard.retain(|v| self.is_live(v));
        shard.push(violation);
    }

    /// Append a batch of violations for one identity.
    pub async fn record_all(&self, violations: &[Violation]) {
        for violation in violations {
            self.record(violation.clone()).await;
        }
    }

    /// Aggregate counts over the trailing `window`.
    pub async fn summary(&self, window: Duration) -> ViolationSummary {
        let since = Utc::now() - window;
        let mut summary = ViolationSummary::default();
        let mut identities = HashSet::new();

        for shard in &self.shards {
            let entries = shard.lock().await;
            for violation in entries.iter().filter(|v| v.timestamp >= since && self.is_live(v)) {
                summary.total += 1;
                *summary
                    .by_kind
                    .entry(violation.kind.as_str().to_string())
                    .or_insert(0) += 1;
                *summary
                    .by_severity
                    .entry(violation.severity.as_str().to_string())
                    .or_insert(0) += 1;
                identities.insert(violation.identity.clone());
            }
        }

        summary.distinct_identities = identities.len();
        summary
    }

    /// All live violations for one identity, oldest first.
    pub async fn for_identity(&self, identity: &str) -> Vec<Violation> {
        let shard = self.shards[self.shard_for(identity)].lock().await;
        shard
            .iter()
            .filter(|v| v.identity == identity && self.is_live(v))
            .cloned()
            .collect()
    }

    /// Drain the entire ledger, returning everything still live.
    pub async fn flush(&self) -> Vec<Violation> {
        let mut drained = Vec::new();
        for shard in &self.shards {
            let mut entries = shard.lock().await;
            drained.extend(entries.drain(..).filter(|v| self.is_live(v)));
        }
        drained
    }
}
