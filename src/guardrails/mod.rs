//! Guardrails: content-safety, privacy, and rate-limit enforcement
//!
//! Validates incoming queries and outgoing responses against a
//! declarative policy table, enforces per-identity rate limits, and keeps
//! an auditable violation ledger.
//!
//! Components:
//! - Types: Violation, ViolationKind, Severity
//! - Patterns: ordered, data-driven policy rule table
//! - Rate limit: sharded per-identity sliding windows
//! - Ledger: TTL-expiring violation log with windowed summaries
//! - Engine: the validation state machine tying it together

pub mod engine;
pub mod ledger;
pub mod patterns;
pub mod rate_limit;
pub mod types;

pub use engine::{
    GuardrailState, GuardrailsConfig, GuardrailsEngine, QueryVerdict, SanitizedResponse,
};
pub use ledger::{RetentionConfig, ViolationLedger, ViolationSummary};
pub use patterns::PatternRule;
pub use rate_limit::{RateLimitConfig, SlidingWindowLimiter};
pub use types::{Severity, Violation, ViolationKind};
