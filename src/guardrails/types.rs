//! Core data types for the guardrails layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered severity levels for policy violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Enumerated violation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Per-identity request budget exhausted
    RateLimitExceeded,
    /// Injection / system-manipulation attempt
    PromptInjection,
    /// Harassment or inappropriate language
    InappropriateLanguage,
    /// Personally identifiable information
    Pii,
    /// Confidential-topic marker
    ConfidentialTopic,
    /// Guardrails-internal scanning fault
    EngineDegraded,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::RateLimitExceeded => "rate_limit_exceeded",
            ViolationKind::PromptInjection => "prompt_injection",
            ViolationKind::InappropriateLanguage => "inappropriate_language",
            ViolationKind::Pii => "pii",
            ViolationKind::ConfidentialTopic => "confidential_topic",
            ViolationKind::EngineDegraded => "engine_degraded",
        }
    }
}

/// Record of a detected policy breach; immutable after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Unique violation identifier
    pub id: Uuid,
    /// Acting identity (user or session key)
    pub identity: String,
    /// Violation kind
    pub kind: ViolationKind,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message (never contains raw sensitive text)
    pub message: String,
    /// Offending text excerpt, masked when the match itself is sensitive
    pub excerpt: String,
    /// Detection timestamp
    pub timestamp: DateTime<Utc>,
}

impl Violation {
    pub fn new(
        identity: impl Into<String>,
        kind: ViolationKind,
        severity: Severity,
        message: impl Into<String>,
        excerpt: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity: identity.into(),
            kind,
            severity,
            message: message.into(),
            excerpt: excerpt.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Mask a sensitive excerpt, keeping only the first and last 2 characters.
pub fn mask_excerpt(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let first: String = chars[..2].iter().collect();
    let last: String = chars[chars.len() - 2..].iter().collect();
    format!("{}{}{}", first, "*".repeat(chars.len() - 4), last)
}
