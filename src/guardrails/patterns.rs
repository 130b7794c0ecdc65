//! Declarative policy pattern table
//!
//! Detection is a data-driven, ordered list of (kind, severity, matcher)
//! rules rather than control flow, so policy changes stay inside this
//! table. Rules are compiled once at engine startup; a malformed pattern
//! is fatal there, never per-request.

use regex::Regex;

use crate::errors::{RagError, Result};
use crate::guardrails::types::{Severity, ViolationKind};

/// One compiled policy rule
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// Violation kind produced on match
    pub kind: ViolationKind,
    /// Severity of a match
    pub severity: Severity,
    /// Human-readable description used in violation messages
    pub description: &'static str,
    /// Compiled matcher
    pub regex: Regex,
    /// Whether matches are replaced by the redaction placeholder on the
    /// response path
    pub redact: bool,
}

/// Source tuple for the default rule table
struct RuleSpec {
    kind: ViolationKind,
    severity: Severity,
    description: &'static str,
    pattern: &'static str,
    redact: bool,
}

const RULE_TABLE: &[RuleSpec] = &[
    // Injection / system manipulation — blocking
    RuleSpec {
        kind: ViolationKind::PromptInjection,
        severity: Severity::Critical,
        description: "system manipulation attempt",
        pattern: r"(?i)\b(?:ignore\s+(?:all\s+|previous\s+|prior\s+)*instructions?|disregard\s+(?:previous|prior|above|all)|system\s+prompt|jailbreak|you\s+are\s+now\s+(?:in\s+)?developer\s+mode)\b",
        redact: false,
    },
    // Harassment / inappropriate language
    RuleSpec {
        kind: ViolationKind::InappropriateLanguage,
        severity: Severity::Medium,
        description: "inappropriate language",
        pattern: r"(?i)\b(?:idiot|moron|stupid|dumbass|loser|shut\s+up|screw\s+you)\b",
        redact: false,
    },
    // PII: national-ID-like identifier
    RuleSpec {
        kind: ViolationKind::Pii,
        severity: Severity::High,
        description: "national identification number",
        pattern: r"\b\d{3}-\d{2}-\d{4}\b",
        redact: true,
    },
    // PII: payment card number
    RuleSpec {
        kind: ViolationKind::Pii,
        severity: Severity::High,
        description: "payment card number",
        pattern: r"\b(?:\d{4}[ -]?){3}\d{3,4}\b",
        redact: true,
    },
    // PII: phone number
    RuleSpec {
        kind: ViolationKind::Pii,
        severity: Severity::High,
        description: "phone number",
        pattern: r"\b(?:\+?\d{1,3}[-. ])?\(?\d{3}\)?[-. ]\d{3}[-. ]\d{4}\b",
        redact: true,
    },
    // PII: email address
    RuleSpec {
        kind: ViolationKind::Pii,
        severity: Severity::Medium,
        description: "email address",
        pattern: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        redact: true,
    },
    // PII: street address
    RuleSpec {
        kind: ViolationKind::Pii,
        severity: Severity::High,
        description: "street address",
        pattern: r"(?i)\b\d{1,5}\s+[A-Za-z][A-Za-z ]*\s+(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|court|ct)\b\.?",
        redact: true,
    },
    // Confidential-topic markers
    RuleSpec {
        kind: ViolationKind::ConfidentialTopic,
        severity: Severity::Medium,
        description: "internal-only material",
        pattern: r"(?i)\b(?:internal\s+(?:use\s+)?only|classified|trade\s+secret)\b",
        redact: false,
    },
    RuleSpec {
        kind: ViolationKind::ConfidentialTopic,
        severity: Severity::Low,
        description: "confidential-topic mention",
        pattern: r"(?i)\b(?:confidential|proprietary|under\s+nda)\b",
        redact: false,
    },
];

/// Compile the default rule table, in scan order.
pub fn default_rules() -> Result<Vec<PatternRule>> {
    RULE_TABLE
        .iter()
        .map(|spec| {
            let regex = Regex::new(spec.pattern).map_err(|e| {
                RagError::InvalidConfiguration(format!(
                    "bad pattern for {}: {}",
                    spec.kind.as_str(),
                    e
                ))
            })?;
            Ok(PatternRule {
                kind: spec.kind,
                severity: spec.severity,
                description: spec.description,
                regex,
                redact: spec.redact,
            })
        })
        .collect()
}
