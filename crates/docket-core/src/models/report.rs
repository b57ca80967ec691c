//! Rule results and validation reports.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::DocumentId;
use super::shipment::{ProductType, ShipmentId};

/// How serious a failed rule is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Presence,
    Uniqueness,
    CrossField,
    Tolerance,
    ProductSpecific,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleCategory::Presence => "presence",
            RuleCategory::Uniqueness => "uniqueness",
            RuleCategory::CrossField => "cross_field",
            RuleCategory::Tolerance => "tolerance",
            RuleCategory::ProductSpecific => "product_specific",
        };
        f.write_str(s)
    }
}

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub rule_name: String,
    pub category: RuleCategory,
    pub passed: bool,
    pub severity: Severity,
    pub message: String,
    /// Structured evidence (compared values, missing types, ...).
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_document_id: Option<DocumentId>,
}

impl RuleResult {
    /// Whether this result counts against the decision at `severity`.
    pub fn fails_at(&self, severity: Severity) -> bool {
        !self.passed && self.severity == severity
    }
}

/// Aggregate decision over all rule results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Hold,
    Reject,
}

impl Decision {
    /// REJECT on any failed ERROR, else HOLD on any failed WARNING, else
    /// APPROVE. Failed INFO results never change the decision.
    pub fn from_results(results: &[RuleResult]) -> Self {
        if results.iter().any(|r| r.fails_at(Severity::Error)) {
            Decision::Reject
        } else if results.iter().any(|r| r.fails_at(Severity::Warning)) {
            Decision::Hold
        } else {
            Decision::Approve
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approve => write!(f, "APPROVE"),
            Decision::Hold => write!(f, "HOLD"),
            Decision::Reject => write!(f, "REJECT"),
        }
    }
}

/// Result of one validation run over a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub shipment_id: ShipmentId,
    pub product_type: ProductType,
    pub timestamp: DateTime<Utc>,
    /// Ordered by ascending rule id.
    pub results: Vec<RuleResult>,
    pub decision: Decision,
}

impl ValidationReport {
    pub fn new(
        shipment_id: ShipmentId,
        product_type: ProductType,
        timestamp: DateTime<Utc>,
        results: Vec<RuleResult>,
    ) -> Self {
        let decision = Decision::from_results(&results);
        Self {
            shipment_id,
            product_type,
            timestamp,
            results,
            decision,
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &RuleResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Number of failed results at a severity.
    pub fn failure_count(&self, severity: Severity) -> usize {
        self.results.iter().filter(|r| r.fails_at(severity)).count()
    }

    pub fn result(&self, rule_id: &str) -> Option<&RuleResult> {
        self.results.iter().find(|r| r.rule_id == rule_id)
    }
}
