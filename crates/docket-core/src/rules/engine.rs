//! Rule evaluation and report aggregation.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::models::report::{RuleResult, Severity, ValidationReport};

use super::{Rule, RuleRegistry, ValidationContext};

/// Evaluates the applicable rules of a registry.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    registry: Arc<RuleRegistry>,
}

impl RuleEngine {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Evaluate every applicable rule, stamping the report with the current time.
    pub fn evaluate(&self, ctx: &ValidationContext) -> ValidationReport {
        self.evaluate_at(ctx, Utc::now())
    }

    /// Evaluate with a fixed report timestamp.
    pub fn evaluate_at(&self, ctx: &ValidationContext, timestamp: DateTime<Utc>) -> ValidationReport {
        let product_type = ctx.product_type();
        let rules = self.registry.rules_for(product_type);

        let results: Vec<RuleResult> = rules.iter().map(|rule| run_rule(rule.as_ref(), ctx)).collect();

        let report = ValidationReport::new(
            ctx.shipment.id.clone(),
            product_type,
            timestamp,
            results,
        );

        info!(
            "Validated shipment {} ({}): {} rules, decision {}",
            report.shipment_id,
            product_type,
            report.results.len(),
            report.decision
        );
        report
    }
}

/// Run one rule, turning faults and panics into a failed INFO result.
fn run_rule(rule: &dyn Rule, ctx: &ValidationContext) -> RuleResult {
    let outcome = catch_unwind(AssertUnwindSafe(|| rule.evaluate(ctx)));

    let fault = match outcome {
        Ok(Ok(outcome)) => {
            debug!(
                "Rule {} {}: {}",
                rule.id(),
                if outcome.passed { "passed" } else { "failed" },
                outcome.message
            );
            return RuleResult {
                rule_id: rule.id().to_string(),
                rule_name: rule.name().to_string(),
                category: rule.category(),
                passed: outcome.passed,
                severity: rule.severity(),
                message: outcome.message,
                details: outcome.details,
                subject_document_id: outcome.subject_document_id,
            };
        }
        Ok(Err(fault)) => fault.to_string(),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            format!("rule panicked: {}", reason)
        }
    };

    warn!("Rule {} could not be evaluated: {}", rule.id(), fault);

    let mut details = Map::new();
    details.insert("fault".to_string(), Value::String(fault.clone()));
    RuleResult {
        rule_id: rule.id().to_string(),
        rule_name: rule.name().to_string(),
        category: rule.category(),
        passed: false,
        severity: Severity::Info,
        message: format!("Rule evaluation failed: {}", fault),
        details,
        subject_document_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleFault;
    use crate::models::report::{Decision, RuleCategory};
    use crate::models::shipment::{ProductType, Shipment};
    use crate::rules::RuleOutcome;
    use pretty_assertions::assert_eq;

    struct Fixed {
        id: &'static str,
        severity: Severity,
        passed: bool,
    }

    impl Rule for Fixed {
        fn id(&self) -> &str {
            self.id
        }
        fn name(&self) -> &str {
            "fixed"
        }
        fn category(&self) -> RuleCategory {
            RuleCategory::CrossField
        }
        fn severity(&self) -> Severity {
            self.severity
        }
        fn evaluate(&self, _ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
            if self.passed {
                Ok(RuleOutcome::pass("ok"))
            } else {
                Ok(RuleOutcome::fail("bad"))
            }
        }
    }

    struct Faulty;

    impl Rule for Faulty {
        fn id(&self) -> &str {
            "F-1"
        }
        fn name(&self) -> &str {
            "faulty"
        }
        fn category(&self) -> RuleCategory {
            RuleCategory::Tolerance
        }
        fn severity(&self) -> Severity {
            Severity::Error
        }
        fn evaluate(&self, _ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
            Err(RuleFault::Uninterpretable {
                field: "gross_weight".to_string(),
                reason: "not a number".to_string(),
            })
        }
    }

    struct Panicking;

    impl Rule for Panicking {
        fn id(&self) -> &str {
            "P-1"
        }
        fn name(&self) -> &str {
            "panicking"
        }
        fn category(&self) -> RuleCategory {
            RuleCategory::Tolerance
        }
        fn severity(&self) -> Severity {
            Severity::Error
        }
        fn evaluate(&self, _ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
            panic!("index out of range")
        }
    }

    fn context() -> ValidationContext {
        ValidationContext::new(Shipment::new("S-1", ProductType::General), Vec::new())
    }

    fn engine(rules: Vec<Arc<dyn Rule>>) -> RuleEngine {
        let mut registry = RuleRegistry::new();
        for rule in rules {
            registry.register_arc(rule).unwrap();
        }
        RuleEngine::new(Arc::new(registry))
    }

    #[test]
    fn test_decision_follows_failed_severities() {
        let warn_fail: Arc<dyn Rule> = Arc::new(Fixed { id: "W-1", severity: Severity::Warning, passed: false });
        let err_pass: Arc<dyn Rule> = Arc::new(Fixed { id: "E-1", severity: Severity::Error, passed: true });
        let report = engine(vec![warn_fail.clone(), err_pass]).evaluate(&context());
        assert_eq!(report.decision, Decision::Hold);

        let err_fail: Arc<dyn Rule> = Arc::new(Fixed { id: "E-2", severity: Severity::Error, passed: false });
        let report = engine(vec![warn_fail, err_fail]).evaluate(&context());
        assert_eq!(report.decision, Decision::Reject);

        let info_fail: Arc<dyn Rule> = Arc::new(Fixed { id: "I-1", severity: Severity::Info, passed: false });
        let report = engine(vec![info_fail]).evaluate(&context());
        assert_eq!(report.decision, Decision::Approve);
    }

    #[test]
    fn test_fault_becomes_info_result() {
        let ok: Arc<dyn Rule> = Arc::new(Fixed { id: "Z-9", severity: Severity::Warning, passed: true });
        let report = engine(vec![Arc::new(Faulty) as Arc<dyn Rule>, ok]).evaluate(&context());

        let faulty = report.result("F-1").unwrap();
        assert!(!faulty.passed);
        assert_eq!(faulty.severity, Severity::Info);
        assert!(faulty.message.contains("gross_weight"));
        assert!(report.result("Z-9").unwrap().passed);
        assert_eq!(report.decision, Decision::Approve);
    }

    #[test]
    fn test_panic_becomes_info_result() {
        let ok: Arc<dyn Rule> = Arc::new(Fixed { id: "A-1", severity: Severity::Error, passed: true });
        let report = engine(vec![ok, Arc::new(Panicking) as Arc<dyn Rule>]).evaluate(&context());

        let panicked = report.result("P-1").unwrap();
        assert!(!panicked.passed);
        assert_eq!(panicked.severity, Severity::Info);
        assert!(panicked.message.contains("index out of range"));
        assert_eq!(report.results.len(), 2);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let rules: Vec<Arc<dyn Rule>> = vec![
            Arc::new(Fixed { id: "C-3", severity: Severity::Warning, passed: false }),
            Arc::new(Fixed { id: "A-1", severity: Severity::Error, passed: true }),
            Arc::new(Fixed { id: "B-2", severity: Severity::Info, passed: true }),
        ];
        let engine = engine(rules);
        let ts = Utc::now();
        let first = engine.evaluate_at(&context(), ts);
        let second = engine.evaluate_at(&context(), ts);
        assert_eq!(first, second);
        let ids: Vec<&str> = first.results.iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["A-1", "B-2", "C-3"]);
    }
}
