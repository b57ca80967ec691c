//! Catalog of registered rules.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{DocketError, Result};
use crate::models::config::ValidationConfig;
use crate::models::shipment::ProductType;

use super::catalog;
use super::Rule;

/// Immutable-after-construction set of rules keyed by id.
#[derive(Default, Clone)]
pub struct RuleRegistry {
    rules: BTreeMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the standard catalog.
    pub fn standard(config: &ValidationConfig) -> Result<Self> {
        Self::with_rules(catalog::standard_rules(config))
    }

    /// Registry holding `rules`; fails on the first repeated id.
    pub fn with_rules(rules: impl IntoIterator<Item = Arc<dyn Rule>>) -> Result<Self> {
        let mut registry = Self::new();
        for rule in rules {
            registry.register_arc(rule)?;
        }
        Ok(registry)
    }

    /// Add a rule; ids must be unique.
    pub fn register(&mut self, rule: impl Rule + 'static) -> Result<()> {
        self.register_arc(Arc::new(rule))
    }

    pub fn register_arc(&mut self, rule: Arc<dyn Rule>) -> Result<()> {
        let id = rule.id().to_string();
        if self.rules.contains_key(&id) {
            return Err(DocketError::DuplicateRule(id));
        }
        self.rules.insert(id, rule);
        Ok(())
    }

    /// Rules applicable to a product type, in ascending id order.
    pub fn rules_for(&self, product_type: ProductType) -> Vec<Arc<dyn Rule>> {
        self.rules
            .values()
            .filter(|r| r.applies_to(product_type))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.get(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleFault;
    use crate::models::report::{RuleCategory, Severity};
    use crate::rules::{RuleOutcome, ValidationContext};
    use pretty_assertions::assert_eq;

    struct Named(&'static str);

    impl Rule for Named {
        fn id(&self) -> &str {
            self.0
        }
        fn name(&self) -> &str {
            "named"
        }
        fn category(&self) -> RuleCategory {
            RuleCategory::Presence
        }
        fn severity(&self) -> Severity {
            Severity::Info
        }
        fn evaluate(&self, _ctx: &ValidationContext) -> std::result::Result<RuleOutcome, RuleFault> {
            Ok(RuleOutcome::pass("ok"))
        }
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut registry = RuleRegistry::new();
        registry.register(Named("X-1")).unwrap();
        let err = registry.register(Named("X-1")).unwrap_err();
        assert!(matches!(err, DocketError::DuplicateRule(id) if id == "X-1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rules_are_ordered_by_id() {
        let mut registry = RuleRegistry::new();
        registry.register(Named("B-2")).unwrap();
        registry.register(Named("A-1")).unwrap();
        let ids: Vec<String> = registry
            .rules_for(ProductType::General)
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["A-1", "B-2"]);
    }

    #[test]
    fn test_standard_catalog_applicability() {
        let registry = RuleRegistry::standard(&ValidationConfig::default()).unwrap();
        assert_eq!(registry.len(), 12);

        let general: Vec<String> = registry
            .rules_for(ProductType::General)
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert!(!general.iter().any(|id| id.starts_with("PROD-")));

        let plants = registry.rules_for(ProductType::Plants);
        assert!(plants.iter().any(|r| r.id() == "PROD-003"));
        assert!(!plants.iter().any(|r| r.id() == "PROD-001"));

        assert_eq!(registry.rules_for(ProductType::Meat).len(), 12);
    }

    #[test]
    fn test_with_rules_rejects_repeated_id() {
        let rules: Vec<Arc<dyn Rule>> = vec![Arc::new(Named("A-1")), Arc::new(Named("A-1"))];
        assert!(matches!(
            RuleRegistry::with_rules(rules),
            Err(DocketError::DuplicateRule(id)) if id == "A-1"
        ));

        let catalog = catalog::standard_rules(&ValidationConfig::default());
        let count = catalog.len();
        assert_eq!(RuleRegistry::with_rules(catalog).unwrap().len(), count);
    }
}
