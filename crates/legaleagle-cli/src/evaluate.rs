//! Evaluation pipeline: classify a stored document, score it, record the
//! results, and open action items for failures.

use legaleagle_ai::{Classifier, ClassifierError};
use legaleagle_core::{
    ActionItemGenerator, GenerationReport, RemediationError, RiskScorer, RuleCheckResult,
    RuleNameExtractor,
};
use legaleagle_store::{DuckStore, StoreError};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error("document not found: {0}")]
    DocumentNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Remediation(#[from] RemediationError),
}

impl EvaluateError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::DocumentNotFound(_) => true,
            Self::Store(e) => e.is_not_found(),
            Self::Remediation(e) => e.is_not_found(),
            Self::Classifier(_) => false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationReport {
    pub document_id: String,
    /// Names of the catalog rules that were checked.
    pub rules_checked: Vec<String>,
    pub results: Vec<RuleCheckResult>,
    pub risk_score: f64,
    pub action_items: GenerationReport,
}

pub struct Evaluator<'a, C: ?Sized> {
    store: &'a DuckStore,
    classifier: &'a C,
    extractor: &'a RuleNameExtractor,
    scorer: &'a RiskScorer,
}

impl<'a, C: Classifier + ?Sized> Evaluator<'a, C> {
    pub fn new(
        store: &'a DuckStore,
        classifier: &'a C,
        extractor: &'a RuleNameExtractor,
        scorer: &'a RiskScorer,
    ) -> Self {
        Self {
            store,
            classifier,
            extractor,
            scorer,
        }
    }

    pub async fn evaluate(&self, document_id: &str) -> Result<EvaluationReport, EvaluateError> {
        let doc = self
            .store
            .document(document_id)?
            .ok_or_else(|| EvaluateError::DocumentNotFound(document_id.to_string()))?;

        let catalog = self.store.all_rules()?;
        let catalog_names: Vec<String> = catalog.iter().map(|r| r.name.clone()).collect();

        let applicable = self
            .classifier
            .applicable_rules(&doc.text, &catalog_names)
            .await?;
        let mut rules = self.store.rules_by_names(&applicable)?;
        if rules.is_empty() {
            warn!(
                document_id,
                suggested = ?applicable,
                "no suggested rule is in the catalog, checking all rules"
            );
            rules = catalog;
        }

        let mut results = Vec::with_capacity(rules.len());
        for rule in &rules {
            let result = match self.classifier.check_rule(&doc.text, rule).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(document_id, rule = %rule.name, error = %e, "rule check failed");
                    RuleCheckResult::unreadable(e.to_string()).with_rule_name(&rule.name)
                }
            };
            results.push(result);
        }

        let risk_score = self.scorer.score(&results, &rules);
        let parsed = Value::Array(results.iter().cloned().map(Value::from).collect());
        self.store.record_evaluation(document_id, &parsed, risk_score)?;

        let action_items =
            ActionItemGenerator::new(self.store, self.extractor).generate(document_id, &results)?;

        info!(
            document_id,
            rules = rules.len(),
            risk_score,
            created = action_items.created.len(),
            skipped = action_items.skipped.len(),
            "document evaluated"
        );

        Ok(EvaluationReport {
            document_id: document_id.to_string(),
            rules_checked: rules.into_iter().map(|r| r.name).collect(),
            results,
            risk_score,
            action_items,
        })
    }
}
