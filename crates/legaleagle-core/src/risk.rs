//! Severity-weighted risk scoring for a document's rule-check results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::check::RuleCheckResult;
use crate::model::{ComplianceRule, Severity};

/// Score contribution of one failed rule, by severity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
    /// Used for any severity outside high/medium/low.
    pub unknown: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            high: 3.0,
            medium: 2.0,
            low: 1.0,
            unknown: 1.0,
        }
    }
}

impl SeverityWeights {
    /// Weight for a severity. Negative configured weights count as zero.
    pub fn weight(&self, severity: &Severity) -> f64 {
        let w = match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Other(s) => {
                warn!(severity = %s, "unknown severity level, using fallback weight");
                self.unknown
            }
        };
        w.max(0.0)
    }
}

/// Sums severity weights over failed results.
///
/// Each failure is matched to a rule by its `rule_name`. With positional
/// fallback enabled, a failure that carries no name is matched to the rule at
/// the same index in `rules`; this only makes sense when the caller built both
/// slices in the same order.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: SeverityWeights,
    positional_fallback: bool,
}

impl RiskScorer {
    pub fn new(weights: SeverityWeights) -> Self {
        Self {
            weights,
            positional_fallback: false,
        }
    }

    pub fn with_positional_fallback(mut self, enabled: bool) -> Self {
        self.positional_fallback = enabled;
        self
    }

    pub fn weights(&self) -> &SeverityWeights {
        &self.weights
    }

    /// Cumulative, unnormalised score. Pass results and results without a
    /// readable status never contribute.
    pub fn score(&self, results: &[RuleCheckResult], rules: &[ComplianceRule]) -> f64 {
        let by_name: HashMap<&str, &ComplianceRule> =
            rules.iter().map(|r| (r.name.as_str(), r)).collect();

        let mut score = 0.0;
        for (i, result) in results.iter().enumerate() {
            if result.status().is_none() {
                warn!(index = i, "rule check result has no readable status, skipping");
                continue;
            }
            if !result.is_failure() {
                continue;
            }

            let rule = match result.rule_name() {
                Some(name) => by_name.get(name).copied(),
                None if self.positional_fallback => rules.get(i),
                None => {
                    warn!(index = i, "failed result has no rule_name, skipping");
                    continue;
                }
            };

            match rule {
                Some(rule) => {
                    let weight = self.weights.weight(&rule.severity);
                    score += weight;
                    debug!(rule = %rule.name, severity = %rule.severity, weight, score, "failed rule weighted");
                }
                None => {
                    warn!(index = i, rule = ?result.rule_name(), "failed rule not in rule set");
                }
            }
        }

        debug!(score, results = results.len(), "risk score calculated");
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckStatus;
    use chrono::Utc;
    use serde_json::json;

    fn rule(name: &str, severity: &str) -> ComplianceRule {
        ComplianceRule {
            id: format!("id-{name}"),
            name: name.to_string(),
            pattern: String::new(),
            severity: Severity::parse(severity),
            created_at: Utc::now(),
        }
    }

    fn fail(name: &str) -> RuleCheckResult {
        RuleCheckResult::new(CheckStatus::Fail, "missing").with_rule_name(name)
    }

    fn pass(name: &str) -> RuleCheckResult {
        RuleCheckResult::new(CheckStatus::Pass, "present").with_rule_name(name)
    }

    #[test]
    fn single_high_failure_scores_three() {
        let rules = vec![rule("NDA Check", "high")];
        let results = vec![fail("NDA Check")];
        assert_eq!(RiskScorer::default().score(&results, &rules), 3.0);
    }

    #[test]
    fn weights_by_severity() {
        let rules = vec![
            rule("A", "high"),
            rule("B", "medium"),
            rule("C", "low"),
            rule("D", "critical"),
        ];
        let results = vec![fail("A"), fail("B"), fail("C"), fail("D")];
        assert_eq!(RiskScorer::default().score(&results, &rules), 7.0);
    }

    #[test]
    fn pass_results_never_change_score() {
        let rules = vec![rule("A", "high"), rule("B", "medium")];
        let scorer = RiskScorer::default();
        let base = vec![fail("A")];
        let mut with_pass = base.clone();
        with_pass.push(pass("B"));
        assert_eq!(scorer.score(&base, &rules), scorer.score(&with_pass, &rules));
    }

    #[test]
    fn adding_high_failure_adds_exactly_three() {
        let rules = vec![rule("A", "medium"), rule("B", "high")];
        let scorer = RiskScorer::default();
        let before = vec![fail("A")];
        let mut after = before.clone();
        after.push(fail("B"));
        assert_eq!(
            scorer.score(&after, &rules) - scorer.score(&before, &rules),
            3.0
        );
    }

    #[test]
    fn missing_status_is_skipped() {
        let rules = vec![rule("A", "high")];
        let results = vec![RuleCheckResult::from_value(json!({"rule_name": "A"}))];
        assert_eq!(RiskScorer::default().score(&results, &rules), 0.0);
    }

    #[test]
    fn unknown_rule_name_adds_nothing() {
        let rules = vec![rule("A", "high")];
        let results = vec![fail("Nonexistent Rule")];
        assert_eq!(RiskScorer::default().score(&results, &rules), 0.0);
    }

    #[test]
    fn nameless_failure_skipped_by_default() {
        let rules = vec![rule("A", "high")];
        let results = vec![RuleCheckResult::new(CheckStatus::Fail, "missing")];
        assert_eq!(RiskScorer::default().score(&results, &rules), 0.0);
    }

    #[test]
    fn positional_fallback_matches_by_index() {
        let rules = vec![rule("A", "low"), rule("B", "high")];
        let results = vec![
            pass("A"),
            RuleCheckResult::new(CheckStatus::Fail, "missing"),
            RuleCheckResult::new(CheckStatus::Fail, "out of range"),
        ];
        let scorer = RiskScorer::default().with_positional_fallback(true);
        // Index 1 → rule B (high); index 2 has no counterpart.
        assert_eq!(scorer.score(&results, &rules), 3.0);
    }

    #[test]
    fn custom_weights_and_negative_clamp() {
        let weights = SeverityWeights {
            high: 10.0,
            medium: -5.0,
            low: 1.0,
            unknown: 0.5,
        };
        let rules = vec![rule("A", "high"), rule("B", "medium"), rule("C", "urgent")];
        let results = vec![fail("A"), fail("B"), fail("C")];
        assert_eq!(RiskScorer::new(weights).score(&results, &rules), 10.5);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(RiskScorer::default().score(&[], &[]), 0.0);
    }
}
