use serde::{Deserialize, Serialize};

use crate::extract::{ExtractorConfig, RuleNameExtractor};
use crate::risk::{RiskScorer, SeverityWeights};

/// Tunables for the evaluation pipeline. Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    pub weights: SeverityWeights,
    /// Match nameless failures to rules by position when scoring.
    pub positional_fallback: bool,
}

impl PipelineConfig {
    pub fn extractor(&self) -> RuleNameExtractor {
        RuleNameExtractor::new(&self.extractor)
    }

    pub fn risk_scorer(&self) -> RiskScorer {
        RiskScorer::new(self.weights).with_positional_fallback(self.positional_fallback)
    }
}
