pub mod check;
pub mod config;
pub mod extract;
pub mod model;
pub mod remediation;
pub mod risk;

pub use check::{CheckStatus, RuleCheckResult};
pub use config::PipelineConfig;
pub use extract::{ExtractorConfig, KeywordRule, RuleNameExtractor, UNKNOWN_RULE};
pub use model::{
    ActionItem, ActionStatus, AuditStatus, ComplianceRule, Document, DocumentRuleResult, NewRule,
    Severity,
};
pub use remediation::{
    ActionItemGenerator, ActionItemLifecycle, Completion, ComplianceStore, GenerationReport,
    PendingWithTitles, RemediationError, SkipReason, SkippedFailure, TitledActionItem,
};
pub use risk::{RiskScorer, SeverityWeights};
