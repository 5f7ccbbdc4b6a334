//! The classifier seam and the parsing of its free-form answers.
//!
//! Model output is untrusted text. Everything here degrades to a documented
//! default rather than failing: an unreadable verdict becomes a `fail`, an
//! unreadable rule list becomes a keyword scan, an empty list becomes
//! [`DEFAULT_RULES`].

use async_trait::async_trait;
use legaleagle_core::{ComplianceRule, RuleCheckResult};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Explanation used when the model's verdict is not a JSON object.
pub const PARSE_FAILURE_EXPLANATION: &str = "Unable to determine compliance due to parsing error";

/// Explanation used when the model returned no choices.
pub const NO_RESULT_EXPLANATION: &str = "No compliance check result received";

/// Topic words scanned for when the rule list is not valid JSON.
pub const TOPIC_RULES: [&str; 6] = [
    "Confidentiality",
    "Non-Disclosure",
    "Signature Requirement",
    "Liability",
    "Compliance",
    "Legal Review",
];

/// Returned when no rule could be determined at all.
pub const DEFAULT_RULES: [&str; 2] = ["General Compliance", "Document Review"];

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("classifier returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Judges document text against compliance rules.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Names of catalog rules that apply to `text`. Never empty.
    async fn applicable_rules(
        &self,
        text: &str,
        catalog: &[String],
    ) -> Result<Vec<String>, ClassifierError>;

    /// Verdict for one rule. The result always carries `rule.name`.
    async fn check_rule(
        &self,
        text: &str,
        rule: &ComplianceRule,
    ) -> Result<RuleCheckResult, ClassifierError>;
}

/// Turn the model's rule-list answer into names.
///
/// Accepts a JSON array of strings, or an object holding such an array under
/// any key. Anything else is scanned for [`TOPIC_RULES`]. An empty outcome
/// yields [`DEFAULT_RULES`].
pub fn parse_rule_list(content: Option<&str>) -> Vec<String> {
    let mut names = match content {
        Some(content) => match rule_list_from_json(content) {
            Some(names) => names,
            None => {
                warn!(content, "rule list is not a JSON string array, scanning for topics");
                extract_rules_from_text(content)
            }
        },
        None => Vec::new(),
    };

    names.retain(|n| !n.trim().is_empty());
    if names.is_empty() {
        debug!("no applicable rules determined, using defaults");
        return DEFAULT_RULES.iter().map(|s| s.to_string()).collect();
    }
    names
}

fn rule_list_from_json(content: &str) -> Option<Vec<String>> {
    let strings = |items: &[Value]| -> Vec<String> {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect()
    };

    match serde_json::from_str::<Value>(content).ok()? {
        Value::Array(items) => Some(strings(&items)),
        Value::Object(map) => map.values().find_map(|v| match v {
            Value::Array(items) if items.iter().any(Value::is_string) => Some(strings(items)),
            _ => None,
        }),
        _ => None,
    }
}

/// [`TOPIC_RULES`] entries mentioned anywhere in `content`, ignoring case.
pub fn extract_rules_from_text(content: &str) -> Vec<String> {
    let folded = content.to_lowercase();
    TOPIC_RULES
        .iter()
        .filter(|topic| folded.contains(&topic.to_lowercase()))
        .map(|topic| topic.to_string())
        .collect()
}

/// Turn the model's verdict into a result stamped with `rule_name`.
///
/// `None` means the model returned no choices.
pub fn parse_check_result(content: Option<&str>, rule_name: &str) -> RuleCheckResult {
    let result = match content {
        None => {
            warn!(rule = rule_name, "no compliance check result received");
            RuleCheckResult::unreadable(NO_RESULT_EXPLANATION)
        }
        Some(content) => match serde_json::from_str::<Value>(content) {
            Ok(value @ Value::Object(_)) => RuleCheckResult::from_value(value),
            Ok(_) | Err(_) => {
                warn!(rule = rule_name, content, "compliance verdict is not a JSON object");
                RuleCheckResult::unreadable(PARSE_FAILURE_EXPLANATION)
            }
        },
    };
    result.with_rule_name(rule_name)
}
