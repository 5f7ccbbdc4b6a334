//! Classifier verdicts for a single rule against a single document.
//!
//! The classifier returns loosely-shaped JSON. [`RuleCheckResult`] decodes it
//! defensively: a missing or mistyped field becomes `None` instead of an error,
//! and the original payload is kept for the audit trail.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    /// Parse `pass`/`fail`, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pass" => Some(Self::Pass),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// One rule's verdict for one document.
///
/// Serializes back to the original payload object, so a stored array of
/// results decodes to the same values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct RuleCheckResult {
    rule_name: Option<String>,
    status: Option<CheckStatus>,
    explanation: Option<String>,
    payload: Map<String, Value>,
}

impl RuleCheckResult {
    /// Build a well-formed result.
    pub fn new(status: CheckStatus, explanation: impl Into<String>) -> Self {
        let explanation = explanation.into();
        let mut payload = Map::new();
        payload.insert("status".into(), Value::String(status.as_str().into()));
        payload.insert("explanation".into(), Value::String(explanation.clone()));
        Self {
            rule_name: None,
            status: Some(status),
            explanation: Some(explanation),
            payload,
        }
    }

    /// Conservative verdict for a classifier answer that could not be read.
    pub fn unreadable(explanation: impl Into<String>) -> Self {
        Self::new(CheckStatus::Fail, explanation)
    }

    /// Decode an arbitrary JSON value. Non-object values decode to an empty result.
    pub fn from_value(value: Value) -> Self {
        let payload = match value {
            Value::Object(map) => map,
            other => {
                warn!(value = %other, "rule check result is not a JSON object");
                Map::new()
            }
        };

        let rule_name = payload
            .get("rule_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .and_then(CheckStatus::parse);
        let explanation = payload
            .get("explanation")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            rule_name,
            status,
            explanation,
            payload,
        }
    }

    /// Stamp the rule this verdict belongs to, overwriting any name the payload carried.
    pub fn with_rule_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.payload
            .insert("rule_name".into(), Value::String(name.clone()));
        self.rule_name = Some(name);
        self
    }

    pub fn rule_name(&self) -> Option<&str> {
        self.rule_name.as_deref()
    }

    pub fn status(&self) -> Option<CheckStatus> {
        self.status
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn is_failure(&self) -> bool {
        self.status == Some(CheckStatus::Fail)
    }

    /// The payload as received, plus any stamped rule name.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }
}

impl From<Value> for RuleCheckResult {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<RuleCheckResult> for Value {
    fn from(result: RuleCheckResult) -> Self {
        Value::Object(result.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_well_formed_payload() {
        let r = RuleCheckResult::from_value(json!({
            "rule_name": "NDA Check",
            "status": "fail",
            "explanation": "No NDA clause present."
        }));
        assert_eq!(r.rule_name(), Some("NDA Check"));
        assert_eq!(r.status(), Some(CheckStatus::Fail));
        assert_eq!(r.explanation(), Some("No NDA clause present."));
        assert!(r.is_failure());
    }

    #[test]
    fn missing_fields_decode_to_none() {
        let r = RuleCheckResult::from_value(json!({}));
        assert_eq!(r.rule_name(), None);
        assert_eq!(r.status(), None);
        assert_eq!(r.explanation(), None);
        assert!(!r.is_failure());
    }

    #[test]
    fn mistyped_fields_decode_to_none() {
        let r = RuleCheckResult::from_value(json!({
            "rule_name": 7,
            "status": true,
            "explanation": ["not", "a", "string"]
        }));
        assert_eq!(r.rule_name(), None);
        assert_eq!(r.status(), None);
        assert_eq!(r.explanation(), None);
        // Original payload is still kept for the audit trail.
        assert_eq!(r.payload().len(), 3);
    }

    #[test]
    fn unrecognised_status_is_not_a_failure() {
        let r = RuleCheckResult::from_value(json!({"status": "maybe"}));
        assert_eq!(r.status(), None);
        assert!(!r.is_failure());
    }

    #[test]
    fn status_is_case_insensitive() {
        let r = RuleCheckResult::from_value(json!({"status": " FAIL "}));
        assert!(r.is_failure());
    }

    #[test]
    fn non_object_decodes_to_empty() {
        let r = RuleCheckResult::from_value(json!("fail"));
        assert_eq!(r.status(), None);
        assert!(r.payload().is_empty());
    }

    #[test]
    fn with_rule_name_stamps_payload() {
        let r = RuleCheckResult::new(CheckStatus::Pass, "ok").with_rule_name("Confidentiality Check");
        assert_eq!(r.rule_name(), Some("Confidentiality Check"));
        assert_eq!(
            r.payload().get("rule_name"),
            Some(&json!("Confidentiality Check"))
        );
    }

    #[test]
    fn serializes_to_original_payload() {
        let raw = json!({"status": "fail", "explanation": "x", "confidence": 0.4});
        let r = RuleCheckResult::from_value(raw.clone());
        assert_eq!(serde_json::to_value(&r).unwrap(), raw);
        let back: RuleCheckResult = serde_json::from_value(raw).unwrap();
        assert_eq!(back, r);
    }
}
