//! Persistent compliance records: rules, documents, action items, and audit records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a compliance rule.
///
/// The three known levels drive priority and risk weighting. Any other string
/// an administrator stored is kept verbatim in [`Severity::Other`] so it still
/// round-trips and still contributes the fallback weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    High,
    Medium,
    Low,
    Other(String),
}

impl Severity {
    /// Parse a stored severity string. Matching ignores case and surrounding whitespace.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Other(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Other(s) => s,
        }
    }

    /// Action item priority label: the lowercased severity, title-cased per word.
    ///
    /// `high` → `High`, `CRITICAL` → `Critical`, `very high` → `Very High`.
    pub fn priority(&self) -> String {
        title_case(&self.as_str().to_lowercase())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        s.as_str().to_string()
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if at_word_start && ch.is_alphanumeric() {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.push(ch);
            if ch.is_whitespace() || ch == '-' {
                at_word_start = true;
            }
        }
    }
    out
}

/// A named, severity-tagged check that a document may pass or fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub id: String,
    pub name: String,
    /// Detection hint passed through to the classifier.
    pub pattern: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a rule. Identity and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    #[serde(default)]
    pub pattern: String,
    pub severity: Severity,
}

/// A document whose text has already been extracted upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
    /// Rule-check results from the most recent evaluation, as a JSON array.
    pub parsed_data: Option<serde_json::Value>,
    pub risk_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Completed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A remediation task created for one failed compliance check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: String,
    pub document_id: String,
    /// Resolved rule identity. Always set for items created by the generator.
    pub rule_id: Option<String>,
    pub description: String,
    pub priority: String,
    pub status: ActionStatus,
    pub assigned_to: Option<String>,
    pub due_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Fail,
    Resolved,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fail" => Some(Self::Fail),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

/// Durable record of one rule's outcome for a document.
///
/// Paired with the [`ActionItem`] written alongside it; `status` stays `fail`
/// until that item is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRuleResult {
    pub id: String,
    pub document_id: String,
    pub rule_id: String,
    /// The paired action item. `None` on records written before the column existed.
    #[serde(default)]
    pub action_item_id: Option<String>,
    pub status: AuditStatus,
    /// The classifier payload the failure was derived from.
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
