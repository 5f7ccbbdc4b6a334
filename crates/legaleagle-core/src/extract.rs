//! Rule-name recovery from free-text classifier explanations.
//!
//! The classifier explains a failure in prose ("The document lacks a required
//! 'NDA Check' clause."). Action items need the catalog name of the rule, so
//! [`RuleNameExtractor`] applies an ordered list of heuristics and stops at the
//! first one that produces a name:
//!
//! 1. The phrase "non-disclosure agreement" always means `NDA Check`.
//! 2. Ordered keyword table: the first keyword contained in the text wins.
//! 3. Text inside single quotes, then double quotes, then after the word
//!    "rule" up to the next colon. Only the first match of each pattern counts.
//! 4. Whatever follows "required by".
//! 5. `Unknown Rule`.
//!
//! All matching ignores case. Extracted text keeps the casing of the input so
//! a quoted catalog name resolves exactly.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Returned when no heuristic produces a name.
pub const UNKNOWN_RULE: &str = "Unknown Rule";

/// Catalog name forced by [`NDA_PHRASE`].
pub const NDA_RULE: &str = "NDA Check";

const NDA_PHRASE: &str = "non-disclosure agreement";

static QUOTE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"'([^']*)'").expect("single-quote pattern"),
        Regex::new(r#""([^"]*)""#).expect("double-quote pattern"),
        Regex::new(r"(?i)rule\s*([^:]+)").expect("rule-prefix pattern"),
    ]
});

static REQUIRED_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)required by(.*)").expect("required-by pattern"));

/// One entry of the keyword table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub rule_name: String,
}

impl KeywordRule {
    pub fn new(keyword: impl Into<String>, rule_name: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            rule_name: rule_name.into(),
        }
    }
}

/// Keyword table for [`RuleNameExtractor`]. Entries are tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub keywords: Vec<KeywordRule>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            keywords: vec![
                KeywordRule::new("nda check", NDA_RULE),
                KeywordRule::new("confidentiality", "Confidentiality Check"),
                KeywordRule::new("document integrity", "Document Integrity Check"),
            ],
        }
    }
}

/// Best-effort classifier from explanation prose to a rule name.
#[derive(Debug, Clone)]
pub struct RuleNameExtractor {
    /// `(lowercased keyword, rule name)` in priority order.
    keywords: Vec<(String, String)>,
}

impl Default for RuleNameExtractor {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default())
    }
}

impl RuleNameExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        let keywords = config
            .keywords
            .iter()
            .filter(|k| !k.keyword.trim().is_empty())
            .map(|k| (k.keyword.to_lowercase(), k.rule_name.clone()))
            .collect();
        Self { keywords }
    }

    /// Recover the rule name an explanation refers to.
    pub fn extract(&self, explanation: &str) -> String {
        let folded = explanation.to_lowercase();

        if folded.contains(NDA_PHRASE) {
            return NDA_RULE.to_string();
        }

        if let Some((_, name)) = self.keywords.iter().find(|(kw, _)| folded.contains(kw.as_str()))
        {
            return name.clone();
        }

        if let Some(name) = from_patterns(explanation) {
            return name;
        }

        if let Some(name) = after_required_by(explanation) {
            return name;
        }

        warn!(explanation, "could not extract rule name from explanation");
        UNKNOWN_RULE.to_string()
    }
}

fn from_patterns(text: &str) -> Option<String> {
    for (i, re) in QUOTE_PATTERNS.iter().enumerate() {
        let Some(caps) = re.captures(text) else {
            continue;
        };
        let captured = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if !captured.is_empty() {
            debug!(pattern = i, name = captured, "rule name from pattern");
            return Some(captured.to_string());
        }
    }
    None
}

fn after_required_by(text: &str) -> Option<String> {
    let caps = REQUIRED_BY.captures(text)?;
    let rest = caps.get(1)?.as_str().trim();
    (!rest.is_empty()).then(|| rest.to_string())
}
