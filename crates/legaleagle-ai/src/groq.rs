//! Chat-completions client. Defaults target Groq's OpenAI-compatible API.

use std::time::Duration;

use async_trait::async_trait;
use legaleagle_core::{ComplianceRule, RuleCheckResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::classifier::{Classifier, ClassifierError, parse_check_result, parse_rule_list};

/// Model and transport settings. Loadable from the `[classifier]` table of the
/// pipeline file; the API key is never read from there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// API root, without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Token cap for the applicable-rules question.
    pub rules_max_tokens: u32,
    /// Token cap for each per-rule verdict.
    pub check_max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".into(),
            model: "llama-3.3-70b-versatile".into(),
            temperature: 0.7,
            rules_max_tokens: 250,
            check_max_tokens: 150,
            timeout_secs: 30,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// [`Classifier`] over an OpenAI-compatible `chat/completions` endpoint.
pub struct ChatClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    settings: ClassifierSettings,
}

impl ChatClassifier {
    pub fn new(settings: ClassifierSettings, api_key: String) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        let endpoint = format!(
            "{}/chat/completions",
            settings.base_url.trim_end_matches('/')
        );
        Ok(Self {
            client,
            endpoint,
            api_key,
            settings,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Send one user prompt and return the first choice's content, if any.
    async fn complete(
        &self,
        prompt: String,
        max_tokens: u32,
    ) -> Result<Option<String>, ClassifierError> {
        let body = json!({
            "model": self.settings.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.settings.temperature,
            "max_tokens": max_tokens,
            "response_format": {"type": "json_object"},
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default());
        debug!(content = ?content, "classifier response");
        Ok(content)
    }
}

#[async_trait]
impl Classifier for ChatClassifier {
    async fn applicable_rules(
        &self,
        text: &str,
        catalog: &[String],
    ) -> Result<Vec<String>, ClassifierError> {
        let prompt = format!(
            "Analyze this document text and decide which of these legal compliance rules \
             should be checked against it: {}. Answer with a JSON object of the form \
             {{\"rules\": [\"rule name\", ...]}} using names from the list.\n\n{text}",
            catalog.join(", ")
        );
        let content = self
            .complete(prompt, self.settings.rules_max_tokens)
            .await?;
        let rules = parse_rule_list(content.as_deref());
        info!(count = rules.len(), rules = ?rules, "applicable rules determined");
        Ok(rules)
    }

    async fn check_rule(
        &self,
        text: &str,
        rule: &ComplianceRule,
    ) -> Result<RuleCheckResult, ClassifierError> {
        let prompt = format!(
            "Check compliance for rule '{}' with pattern '{}'. Document text: {text}\n\
             Respond with a JSON object containing 'status' (pass/fail) and 'explanation'.",
            rule.name, rule.pattern
        );
        let content = self
            .complete(prompt, self.settings.check_max_tokens)
            .await?;
        let result = parse_check_result(content.as_deref(), &rule.name);
        info!(
            rule = %rule.name,
            status = result.status().map(|s| s.as_str()).unwrap_or("unknown"),
            "rule checked"
        );
        Ok(result)
    }
}
