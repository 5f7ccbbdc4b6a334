//! Pipeline file loading.
//!
//! ```toml
//! positional_fallback = false
//!
//! [weights]
//! high = 3.0
//! medium = 2.0
//!
//! [[extractor.keywords]]
//! keyword = "nda check"
//! rule_name = "NDA Check"
//!
//! [classifier]
//! model = "llama-3.3-70b-versatile"
//! timeout_secs = 30
//! ```

use std::path::Path;

use anyhow::Context;
use legaleagle_ai::ClassifierSettings;
use legaleagle_core::PipelineConfig;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
    pub classifier: ClassifierSettings,
}

impl FileConfig {
    /// Defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::parse(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        info!(
            path = %path.display(),
            keywords = config.pipeline.extractor.keywords.len(),
            "loaded pipeline config"
        );
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legaleagle_core::KeywordRule;

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = FileConfig::parse(
            r#"
            positional_fallback = true

            [weights]
            high = 5.0

            [[extractor.keywords]]
            keyword = "signature"
            rule_name = "Signature Requirement"

            [classifier]
            model = "test-model"
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert!(cfg.pipeline.positional_fallback);
        assert_eq!(cfg.pipeline.weights.high, 5.0);
        assert_eq!(cfg.pipeline.weights.low, 1.0);
        assert_eq!(
            cfg.pipeline.extractor.keywords,
            vec![KeywordRule::new("signature", "Signature Requirement")]
        );
        assert_eq!(cfg.classifier.model, "test-model");
        assert_eq!(cfg.classifier.timeout_secs, 5);
        assert_eq!(cfg.classifier.check_max_tokens, 150);
    }

    #[test]
    fn load_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("legaleagle.toml");
        std::fs::write(&path, "[weights]\nmedium = 4.0\n").unwrap();

        let cfg = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.pipeline.weights.medium, 4.0);
        assert!(FileConfig::load(Some(&tmp.path().join("missing.toml"))).is_err());
        assert_eq!(FileConfig::load(None).unwrap(), FileConfig::default());
    }
}
