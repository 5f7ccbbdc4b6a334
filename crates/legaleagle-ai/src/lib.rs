//! Classifier layer: an OpenAI-compatible chat-completions client that judges
//! document text against compliance rules.

mod classifier;
mod groq;

pub use classifier::{
    Classifier, ClassifierError, DEFAULT_RULES, NO_RESULT_EXPLANATION, PARSE_FAILURE_EXPLANATION,
    TOPIC_RULES, extract_rules_from_text, parse_check_result, parse_rule_list,
};
pub use groq::{ChatClassifier, ClassifierSettings};
