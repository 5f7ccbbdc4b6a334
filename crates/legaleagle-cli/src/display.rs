//! Plain-text rendering for CLI output.

use legaleagle_core::{ActionItem, ComplianceRule, Document, PendingWithTitles};

use crate::evaluate::EvaluationReport;

const PREVIEW_CHARS: usize = 60;

pub fn rules_table(rules: &[ComplianceRule]) -> String {
    if rules.is_empty() {
        return "No rules in catalog.\n".into();
    }
    let width = rules.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for r in rules {
        out.push_str(&format!("{:<width$}  {:<8}  {}\n", r.name, r.severity, r.id));
    }
    out
}

pub fn documents_table(docs: &[Document]) -> String {
    if docs.is_empty() {
        return "No documents.\n".into();
    }
    let mut out = String::new();
    for d in docs {
        let score = d
            .risk_score
            .map(|s| format!("{s:.1}"))
            .unwrap_or_else(|| "-".into());
        out.push_str(&format!(
            "{}  risk {:>5}  {}  {}\n",
            d.id,
            score,
            d.title,
            preview(&d.text)
        ));
    }
    out
}

pub fn action_items(items: &[ActionItem]) -> String {
    if items.is_empty() {
        return "No pending action items.\n".into();
    }
    let mut out = String::new();
    for item in items {
        out.push_str(&format!(
            "{}  [{}] {}  doc {}\n    {}\n",
            item.id,
            item.priority,
            item.status.as_str(),
            item.document_id,
            item.description
        ));
    }
    out
}

pub fn titled_action_items(pending: &PendingWithTitles) -> String {
    let mut out = String::new();
    if pending.items.is_empty() {
        out.push_str("No pending action items.\n");
    }
    for t in &pending.items {
        out.push_str(&format!(
            "{}  [{}] {}\n    {}\n",
            t.item.id, t.item.priority, t.title, t.item.description
        ));
    }
    if pending.missing_titles > 0 {
        out.push_str(&format!(
            "({} item(s) omitted: document not found)\n",
            pending.missing_titles
        ));
    }
    out
}

pub fn evaluation(report: &EvaluationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Document {}\n", report.document_id));
    out.push_str(&format!("  Risk score: {:.1}\n", report.risk_score));
    out.push_str(&format!("  Rules checked: {}\n", report.rules_checked.len()));
    for r in &report.results {
        out.push_str(&format!(
            "    {:<6} {}  {}\n",
            r.status().map(|s| s.as_str()).unwrap_or("?"),
            r.rule_name().unwrap_or("-"),
            r.explanation().unwrap_or_default()
        ));
    }
    let gen_report = &report.action_items;
    out.push_str(&format!(
        "  Action items: {} created, {} skipped\n",
        gen_report.created.len(),
        gen_report.skipped.len()
    ));
    for s in &gen_report.skipped {
        out.push_str(&format!("    skipped {} ({:?})\n", s.rule_name, s.reason));
    }
    out
}

fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use legaleagle_core::Severity;

    #[test]
    fn preview_truncates_and_flattens() {
        assert_eq!(preview("a\n  b"), "a b");
        let long = "x".repeat(100);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 1);
        assert!(p.ends_with('…'));
    }

    #[test]
    fn empty_tables_say_so() {
        assert_eq!(rules_table(&[]), "No rules in catalog.\n");
        assert_eq!(action_items(&[]), "No pending action items.\n");
        assert!(titled_action_items(&PendingWithTitles::default()).starts_with("No pending"));
    }

    #[test]
    fn rules_table_aligns_one_line_per_rule() {
        let rule = |id: &str, name: &str, severity: Severity| ComplianceRule {
            id: id.into(),
            name: name.into(),
            pattern: String::new(),
            severity,
            created_at: Utc::now(),
        };
        let out = rules_table(&[
            rule("r1", "NDA Check", Severity::High),
            rule("r2", "Confidentiality Check", Severity::Low),
        ]);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(out.ends_with('\n'));
        assert_eq!(lines[0], format!("{:<21}  {:<8}  r1", "NDA Check", "high"));
    }

    #[test]
    fn omitted_titles_are_reported() {
        let out = titled_action_items(&PendingWithTitles {
            items: Vec::new(),
            missing_titles: 2,
        });
        assert_eq!(
            out,
            "No pending action items.\n(2 item(s) omitted: document not found)\n"
        );
    }
}
