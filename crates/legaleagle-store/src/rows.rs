//! Row ↔ record conversion. Timestamps are stored as RFC 3339 text with
//! microsecond precision so lexical order is chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::Row;
use duckdb::types::Type;
use legaleagle_core::{
    ActionItem, ActionStatus, AuditStatus, ComplianceRule, Document, DocumentRuleResult, Severity,
};

pub(crate) const RULE_COLUMNS: &str = "id, name, pattern, severity, created_at";

pub(crate) const DOCUMENT_COLUMNS: &str =
    "id, title, text, parsed_data, risk_score, created_at, updated_at";

pub(crate) const ACTION_COLUMNS: &str = "id, document_id, rule_id, description, priority, status, \
     assigned_to, due_date, created_at, updated_at";

pub(crate) const RESULT_COLUMNS: &str =
    "id, document_id, rule_id, status, details, created_at, action_item_id";

pub(crate) fn stamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> duckdb::Error {
    duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn bad_value(idx: usize, what: &str, value: &str) -> duckdb::Error {
    let msg = format!("invalid {what}: {value}");
    duckdb::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn timestamp(row: &Row<'_>, idx: usize) -> duckdb::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn json(row: &Row<'_>, idx: usize) -> duckdb::Result<Option<serde_json::Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn rule(row: &Row<'_>) -> duckdb::Result<ComplianceRule> {
    let severity: String = row.get(3)?;
    Ok(ComplianceRule {
        id: row.get(0)?,
        name: row.get(1)?,
        pattern: row.get(2)?,
        severity: Severity::parse(&severity),
        created_at: timestamp(row, 4)?,
    })
}

pub(crate) fn document(row: &Row<'_>) -> duckdb::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        parsed_data: json(row, 3)?,
        risk_score: row.get(4)?,
        created_at: timestamp(row, 5)?,
        updated_at: timestamp(row, 6)?,
    })
}

pub(crate) fn action_item(row: &Row<'_>) -> duckdb::Result<ActionItem> {
    let status: String = row.get(5)?;
    Ok(ActionItem {
        id: row.get(0)?,
        document_id: row.get(1)?,
        rule_id: row.get(2)?,
        description: row.get(3)?,
        priority: row.get(4)?,
        status: ActionStatus::parse(&status)
            .ok_or_else(|| bad_value(5, "action status", &status))?,
        assigned_to: row.get(6)?,
        due_date: row.get(7)?,
        created_at: timestamp(row, 8)?,
        updated_at: timestamp(row, 9)?,
    })
}

pub(crate) fn rule_result(row: &Row<'_>) -> duckdb::Result<DocumentRuleResult> {
    let status: String = row.get(3)?;
    Ok(DocumentRuleResult {
        id: row.get(0)?,
        document_id: row.get(1)?,
        rule_id: row.get(2)?,
        action_item_id: row.get(6)?,
        status: AuditStatus::parse(&status)
            .ok_or_else(|| bad_value(3, "audit status", &status))?,
        details: json(row, 4)?.unwrap_or_default(),
        created_at: timestamp(row, 5)?,
    })
}
