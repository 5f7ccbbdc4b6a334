//! DuckDB store for the compliance pipeline.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use duckdb::{Connection, params, params_from_iter};
use legaleagle_core::{ComplianceRule, Document, DocumentRuleResult, NewRule};
use tracing::{debug, info};
use uuid::Uuid;

use crate::StoreError;
use crate::rows::{self, DOCUMENT_COLUMNS, RESULT_COLUMNS, RULE_COLUMNS, stamp};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS compliance_rules (
    id          VARCHAR PRIMARY KEY,
    name        VARCHAR NOT NULL UNIQUE,
    pattern     VARCHAR NOT NULL,
    severity    VARCHAR NOT NULL,
    created_at  VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS documents (
    id          VARCHAR PRIMARY KEY,
    title       VARCHAR NOT NULL,
    text        VARCHAR NOT NULL,
    parsed_data VARCHAR,
    risk_score  DOUBLE,
    created_at  VARCHAR NOT NULL,
    updated_at  VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS action_items (
    id          VARCHAR PRIMARY KEY,
    document_id VARCHAR NOT NULL,
    rule_id     VARCHAR,
    description VARCHAR NOT NULL,
    priority    VARCHAR NOT NULL,
    status      VARCHAR NOT NULL,
    assigned_to VARCHAR,
    due_date    VARCHAR,
    created_at  VARCHAR NOT NULL,
    updated_at  VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS document_rule_results (
    id          VARCHAR PRIMARY KEY,
    document_id VARCHAR NOT NULL,
    rule_id     VARCHAR NOT NULL,
    status      VARCHAR NOT NULL,
    details     VARCHAR NOT NULL,
    created_at  VARCHAR NOT NULL
);
ALTER TABLE document_rule_results ADD COLUMN IF NOT EXISTS action_item_id VARCHAR;
";

/// DuckDB store for rules, documents, action items, and audit records.
///
/// One connection behind a mutex. Each public method holds the lock for one
/// statement or one transaction, so callers on different threads serialize.
///
/// Use [`open`](Self::open) for an in-memory database and
/// [`open_persistent`](Self::open_persistent) for a file that survives restarts.
/// Both create any missing tables.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened persistent store");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Other(format!("mutex poisoned: {e}")))
    }

    // ── Rules ──

    /// Add a rule to the catalog. Fails if the name is already taken.
    pub fn add_rule(&self, rule: NewRule) -> Result<ComplianceRule, StoreError> {
        let rule = ComplianceRule {
            id: Uuid::new_v4().to_string(),
            name: rule.name.trim().to_string(),
            pattern: rule.pattern,
            severity: rule.severity,
            created_at: Utc::now(),
        };
        if rule.name.is_empty() {
            return Err(StoreError::Other("rule name must not be empty".into()));
        }

        self.lock()?.execute(
            "INSERT INTO compliance_rules (id, name, pattern, severity, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                rule.id,
                rule.name,
                rule.pattern,
                rule.severity.as_str(),
                stamp(&rule.created_at)
            ],
        )?;
        info!(id = %rule.id, name = %rule.name, severity = %rule.severity, "rule added");
        Ok(rule)
    }

    /// Every rule, oldest first.
    pub fn all_rules(&self) -> Result<Vec<ComplianceRule>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM compliance_rules ORDER BY created_at, name"
        ))?;
        let rules = stmt
            .query_map([], rows::rule)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// Rules whose names are in `names`. Unknown names are ignored.
    pub fn rules_by_names(&self, names: &[String]) -> Result<Vec<ComplianceRule>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; names.len()].join(", ");
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM compliance_rules
             WHERE name IN ({placeholders}) ORDER BY created_at, name"
        ))?;
        let rules = stmt
            .query_map(params_from_iter(names.iter()), rows::rule)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(requested = names.len(), found = rules.len(), "rules by names");
        Ok(rules)
    }

    /// Exact-name lookup.
    pub fn rule_by_name(&self, name: &str) -> Result<Option<ComplianceRule>, StoreError> {
        let conn = self.lock()?;
        let found = conn.query_row(
            &format!("SELECT {RULE_COLUMNS} FROM compliance_rules WHERE name = ?"),
            [name],
            rows::rule,
        );
        optional(found)
    }

    // ── Documents ──

    /// Register a document whose text was extracted upstream.
    pub fn add_document(&self, title: &str, text: &str) -> Result<Document, StoreError> {
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            text: text.to_string(),
            parsed_data: None,
            risk_score: None,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.execute(
            "INSERT INTO documents (id, title, text, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            params![doc.id, doc.title, doc.text, stamp(&now), stamp(&now)],
        )?;
        info!(id = %doc.id, title = %doc.title, chars = doc.text.len(), "document added");
        Ok(doc)
    }

    pub fn document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.lock()?;
        let found = conn.query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"),
            [id],
            rows::document,
        );
        optional(found)
    }

    pub fn document_title(&self, id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let found = conn.query_row("SELECT title FROM documents WHERE id = ?", [id], |row| {
            row.get::<_, String>(0)
        });
        optional(found)
    }

    /// Every document, newest first.
    pub fn all_documents(&self) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY created_at DESC, rowid DESC"
        ))?;
        let docs = stmt
            .query_map([], rows::document)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Case-insensitive substring search over title and text, newest first.
    pub fn search_documents(&self, query: &str) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents
             WHERE contains(lower(title), lower(?::VARCHAR))
                OR contains(lower(text), lower(?::VARCHAR))
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let docs = stmt
            .query_map([query, query], rows::document)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(query, hits = docs.len(), "document search");
        Ok(docs)
    }

    /// Store the latest evaluation's results and risk score on a document.
    pub fn record_evaluation(
        &self,
        id: &str,
        results: &serde_json::Value,
        risk_score: f64,
    ) -> Result<(), StoreError> {
        let parsed = serde_json::to_string(results)?;
        let updated = self.lock()?.execute(
            "UPDATE documents SET parsed_data = ?, risk_score = ?, updated_at = ? WHERE id = ?",
            params![parsed, risk_score, stamp(&Utc::now()), id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                kind: "document",
                id: id.to_string(),
            });
        }
        info!(id, risk_score, "evaluation recorded");
        Ok(())
    }

    // ── Audit records ──

    /// Audit records for one document, oldest first.
    pub fn rule_results_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<DocumentRuleResult>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESULT_COLUMNS} FROM document_rule_results
             WHERE document_id = ? ORDER BY created_at"
        ))?;
        let results = stmt
            .query_map([document_id], rows::rule_result)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(results)
    }
}

/// Map "no rows" to `None`.
pub(crate) fn optional<T>(found: duckdb::Result<T>) -> Result<Option<T>, StoreError> {
    match found {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
