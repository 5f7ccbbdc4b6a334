//! Action items and their paired audit records.

use chrono::{DateTime, Utc};
use duckdb::params;
use legaleagle_core::{
    ActionItem, ActionStatus, AuditStatus, Completion, ComplianceRule, ComplianceStore,
    DocumentRuleResult,
};
use tracing::{debug, warn};

use crate::duck::optional;
use crate::rows::{self, ACTION_COLUMNS, stamp};
use crate::{DuckStore, StoreError};

impl DuckStore {
    pub fn action_item(&self, id: &str) -> Result<Option<ActionItem>, StoreError> {
        let conn = self.lock()?;
        let found = conn.query_row(
            &format!("SELECT {ACTION_COLUMNS} FROM action_items WHERE id = ?"),
            [id],
            rows::action_item,
        );
        optional(found)
    }

    /// Pending action items, oldest first.
    pub fn pending_action_items(&self) -> Result<Vec<ActionItem>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM action_items
             WHERE status = ? ORDER BY created_at, rowid"
        ))?;
        let items = stmt
            .query_map([ActionStatus::Pending.as_str()], rows::action_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Every action item for one document, oldest first.
    pub fn action_items_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<ActionItem>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM action_items
             WHERE document_id = ? ORDER BY created_at, rowid"
        ))?;
        let items = stmt
            .query_map([document_id], rows::action_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Insert an action item and its audit record in one transaction.
    pub fn record_failure(
        &self,
        item: &ActionItem,
        record: &DocumentRuleResult,
    ) -> Result<(), StoreError> {
        let details = match serde_json::to_string(&record.details) {
            Ok(s) => s,
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "failed to serialize audit details, storing empty object");
                "{}".to_string()
            }
        };
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO action_items (id, document_id, rule_id, description, priority, status,
                                       assigned_to, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                item.id,
                item.document_id,
                item.rule_id,
                item.description,
                item.priority,
                item.status.as_str(),
                item.assigned_to,
                item.due_date,
                stamp(&item.created_at),
                stamp(&item.updated_at)
            ],
        )?;
        tx.execute(
            "INSERT INTO document_rule_results (id, document_id, rule_id, status, details,
                                                created_at, action_item_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id,
                record.document_id,
                record.rule_id,
                record.status.as_str(),
                details,
                stamp(&record.created_at),
                record.action_item_id
            ],
        )?;
        tx.commit()?;
        debug!(action_id = %item.id, record_id = %record.id, "failure pair written");
        Ok(())
    }

    /// Complete an action item and resolve its audit record in one transaction.
    ///
    /// Resolves the record written with the item. Records that predate the
    /// `action_item_id` column pair through the newest open `fail` record for
    /// the item's `(document_id, rule_id)`; a record paired with another item
    /// is never touched.
    pub fn complete_action_item(
        &self,
        item: &ActionItem,
        at: DateTime<Utc>,
    ) -> Result<Completion, StoreError> {
        let Some(rule_id) = item.rule_id.as_deref() else {
            return Ok(Completion::AuditRecordMissing);
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let record_id = optional(tx.query_row(
            "SELECT id FROM document_rule_results
             WHERE action_item_id = ?
                OR (action_item_id IS NULL AND document_id = ? AND rule_id = ? AND status = ?)
             ORDER BY CASE WHEN action_item_id = ? THEN 0 ELSE 1 END, created_at DESC
             LIMIT 1",
            params![
                item.id,
                item.document_id,
                rule_id,
                AuditStatus::Fail.as_str(),
                item.id
            ],
            |row| row.get::<_, String>(0),
        ))?;
        let Some(record_id) = record_id else {
            // Dropping the transaction rolls it back.
            return Ok(Completion::AuditRecordMissing);
        };

        let updated = tx.execute(
            "UPDATE action_items SET status = ?, updated_at = ? WHERE id = ?",
            params![ActionStatus::Completed.as_str(), stamp(&at), item.id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                kind: "action item",
                id: item.id.clone(),
            });
        }
        tx.execute(
            "UPDATE document_rule_results SET status = ? WHERE id = ?",
            params![AuditStatus::Resolved.as_str(), record_id],
        )?;
        tx.commit()?;
        debug!(action_id = %item.id, record_id = %record_id, "completion committed");
        Ok(Completion::Completed)
    }
}

impl ComplianceStore for DuckStore {
    type Error = StoreError;

    fn rule_by_name(&self, name: &str) -> Result<Option<ComplianceRule>, StoreError> {
        DuckStore::rule_by_name(self, name)
    }

    fn record_failure(
        &self,
        item: &ActionItem,
        record: &DocumentRuleResult,
    ) -> Result<(), StoreError> {
        DuckStore::record_failure(self, item, record)
    }

    fn action_item(&self, id: &str) -> Result<Option<ActionItem>, StoreError> {
        DuckStore::action_item(self, id)
    }

    fn complete_action_item(
        &self,
        item: &ActionItem,
        at: DateTime<Utc>,
    ) -> Result<Completion, StoreError> {
        DuckStore::complete_action_item(self, item, at)
    }

    fn pending_action_items(&self) -> Result<Vec<ActionItem>, StoreError> {
        DuckStore::pending_action_items(self)
    }

    fn document_title(&self, document_id: &str) -> Result<Option<String>, StoreError> {
        DuckStore::document_title(self, document_id)
    }
}
