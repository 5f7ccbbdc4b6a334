//! Action item generation and lifecycle.
//!
//! [`ActionItemGenerator`] turns failed rule checks into paired action items and
//! audit records. [`ActionItemLifecycle`] completes action items and resolves
//! the paired audit record. Both run against a [`ComplianceStore`], which must
//! apply each pair write and each completion atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::check::RuleCheckResult;
use crate::extract::RuleNameExtractor;
use crate::model::{
    ActionItem, ActionStatus, AuditStatus, ComplianceRule, DocumentRuleResult,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("action item not found: {0}")]
    ActionItemNotFound(String),

    #[error("no audit record for document {document_id}, rule {rule_id}")]
    AuditRecordNotFound {
        document_id: String,
        rule_id: String,
    },

    #[error("store error: {0}")]
    Store(#[source] BoxError),
}

impl RemediationError {
    fn store<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(e))
    }

    /// Whether the error is a primary-key miss rather than a storage failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ActionItemNotFound(_) | Self::AuditRecordNotFound { .. }
        )
    }
}

/// Outcome of the transactional part of a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed,
    /// No audit record is paired with the item; nothing was written.
    AuditRecordMissing,
}

/// Persistence seam for remediation tracking.
pub trait ComplianceStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Exact-name catalog lookup.
    fn rule_by_name(&self, name: &str) -> Result<Option<ComplianceRule>, Self::Error>;

    /// Insert an action item and its audit record in one transaction.
    fn record_failure(
        &self,
        item: &ActionItem,
        record: &DocumentRuleResult,
    ) -> Result<(), Self::Error>;

    fn action_item(&self, id: &str) -> Result<Option<ActionItem>, Self::Error>;

    /// In one transaction: mark the item completed as of `at` and resolve the
    /// audit record written with it. Records without an `action_item_id` pair
    /// with the item through an open `fail` record for its `(document_id, rule_id)`.
    /// Must roll back and return [`Completion::AuditRecordMissing`] when there is
    /// no such record.
    fn complete_action_item(
        &self,
        item: &ActionItem,
        at: DateTime<Utc>,
    ) -> Result<Completion, Self::Error>;

    fn pending_action_items(&self) -> Result<Vec<ActionItem>, Self::Error>;

    fn document_title(&self, document_id: &str) -> Result<Option<String>, Self::Error>;
}

// ── Generation ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No catalog rule carries the extracted name.
    RuleNotFound,
    /// The catalog rule exists but has an empty identity.
    InvalidRuleId,
}

/// A failed result that produced no action item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFailure {
    pub rule_name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub created: Vec<ActionItem>,
    pub skipped: Vec<SkippedFailure>,
    /// Results that were not failures (pass, or no readable status).
    pub non_failures: usize,
}

pub struct ActionItemGenerator<'a, S> {
    store: &'a S,
    extractor: &'a RuleNameExtractor,
}

impl<'a, S: ComplianceStore> ActionItemGenerator<'a, S> {
    pub fn new(store: &'a S, extractor: &'a RuleNameExtractor) -> Self {
        Self { store, extractor }
    }

    /// Create one action item and one audit record per failure that resolves
    /// to a catalog rule.
    ///
    /// Stops at the first store error. Pairs written before the error stay.
    pub fn generate(
        &self,
        document_id: &str,
        results: &[RuleCheckResult],
    ) -> Result<GenerationReport, RemediationError> {
        let mut report = GenerationReport::default();

        for result in results {
            if !result.is_failure() {
                report.non_failures += 1;
                continue;
            }

            let explanation = result.explanation().unwrap_or_default();
            let rule_name = self.extractor.extract(explanation);
            debug!(document_id, rule = %rule_name, "extracted rule name from explanation");

            let rule = match self
                .store
                .rule_by_name(&rule_name)
                .map_err(RemediationError::store)?
            {
                Some(rule) => rule,
                None => {
                    warn!(document_id, rule = %rule_name, "rule not found in catalog, skipping");
                    report.skipped.push(SkippedFailure {
                        rule_name,
                        reason: SkipReason::RuleNotFound,
                    });
                    continue;
                }
            };

            if rule.id.trim().is_empty() {
                warn!(document_id, rule = %rule_name, "rule has empty id, skipping");
                report.skipped.push(SkippedFailure {
                    rule_name,
                    reason: SkipReason::InvalidRuleId,
                });
                continue;
            }

            let now = Utc::now();
            let item = ActionItem {
                id: Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                rule_id: Some(rule.id.clone()),
                description: format!("Address {rule_name} non-compliance: {explanation}"),
                priority: rule.severity.priority(),
                status: ActionStatus::Pending,
                assigned_to: None,
                due_date: None,
                created_at: now,
                updated_at: now,
            };
            let record = DocumentRuleResult {
                id: Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                rule_id: rule.id.clone(),
                action_item_id: Some(item.id.clone()),
                status: AuditStatus::Fail,
                details: serde_json::Value::Object(result.payload().clone()),
                created_at: now,
            };

            self.store
                .record_failure(&item, &record)
                .map_err(RemediationError::store)?;
            info!(
                document_id,
                action_id = %item.id,
                rule = %rule_name,
                priority = %item.priority,
                "action item created"
            );
            report.created.push(item);
        }

        Ok(report)
    }
}

// ── Lifecycle ──

/// A pending action item joined with its document's title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitledActionItem {
    #[serde(flatten)]
    pub item: ActionItem,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingWithTitles {
    pub items: Vec<TitledActionItem>,
    /// Pending items left out because their document title could not be read.
    pub missing_titles: usize,
}

pub struct ActionItemLifecycle<'a, S> {
    store: &'a S,
}

impl<'a, S: ComplianceStore> ActionItemLifecycle<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Mark an action item completed and resolve its audit record.
    ///
    /// Completing an already-completed item succeeds without writing anything.
    pub fn complete(&self, action_id: &str) -> Result<ActionItem, RemediationError> {
        let mut item = self
            .store
            .action_item(action_id)
            .map_err(RemediationError::store)?
            .ok_or_else(|| RemediationError::ActionItemNotFound(action_id.to_string()))?;

        if item.status == ActionStatus::Completed {
            debug!(action_id, "action item already completed");
            return Ok(item);
        }

        let missing = || RemediationError::AuditRecordNotFound {
            document_id: item.document_id.clone(),
            rule_id: item.rule_id.clone().unwrap_or_default(),
        };
        if item.rule_id.is_none() {
            warn!(action_id, "action item has no rule id, cannot resolve audit record");
            return Err(missing());
        }

        let now = Utc::now();
        match self
            .store
            .complete_action_item(&item, now)
            .map_err(RemediationError::store)?
        {
            Completion::Completed => {}
            Completion::AuditRecordMissing => {
                warn!(action_id, document_id = %item.document_id, "audit record missing, completion rolled back");
                return Err(missing());
            }
        }

        item.status = ActionStatus::Completed;
        item.updated_at = now;
        info!(action_id, document_id = %item.document_id, "action item completed");
        Ok(item)
    }

    pub fn pending(&self) -> Result<Vec<ActionItem>, RemediationError> {
        self.store
            .pending_action_items()
            .map_err(RemediationError::store)
    }

    /// Pending items with document titles. Items whose title lookup misses or
    /// fails are dropped and counted.
    pub fn pending_with_titles(&self) -> Result<PendingWithTitles, RemediationError> {
        let pending = self.pending()?;
        let mut out = PendingWithTitles {
            items: Vec::with_capacity(pending.len()),
            missing_titles: 0,
        };

        for item in pending {
            match self.store.document_title(&item.document_id) {
                Ok(Some(title)) => out.items.push(TitledActionItem { item, title }),
                Ok(None) => {
                    warn!(action_id = %item.id, document_id = %item.document_id, "document not found for action item");
                    out.missing_titles += 1;
                }
                Err(e) => {
                    warn!(action_id = %item.id, document_id = %item.document_id, error = %e, "failed to fetch document title");
                    out.missing_titles += 1;
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckStatus;
    use crate::model::Severity;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    #[derive(Debug, Error)]
    #[error("fake store failure")]
    struct FakeError;

    /// In-memory store; `fail_after` makes `record_failure` error once that
    /// many pairs have been written.
    #[derive(Default)]
    struct FakeStore {
        rules: Vec<ComplianceRule>,
        titles: HashMap<String, String>,
        items: RefCell<Vec<ActionItem>>,
        records: RefCell<Vec<DocumentRuleResult>>,
        fail_after: Option<usize>,
        completions: Cell<usize>,
    }

    impl FakeStore {
        fn with_rules(rules: &[(&str, &str, &str)]) -> Self {
            Self {
                rules: rules
                    .iter()
                    .map(|(id, name, sev)| ComplianceRule {
                        id: id.to_string(),
                        name: name.to_string(),
                        pattern: String::new(),
                        severity: Severity::parse(sev),
                        created_at: Utc::now(),
                    })
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl ComplianceStore for FakeStore {
        type Error = FakeError;

        fn rule_by_name(&self, name: &str) -> Result<Option<ComplianceRule>, FakeError> {
            Ok(self.rules.iter().find(|r| r.name == name).cloned())
        }

        fn record_failure(
            &self,
            item: &ActionItem,
            record: &DocumentRuleResult,
        ) -> Result<(), FakeError> {
            if self.fail_after == Some(self.items.borrow().len()) {
                return Err(FakeError);
            }
            self.items.borrow_mut().push(item.clone());
            self.records.borrow_mut().push(record.clone());
            Ok(())
        }

        fn action_item(&self, id: &str) -> Result<Option<ActionItem>, FakeError> {
            Ok(self.items.borrow().iter().find(|i| i.id == id).cloned())
        }

        fn complete_action_item(
            &self,
            item: &ActionItem,
            at: DateTime<Utc>,
        ) -> Result<Completion, FakeError> {
            self.completions.set(self.completions.get() + 1);
            let rule_id = item.rule_id.clone().unwrap_or_default();
            let mut records = self.records.borrow_mut();
            let Some(record) = records.iter_mut().find(|r| match &r.action_item_id {
                Some(paired) => *paired == item.id,
                None => {
                    r.document_id == item.document_id
                        && r.rule_id == rule_id
                        && r.status == AuditStatus::Fail
                }
            }) else {
                return Ok(Completion::AuditRecordMissing);
            };
            record.status = AuditStatus::Resolved;
            let mut items = self.items.borrow_mut();
            if let Some(stored) = items.iter_mut().find(|i| i.id == item.id) {
                stored.status = ActionStatus::Completed;
                stored.updated_at = at;
            }
            Ok(Completion::Completed)
        }

        fn pending_action_items(&self) -> Result<Vec<ActionItem>, FakeError> {
            Ok(self
                .items
                .borrow()
                .iter()
                .filter(|i| i.status == ActionStatus::Pending)
                .cloned()
                .collect())
        }

        fn document_title(&self, document_id: &str) -> Result<Option<String>, FakeError> {
            Ok(self.titles.get(document_id).cloned())
        }
    }

    fn fail(explanation: &str) -> RuleCheckResult {
        RuleCheckResult::new(CheckStatus::Fail, explanation)
    }

    #[test]
    fn creates_item_and_audit_record_for_resolved_failure() {
        let store = FakeStore::with_rules(&[("r1", "NDA Check", "high")]);
        let extractor = RuleNameExtractor::default();
        let explanation = "The document lacks a required 'NDA Check' clause.";

        let report = ActionItemGenerator::new(&store, &extractor)
            .generate("doc-1", &[fail(explanation)])
            .unwrap();

        assert_eq!(report.created.len(), 1);
        let item = &report.created[0];
        assert_eq!(item.document_id, "doc-1");
        assert_eq!(item.rule_id.as_deref(), Some("r1"));
        assert_eq!(item.priority, "High");
        assert_eq!(item.status, ActionStatus::Pending);
        assert!(item.assigned_to.is_none());
        assert_eq!(
            item.description,
            format!("Address NDA Check non-compliance: {explanation}")
        );

        let records = store.records.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AuditStatus::Fail);
        assert_eq!(records[0].rule_id, "r1");
        assert_eq!(records[0].action_item_id.as_deref(), Some(item.id.as_str()));
        assert_eq!(records[0].details["explanation"], explanation);
    }

    #[test]
    fn unresolvable_rule_is_skipped_without_error() {
        let store = FakeStore::default();
        let extractor = RuleNameExtractor::default();
        let result = fail("Violates 'Nonexistent Rule'").with_rule_name("Nonexistent Rule");

        let report = ActionItemGenerator::new(&store, &extractor)
            .generate("doc-1", &[result])
            .unwrap();

        assert!(report.created.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].rule_name, "Nonexistent Rule");
        assert_eq!(report.skipped[0].reason, SkipReason::RuleNotFound);
        assert!(store.items.borrow().is_empty());
        assert!(store.records.borrow().is_empty());
    }

    #[test]
    fn empty_rule_id_is_skipped() {
        let store = FakeStore::with_rules(&[("", "Confidentiality Check", "medium")]);
        let extractor = RuleNameExtractor::default();

        let report = ActionItemGenerator::new(&store, &extractor)
            .generate("doc-1", &[fail("confidentiality clause missing")])
            .unwrap();

        assert!(report.created.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::InvalidRuleId);
    }

    #[test]
    fn only_failures_generate_items() {
        let store = FakeStore::with_rules(&[
            ("r1", "NDA Check", "high"),
            ("r2", "Confidentiality Check", "low"),
        ]);
        let extractor = RuleNameExtractor::default();
        let results = vec![
            fail("no non-disclosure agreement"),
            RuleCheckResult::new(CheckStatus::Pass, "confidentiality fine"),
            RuleCheckResult::from_value(serde_json::json!({"explanation": "confidentiality"})),
            fail("nothing recognisable here"),
        ];

        let report = ActionItemGenerator::new(&store, &extractor)
            .generate("doc-1", &results)
            .unwrap();

        assert_eq!(report.created.len(), 1);
        assert_eq!(report.non_failures, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].rule_name, "Unknown Rule");
        let failures = results.iter().filter(|r| r.is_failure()).count();
        assert!(report.created.len() <= failures);
    }

    #[test]
    fn store_error_aborts_remaining_results() {
        let mut store = FakeStore::with_rules(&[
            ("r1", "NDA Check", "high"),
            ("r2", "Confidentiality Check", "low"),
        ]);
        store.fail_after = Some(1);
        let extractor = RuleNameExtractor::default();
        let results = vec![
            fail("no non-disclosure agreement"),
            fail("confidentiality missing"),
            fail("no non-disclosure agreement again"),
        ];

        let err = ActionItemGenerator::new(&store, &extractor)
            .generate("doc-1", &results)
            .unwrap_err();

        assert!(matches!(err, RemediationError::Store(_)));
        assert!(!err.is_not_found());
        // First pair stays written.
        assert_eq!(store.items.borrow().len(), 1);
        assert_eq!(store.records.borrow().len(), 1);
    }

    #[test]
    fn complete_resolves_audit_record() {
        let store = FakeStore::with_rules(&[("r1", "NDA Check", "high")]);
        let extractor = RuleNameExtractor::default();
        let report = ActionItemGenerator::new(&store, &extractor)
            .generate("doc-1", &[fail("no non-disclosure agreement")])
            .unwrap();
        let id = report.created[0].id.clone();

        let lifecycle = ActionItemLifecycle::new(&store);
        let done = lifecycle.complete(&id).unwrap();
        assert_eq!(done.status, ActionStatus::Completed);
        assert_eq!(store.records.borrow()[0].status, AuditStatus::Resolved);
        assert!(lifecycle.pending().unwrap().is_empty());
    }

    #[test]
    fn complete_twice_keeps_end_state() {
        let store = FakeStore::with_rules(&[("r1", "NDA Check", "high")]);
        let extractor = RuleNameExtractor::default();
        let report = ActionItemGenerator::new(&store, &extractor)
            .generate("doc-1", &[fail("no non-disclosure agreement")])
            .unwrap();
        let id = report.created[0].id.clone();

        let lifecycle = ActionItemLifecycle::new(&store);
        lifecycle.complete(&id).unwrap();
        lifecycle.complete(&id).unwrap();

        assert_eq!(store.items.borrow()[0].status, ActionStatus::Completed);
        assert_eq!(store.records.borrow()[0].status, AuditStatus::Resolved);
        assert_eq!(store.completions.get(), 1);
    }

    #[test]
    fn completing_one_of_two_reevaluated_items_leaves_the_other_open() {
        let store = FakeStore::with_rules(&[("r1", "NDA Check", "high")]);
        let extractor = RuleNameExtractor::default();
        let generator = ActionItemGenerator::new(&store, &extractor);
        let first = generator
            .generate("doc-1", &[fail("no non-disclosure agreement")])
            .unwrap()
            .created
            .remove(0);
        let second = generator
            .generate("doc-1", &[fail("no non-disclosure agreement")])
            .unwrap()
            .created
            .remove(0);

        let lifecycle = ActionItemLifecycle::new(&store);
        lifecycle.complete(&first.id).unwrap();
        lifecycle.complete(&first.id).unwrap();

        let status_of = |action_id: &str| {
            store
                .records
                .borrow()
                .iter()
                .find(|r| r.action_item_id.as_deref() == Some(action_id))
                .map(|r| r.status)
        };
        assert_eq!(status_of(&first.id), Some(AuditStatus::Resolved));
        assert_eq!(status_of(&second.id), Some(AuditStatus::Fail));
        let pending = lifecycle.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);

        lifecycle.complete(&second.id).unwrap();
        assert!(
            store
                .records
                .borrow()
                .iter()
                .all(|r| r.status == AuditStatus::Resolved)
        );
    }

    #[test]
    fn complete_unknown_id_is_not_found() {
        let store = FakeStore::default();
        let err = ActionItemLifecycle::new(&store).complete("missing").unwrap_err();
        assert!(matches!(err, RemediationError::ActionItemNotFound(ref id) if id == "missing"));
        assert!(err.is_not_found());
    }

    #[test]
    fn complete_without_audit_record_leaves_item_pending() {
        let store = FakeStore::default();
        let now = Utc::now();
        store.items.borrow_mut().push(ActionItem {
            id: "a1".into(),
            document_id: "doc-1".into(),
            rule_id: Some("r1".into()),
            description: "orphan".into(),
            priority: "Low".into(),
            status: ActionStatus::Pending,
            assigned_to: None,
            due_date: None,
            created_at: now,
            updated_at: now,
        });

        let err = ActionItemLifecycle::new(&store).complete("a1").unwrap_err();
        assert!(matches!(err, RemediationError::AuditRecordNotFound { .. }));
        assert_eq!(store.items.borrow()[0].status, ActionStatus::Pending);
    }

    #[test]
    fn pending_with_titles_drops_untitled_items() {
        let mut store = FakeStore::with_rules(&[("r1", "NDA Check", "high")]);
        store.titles.insert("doc-1".into(), "Supplier Agreement".into());
        let extractor = RuleNameExtractor::default();
        let generator = ActionItemGenerator::new(&store, &extractor);
        generator
            .generate("doc-1", &[fail("no non-disclosure agreement")])
            .unwrap();
        generator
            .generate("doc-2", &[fail("no non-disclosure agreement")])
            .unwrap();

        let lifecycle = ActionItemLifecycle::new(&store);
        assert_eq!(lifecycle.pending().unwrap().len(), 2);

        let titled = lifecycle.pending_with_titles().unwrap();
        assert_eq!(titled.items.len(), 1);
        assert_eq!(titled.items[0].title, "Supplier Agreement");
        assert_eq!(titled.items[0].item.document_id, "doc-1");
        assert_eq!(titled.missing_titles, 1);
    }

    #[test]
    fn titled_item_serializes_flat() {
        let now = Utc::now();
        let titled = TitledActionItem {
            item: ActionItem {
                id: "a1".into(),
                document_id: "doc-1".into(),
                rule_id: Some("r1".into()),
                description: "d".into(),
                priority: "High".into(),
                status: ActionStatus::Pending,
                assigned_to: None,
                due_date: None,
                created_at: now,
                updated_at: now,
            },
            title: "Lease".into(),
        };
        let json = serde_json::to_value(&titled).unwrap();
        assert_eq!(json["title"], "Lease");
        assert_eq!(json["id"], "a1");
        assert_eq!(json["status"], "pending");
    }
}
