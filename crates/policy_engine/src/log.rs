//! Append-only violation log for a simulation session.
//!
//! Appends are serialized by a write lock; the id counter and the timestamp
//! are taken under that lock so id order, timestamp order and insertion order
//! agree. Severity, kind and total counts are kept in atomics, so counting
//! and break-level classification never wait on an append. Queries copy the
//! entry list out of the lock and filter the copy.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::break_level::BreakLevel;
use crate::config::PolicyKind;
use crate::severity::{ReasonCode, Severity};
use crate::violation::{PolicyViolation, ViolationDraft};

#[derive(Debug, Default)]
struct Entries {
    violations: Vec<Arc<PolicyViolation>>,
    next_id: u64,
}

/// Number of violations sharing a `(kind, reason)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub policy_kind: PolicyKind,
    pub reason_code: ReasonCode,
    pub count: usize,
}

/// Group `violations` by `(kind, reason)`, ordered by kind then reason.
pub fn summarize<'a, I>(violations: I) -> Vec<SummaryEntry>
where
    I: IntoIterator<Item = &'a PolicyViolation>,
{
    let mut counts: BTreeMap<(PolicyKind, ReasonCode), usize> = BTreeMap::new();
    for violation in violations {
        *counts
            .entry((violation.policy_kind, violation.reason_code))
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|((policy_kind, reason_code), count)| SummaryEntry {
            policy_kind,
            reason_code,
            count,
        })
        .collect()
}

/// Thread-safe, append-only sequence of violations.
#[derive(Debug, Default)]
pub struct ViolationLog {
    entries: RwLock<Entries>,
    by_severity: [AtomicUsize; 3],
    by_kind: [AtomicUsize; 3],
    total: AtomicUsize,
}

impl ViolationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation, assigning the next id.
    pub fn append(&self, draft: ViolationDraft) -> Arc<PolicyViolation> {
        let mut entries = self.entries.write();
        self.push(&mut entries, draft)
    }

    /// Record all violations of one request with consecutive ids.
    pub fn append_all<I>(&self, drafts: I) -> Vec<Arc<PolicyViolation>>
    where
        I: IntoIterator<Item = ViolationDraft>,
    {
        let mut drafts = drafts.into_iter().peekable();
        if drafts.peek().is_none() {
            return Vec::new();
        }

        let mut entries = self.entries.write();
        drafts.map(|draft| self.push(&mut entries, draft)).collect()
    }

    fn push(&self, entries: &mut Entries, draft: ViolationDraft) -> Arc<PolicyViolation> {
        let id = entries.next_id;
        entries.next_id += 1;

        let severity = draft.severity;
        let kind = draft.policy_kind;
        let violation = Arc::new(PolicyViolation::from_draft(id, Utc::now(), draft));
        entries.violations.push(Arc::clone(&violation));

        self.by_severity[severity.index()].fetch_add(1, Ordering::Release);
        self.by_kind[kind.index()].fetch_add(1, Ordering::Release);
        self.total.fetch_add(1, Ordering::Release);
        violation
    }

    /// Snapshot of every violation in insertion order.
    ///
    /// Only the `Arc` handles are copied while the lock is held.
    pub fn all(&self) -> Vec<Arc<PolicyViolation>> {
        self.entries.read().violations.clone()
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.by_severity[severity.index()].load(Ordering::Acquire)
    }

    pub fn count_by_kind(&self, kind: PolicyKind) -> usize {
        self.by_kind[kind.index()].load(Ordering::Acquire)
    }

    pub fn count_total(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.count_total() == 0
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<Arc<PolicyViolation>> {
        self.filtered(|v| v.severity == severity)
    }

    pub fn by_kind(&self, kind: PolicyKind) -> Vec<Arc<PolicyViolation>> {
        self.filtered(|v| v.policy_kind == kind)
    }

    /// Violations recorded in `[from, to)`.
    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Arc<PolicyViolation>> {
        self.filtered(|v| v.timestamp >= from && v.timestamp < to)
    }

    /// The last `n` violations, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Arc<PolicyViolation>> {
        let entries = self.entries.read();
        let start = entries.violations.len().saturating_sub(n);
        entries.violations[start..].to_vec()
    }

    fn filtered<F>(&self, predicate: F) -> Vec<Arc<PolicyViolation>>
    where
        F: Fn(&PolicyViolation) -> bool,
    {
        let mut snapshot = self.all();
        snapshot.retain(|v| predicate(v));
        snapshot
    }

    /// Counts grouped by `(kind, reason)`, ordered by kind then reason.
    pub fn summary(&self) -> Vec<SummaryEntry> {
        summarize(self.all().iter().map(|v| &**v))
    }

    /// Current break level, recomputed from the counts.
    pub fn break_level(&self) -> BreakLevel {
        crate::break_level::classify(self)
    }

    /// Drop every violation. Ids keep increasing across clears.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.violations.clear();
        for count in self.by_severity.iter().chain(&self.by_kind) {
            count.store(0, Ordering::Release);
        }
        self.total.store(0, Ordering::Release);
    }
}
