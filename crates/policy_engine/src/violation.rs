//! Policy violation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifiedRequest;
use crate::config::PolicyKind;
use crate::resource::ResourceType;
use crate::severity::{ReasonCode, Severity};

/// A violation produced by the evaluator, before the log stamps it with an
/// id and timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViolationDraft {
    pub policy_kind: PolicyKind,
    pub reason_code: ReasonCode,
    pub severity: Severity,
    pub resource_type: ResourceType,
    pub url: String,
    pub initiator: Option<String>,
    pub blocked: bool,
    pub message: String,
}

impl ViolationDraft {
    /// Create a blocking violation; kind and severity come from the severity
    /// table.
    pub fn new(reason: ReasonCode, request: &ClassifiedRequest, message: impl Into<String>) -> Self {
        let rule = reason.rule();
        Self {
            policy_kind: rule.kind,
            reason_code: reason,
            severity: rule.severity,
            resource_type: request.resource_type,
            url: request.url.clone(),
            initiator: request.initiator_origin.as_ref().map(|o| o.serialize()),
            blocked: true,
            message: message.into(),
        }
    }

    /// Log the violation without blocking the request.
    pub fn report_only(mut self) -> Self {
        self.blocked = false;
        self
    }
}

/// Immutable record of a violation held by the violation log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// Monotonic sequence number assigned on append.
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub policy_kind: PolicyKind,
    pub resource_type: ResourceType,
    pub url: String,
    /// Origin of the page that issued the request, if known.
    pub initiator: Option<String>,
    pub severity: Severity,
    pub reason_code: ReasonCode,
    /// `false` only for violations recorded by report-only CSP.
    pub blocked: bool,
    pub message: String,
}

impl PolicyViolation {
    pub(crate) fn from_draft(id: u64, timestamp: DateTime<Utc>, draft: ViolationDraft) -> Self {
        Self {
            id,
            timestamp,
            policy_kind: draft.policy_kind,
            resource_type: draft.resource_type,
            url: draft.url,
            initiator: draft.initiator,
            severity: draft.severity,
            reason_code: draft.reason_code,
            blocked: draft.blocked,
            message: draft.message,
        }
    }
}
