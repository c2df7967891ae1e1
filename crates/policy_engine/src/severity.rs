//! Violation causes and their fixed severities.
//!
//! Every [`ReasonCode`] has exactly one row in [`SEVERITY_TABLE`], which fixes
//! the policy kind it is reported under and its severity. Rule modules only
//! choose a reason; they never pick a severity themselves.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PolicyKind;

/// Ordered severity of a violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub(crate) fn index(self) -> usize {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a request violated a policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    HstsDowngrade,
    MixedContent,
    CspScriptSrc,
    CspStyleSrc,
    CspImgSrc,
    CspFontSrc,
    CspMediaSrc,
    CspFrameSrc,
    CorsBlocked,
}

impl ReasonCode {
    /// Stable code, as it appears in reports.
    pub fn code(&self) -> &'static str {
        match self {
            ReasonCode::HstsDowngrade => "HSTS_DOWNGRADE",
            ReasonCode::MixedContent => "MIXED_CONTENT",
            ReasonCode::CspScriptSrc => "CSP_SCRIPT_SRC",
            ReasonCode::CspStyleSrc => "CSP_STYLE_SRC",
            ReasonCode::CspImgSrc => "CSP_IMG_SRC",
            ReasonCode::CspFontSrc => "CSP_FONT_SRC",
            ReasonCode::CspMediaSrc => "CSP_MEDIA_SRC",
            ReasonCode::CspFrameSrc => "CSP_FRAME_SRC",
            ReasonCode::CorsBlocked => "CORS_BLOCKED",
        }
    }

    /// CSP directive a CSP reason corresponds to.
    pub fn directive(&self) -> Option<&'static str> {
        match self {
            ReasonCode::CspScriptSrc => Some("script-src"),
            ReasonCode::CspStyleSrc => Some("style-src"),
            ReasonCode::CspImgSrc => Some("img-src"),
            ReasonCode::CspFontSrc => Some("font-src"),
            ReasonCode::CspMediaSrc => Some("media-src"),
            ReasonCode::CspFrameSrc => Some("frame-src"),
            _ => None,
        }
    }

    /// The table row for this reason.
    pub fn rule(self) -> SeverityRule {
        SEVERITY_TABLE[self as usize]
    }

    pub fn severity(self) -> Severity {
        self.rule().severity
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One row of the severity table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeverityRule {
    pub kind: PolicyKind,
    pub reason: ReasonCode,
    pub severity: Severity,
}

const fn rule(kind: PolicyKind, reason: ReasonCode, severity: Severity) -> SeverityRule {
    SeverityRule {
        kind,
        reason,
        severity,
    }
}

/// `(kind, reason) -> severity`, indexed by `ReasonCode` discriminant.
pub const SEVERITY_TABLE: [SeverityRule; 9] = [
    rule(PolicyKind::Hsts, ReasonCode::HstsDowngrade, Severity::High),
    // Reported under HSTS; evaluated whenever any policy is active.
    rule(PolicyKind::Hsts, ReasonCode::MixedContent, Severity::High),
    rule(PolicyKind::Csp, ReasonCode::CspScriptSrc, Severity::High),
    rule(PolicyKind::Csp, ReasonCode::CspStyleSrc, Severity::Medium),
    rule(PolicyKind::Csp, ReasonCode::CspImgSrc, Severity::Low),
    rule(PolicyKind::Csp, ReasonCode::CspFontSrc, Severity::Low),
    rule(PolicyKind::Csp, ReasonCode::CspMediaSrc, Severity::Low),
    rule(PolicyKind::Csp, ReasonCode::CspFrameSrc, Severity::Medium),
    rule(PolicyKind::Cors, ReasonCode::CorsBlocked, Severity::Medium),
];

/// Look up the severity of `(kind, reason)`; `None` if the pair is not a
/// table row.
pub fn severity_for(kind: PolicyKind, reason: ReasonCode) -> Option<Severity> {
    SEVERITY_TABLE
        .iter()
        .find(|row| row.kind == kind && row.reason == reason)
        .map(|row| row.severity)
}
