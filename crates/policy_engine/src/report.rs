//! Report data consumed by exporters.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use common::SimulatorResult;
use serde::Serialize;

use crate::break_level::BreakLevel;
use crate::config::{PolicyKind, PolicyMode};
use crate::log::{summarize, SummaryEntry};
use crate::session::RequestCounts;
use crate::severity::Severity;
use crate::violation::PolicyViolation;

/// A policy that was being evaluated when the report was taken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivePolicy {
    pub kind: PolicyKind,
    pub mode: PolicyMode,
    /// Simulated header value, for policies that have one.
    pub header: Option<String>,
}

/// Snapshot of a simulation session.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub generated_at: DateTime<Utc>,
    pub page_url: Option<String>,
    pub active_policies: Vec<ActivePolicy>,
    pub warnings: Vec<String>,
    pub break_level: BreakLevel,
    pub requests: RequestCounts,
    pub total_violations: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_kind: BTreeMap<PolicyKind, usize>,
    pub summary: Vec<SummaryEntry>,
    pub violations: Vec<PolicyViolation>,
}

impl SimulationReport {
    /// Build a report; counts, summary and break level are derived from
    /// `violations`.
    pub fn new(
        generated_at: DateTime<Utc>,
        page_url: Option<String>,
        active_policies: Vec<ActivePolicy>,
        warnings: Vec<String>,
        requests: RequestCounts,
        violations: Vec<PolicyViolation>,
    ) -> Self {
        let mut by_severity: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_kind: BTreeMap<PolicyKind, usize> =
            PolicyKind::ALL.iter().map(|k| (*k, 0)).collect();

        for violation in &violations {
            *by_severity.entry(violation.severity).or_insert(0) += 1;
            *by_kind.entry(violation.policy_kind).or_insert(0) += 1;
        }

        let summary = summarize(&violations);
        let high = by_severity.get(&Severity::High).copied().unwrap_or(0);
        let break_level = BreakLevel::from_counts(high, violations.len());

        Self {
            generated_at,
            page_url,
            active_policies,
            warnings,
            break_level,
            requests,
            total_violations: violations.len(),
            by_severity,
            by_kind,
            summary,
            violations,
        }
    }

    pub fn to_json(&self) -> SimulatorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Plain-text rendering for humans.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Header Policy Simulator Report")?;
        writeln!(f, "{}", "=".repeat(40))?;
        writeln!(f, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "URL: {}", self.page_url.as_deref().unwrap_or("No page loaded"))?;
        writeln!(f)?;

        writeln!(f, "Active Policies:")?;
        if self.active_policies.is_empty() {
            writeln!(f, "  None")?;
        }
        for policy in &self.active_policies {
            match &policy.header {
                Some(header) => writeln!(f, "  - {}: {} ({})", policy.kind, policy.mode, header)?,
                None => writeln!(f, "  - {}: {}", policy.kind, policy.mode)?,
            }
        }
        for warning in &self.warnings {
            writeln!(f, "  ! {}", warning)?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "Break Level: {} - {}",
            self.break_level.name().to_uppercase(),
            self.break_level.description()
        )?;
        writeln!(
            f,
            "Requests: {} monitored, {} blocked",
            self.requests.monitored, self.requests.blocked
        )?;
        writeln!(
            f,
            "Violations: {} total ({} high, {} medium, {} low)",
            self.total_violations,
            self.count(Severity::High),
            self.count(Severity::Medium),
            self.count(Severity::Low)
        )?;
        for entry in &self.summary {
            writeln!(f, "  {} {}: {}", entry.policy_kind, entry.reason_code, entry.count)?;
        }
        writeln!(f)?;

        writeln!(f, "Violations:")?;
        for violation in &self.violations {
            writeln!(
                f,
                "  {} [{}] {}{}",
                violation.timestamp.format("%H:%M:%S"),
                violation.severity.name().to_uppercase(),
                violation.message,
                if violation.blocked { "" } else { " (report only)" }
            )?;
        }
        Ok(())
    }
}
