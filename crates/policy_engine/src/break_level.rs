//! Site breakage classification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::log::ViolationLog;
use crate::severity::Severity;

/// High-severity violations that make a page critically broken.
pub const CRITICAL_HIGH_THRESHOLD: usize = 3;
/// Total violations that make a page critically broken.
pub const CRITICAL_TOTAL_THRESHOLD: usize = 10;
pub const PARTIAL_HIGH_THRESHOLD: usize = 1;
pub const PARTIAL_TOTAL_THRESHOLD: usize = 3;

/// How badly the simulated policies break the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakLevel {
    Safe,
    Partial,
    Critical,
}

impl BreakLevel {
    /// Classify from violation counts. Checked most severe first.
    pub fn from_counts(high: usize, total: usize) -> Self {
        if high >= CRITICAL_HIGH_THRESHOLD || total >= CRITICAL_TOTAL_THRESHOLD {
            BreakLevel::Critical
        } else if high >= PARTIAL_HIGH_THRESHOLD || total >= PARTIAL_TOTAL_THRESHOLD {
            BreakLevel::Partial
        } else {
            BreakLevel::Safe
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BreakLevel::Safe => "safe",
            BreakLevel::Partial => "partial",
            BreakLevel::Critical => "critical",
        }
    }

    /// One-line explanation for status displays.
    pub fn description(&self) -> &'static str {
        match self {
            BreakLevel::Safe => "No critical policy violations",
            BreakLevel::Partial => "Some functionality may be affected",
            BreakLevel::Critical => "Site functionality severely impacted",
        }
    }
}

impl fmt::Display for BreakLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify the log's current contents.
pub fn classify(log: &ViolationLog) -> BreakLevel {
    BreakLevel::from_counts(log.count_by_severity(Severity::High), log.count_total())
}
