//! Header policy simulator driver.
//!
//! Plays a recorded request trace through a [`policy_engine::PolicySimulator`]
//! session the way a browser's request interceptor would, then renders the
//! session report.

pub mod trace;
pub mod runner;

pub use runner::{render, run, ReportFormat, RunSummary};
pub use trace::{parse_trace, read_trace};

/// Simulator version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
