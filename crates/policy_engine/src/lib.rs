//! Security policy simulation.
//!
//! This crate simulates how a page would fare under HTTP security policies
//! without enforcing anything on the network:
//! - Content Security Policy (CSP) in basic, strict and report-only modes
//! - HTTP Strict Transport Security (HSTS) and mixed content blocking
//! - Cross-Origin Resource Sharing (CORS) for XHR/fetch and WebSocket
//!
//! Requests flow through [`classify`] and [`evaluate`], both pure. A
//! [`PolicySimulator`] session appends the resulting violations to its
//! [`ViolationLog`] and derives a [`BreakLevel`] on demand.

pub mod origin;
pub mod resource;
pub mod classifier;
pub mod config;
pub mod severity;
pub mod violation;
pub mod hsts;
pub mod mixed_content;
pub mod csp;
pub mod cors;
pub mod evaluator;
pub mod log;
pub mod break_level;
pub mod session;
pub mod report;

pub use origin::Origin;
pub use resource::ResourceType;
pub use classifier::{classify, ClassifiedRequest};
pub use config::{ConfigWarning, PolicyConfig, PolicyConfigStore, PolicyEntry, PolicyKind, PolicyMode, PolicySettings};
pub use severity::{ReasonCode, Severity};
pub use violation::{PolicyViolation, ViolationDraft};
pub use evaluator::{evaluate, EvaluationResult};
pub use log::{SummaryEntry, ViolationLog};
pub use break_level::BreakLevel;
pub use session::{Decision, InterceptedRequest, Outcome, PolicySimulator, RequestCounts, RequestInterceptor};
pub use report::{ActivePolicy, SimulationReport};
