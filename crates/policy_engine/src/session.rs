//! Simulation session and request interception.
//!
//! A [`PolicySimulator`] owns the configuration store and the violation log of
//! one simulation session. The host application calls
//! [`RequestInterceptor::intercept`] synchronously for every outgoing request
//! and cancels the request itself when the decision is [`Decision::Block`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::break_level::BreakLevel;
use crate::classifier::{classify, ClassifiedRequest};
use crate::config::{PolicyConfig, PolicyConfigStore, PolicyKind, PolicySettings};
use crate::evaluator::{evaluate, EvaluationResult};
use crate::log::ViolationLog;
use crate::report::{ActivePolicy, SimulationReport};
use crate::violation::PolicyViolation;
use crate::{csp, hsts};

/// A request as handed over by the interception point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptedRequest {
    /// Requested URL; `None` for inline script or style text.
    #[serde(default)]
    pub url: Option<String>,
    /// Origin of the issuing page; defaults to the session's page URL.
    #[serde(default)]
    pub initiator: Option<String>,
    /// Declared resource kind (`script`, `stylesheet`, `image`, ...).
    pub kind: String,
}

impl InterceptedRequest {
    pub fn new(url: &str, kind: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            initiator: None,
            kind: kind.to_string(),
        }
    }

    /// Inline content of the given kind.
    pub fn inline(kind: &str) -> Self {
        Self {
            url: None,
            initiator: None,
            kind: kind.to_string(),
        }
    }

    pub fn with_initiator(mut self, initiator: &str) -> Self {
        self.initiator = Some(initiator.to_string());
        self
    }
}

/// Whether the host should let a request proceed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Block,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Hook the host application's request interception calls into.
pub trait RequestInterceptor: Send + Sync {
    /// Decide synchronously whether `request` may proceed.
    fn intercept(&self, request: &InterceptedRequest) -> Decision;
}

/// Full result of processing one intercepted request.
#[derive(Clone, Debug)]
pub struct Outcome {
    pub decision: Decision,
    pub request: ClassifiedRequest,
    /// Violations appended to the log for this request.
    pub violations: Vec<Arc<PolicyViolation>>,
}

/// Monitored and blocked request counters.
#[derive(Debug, Default)]
struct RequestStats {
    monitored: AtomicU64,
    blocked: AtomicU64,
}

/// Point-in-time copy of the request counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RequestCounts {
    pub monitored: u64,
    pub blocked: u64,
}

/// One simulation session.
#[derive(Debug, Default)]
pub struct PolicySimulator {
    config: PolicyConfigStore,
    log: ViolationLog,
    page_url: RwLock<Option<String>>,
    stats: RequestStats,
    /// Shared while a request is recorded, exclusive while a report or reset
    /// touches the log and the counters together.
    recording: RwLock<()>,
}

impl PolicySimulator {
    /// Create a session with every policy disabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PolicyConfig) -> Self {
        Self {
            config: PolicyConfigStore::new(config),
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &PolicySettings) -> Self {
        let simulator = Self::default();
        simulator.config.replace(settings.to_config());
        *simulator.page_url.write() = settings.page_url.clone();
        simulator
    }

    /// Live configuration; changes apply to requests processed afterwards.
    pub fn config(&self) -> &PolicyConfigStore {
        &self.config
    }

    pub fn log(&self) -> &ViolationLog {
        &self.log
    }

    /// Record the page requests are issued from when they carry no initiator.
    pub fn set_page_url(&self, url: &str) {
        *self.page_url.write() = Some(url.to_string());
    }

    pub fn page_url(&self) -> Option<String> {
        self.page_url.read().clone()
    }

    /// Classify, evaluate and log one request.
    pub fn process(&self, request: &InterceptedRequest) -> Outcome {
        let initiator = match &request.initiator {
            Some(initiator) => initiator.clone(),
            None => self.page_url().unwrap_or_default(),
        };

        let classified = classify(request.url.as_deref(), &initiator, &request.kind);
        let config = self.config.snapshot();
        let EvaluationResult { allow, violations } = evaluate(&classified, &config);

        let _recording = self.recording.read();
        let violations = self.log.append_all(violations);

        self.stats.monitored.fetch_add(1, Ordering::Relaxed);
        let decision = if allow {
            Decision::Allow
        } else {
            self.stats.blocked.fetch_add(1, Ordering::Relaxed);
            Decision::Block
        };

        Outcome {
            decision,
            request: classified,
            violations,
        }
    }

    pub fn break_level(&self) -> BreakLevel {
        self.log.break_level()
    }

    pub fn request_counts(&self) -> RequestCounts {
        RequestCounts {
            monitored: self.stats.monitored.load(Ordering::Relaxed),
            blocked: self.stats.blocked.load(Ordering::Relaxed),
        }
    }

    /// Simulated `Content-Security-Policy` value; `None` when CSP is inactive.
    pub fn csp_header(&self) -> Option<&'static str> {
        self.config
            .snapshot()
            .active_mode(PolicyKind::Csp)
            .map(csp::header)
    }

    /// Simulated `Strict-Transport-Security` value; `None` when HSTS is inactive.
    pub fn hsts_header(&self) -> Option<&'static str> {
        self.config
            .snapshot()
            .active_mode(PolicyKind::Hsts)
            .map(hsts::header)
    }

    /// End the session: clear violations and request counters.
    pub fn reset(&self) {
        let _exclusive = self.recording.write();
        self.log.clear();
        self.stats.monitored.store(0, Ordering::Relaxed);
        self.stats.blocked.store(0, Ordering::Relaxed);
        info!("Simulation session reset");
    }

    /// Disable every policy and reset the session.
    pub fn reset_policies(&self) {
        self.config.disable_all();
        self.reset();
    }

    /// Everything a report exporter needs, captured now.
    pub fn report(&self) -> SimulationReport {
        let config = self.config.snapshot();
        let active_policies = config
            .active()
            .map(|(kind, mode)| ActivePolicy {
                kind,
                mode,
                header: match kind {
                    PolicyKind::Csp => Some(csp::header(mode).to_string()),
                    PolicyKind::Hsts => Some(hsts::header(mode).to_string()),
                    PolicyKind::Cors => None,
                },
            })
            .collect();

        let (snapshot, requests) = {
            let _exclusive = self.recording.write();
            (self.log.all(), self.request_counts())
        };
        let violations: Vec<PolicyViolation> =
            snapshot.iter().map(|v| PolicyViolation::clone(v)).collect();

        SimulationReport::new(
            Utc::now(),
            self.page_url(),
            active_policies,
            config.warnings().iter().map(ToString::to_string).collect(),
            requests,
            violations,
        )
    }
}

impl RequestInterceptor for PolicySimulator {
    fn intercept(&self, request: &InterceptedRequest) -> Decision {
        self.process(request).decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyMode;
    use crate::severity::{ReasonCode, Severity};

    #[test]
    fn test_intercept_strict_csp() {
        let simulator = PolicySimulator::with_config(
            PolicyConfig::new().with_policy(PolicyKind::Csp, PolicyMode::Strict),
        );
        let request = InterceptedRequest::new("https://cdn.test/x.js", "script")
            .with_initiator("https://a.test");

        assert_eq!(simulator.intercept(&request), Decision::Block);
        let logged = simulator.log().all();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].policy_kind, PolicyKind::Csp);
        assert_eq!(logged[0].severity, Severity::High);
        assert_eq!(simulator.request_counts(), RequestCounts { monitored: 1, blocked: 1 });
    }

    #[test]
    fn test_page_url_is_default_initiator() {
        let simulator = PolicySimulator::with_config(
            PolicyConfig::new().with_policy(PolicyKind::Csp, PolicyMode::Strict),
        );
        simulator.set_page_url("https://a.test/index.html");

        let outcome = simulator.process(&InterceptedRequest::new("/app.js", "script"));
        assert_eq!(outcome.decision, Decision::Allow);
        assert!(!outcome.request.is_cross_origin);

        let outcome = simulator.process(&InterceptedRequest::inline("script"));
        assert_eq!(outcome.decision, Decision::Block);
        assert_eq!(outcome.violations[0].reason_code, ReasonCode::CspScriptSrc);
    }

    #[test]
    fn test_config_change_is_not_retroactive() {
        let simulator = PolicySimulator::with_config(
            PolicyConfig::new().with_policy(PolicyKind::Csp, PolicyMode::ReportOnly),
        );
        let frame = InterceptedRequest::new("https://a.test/embed", "frame")
            .with_initiator("https://a.test");

        assert!(simulator.intercept(&frame).is_allowed());
        simulator.config().set(PolicyKind::Csp, true, PolicyMode::Basic);
        assert!(!simulator.intercept(&frame).is_allowed());

        let logged = simulator.log().all();
        assert!(!logged[0].blocked);
        assert!(logged[1].blocked);
    }

    #[test]
    fn test_reset_and_reset_policies() {
        let simulator = PolicySimulator::with_config(
            PolicyConfig::new().with_policy(PolicyKind::Hsts, PolicyMode::Basic),
        );
        simulator.intercept(&InterceptedRequest::new("http://a.test/", "other"));
        assert_eq!(simulator.break_level(), BreakLevel::Partial);

        simulator.reset();
        assert_eq!(simulator.break_level(), BreakLevel::Safe);
        assert_eq!(simulator.request_counts(), RequestCounts::default());
        assert_eq!(simulator.hsts_header(), Some("max-age=31536000"));

        simulator.reset_policies();
        assert_eq!(simulator.hsts_header(), None);
        assert!(simulator.intercept(&InterceptedRequest::new("http://a.test/", "other")).is_allowed());
    }

    #[test]
    fn test_headers_follow_mode() {
        let simulator = PolicySimulator::new();
        assert_eq!(simulator.csp_header(), None);

        simulator.config().enable(PolicyKind::Csp, PolicyMode::Strict);
        assert_eq!(simulator.csp_header(), Some(csp::STRICT_TEMPLATE));

        simulator.config().enable(PolicyKind::Hsts, PolicyMode::ReportOnly);
        assert_eq!(simulator.hsts_header(), None);
    }

    #[test]
    fn test_from_settings() {
        let settings = PolicySettings::new()
            .with_page_url("https://a.test/")
            .with_policy(PolicyKind::Cors, PolicyMode::Strict);
        let simulator = PolicySimulator::from_settings(&settings);

        assert_eq!(simulator.page_url().as_deref(), Some("https://a.test/"));
        let xhr = InterceptedRequest::new("https://fonts.googleapis.com/css", "xhr");
        assert_eq!(simulator.intercept(&xhr), Decision::Block);
    }

    #[test]
    fn test_intercept_as_trait_object() {
        let simulator: Arc<dyn RequestInterceptor> = Arc::new(PolicySimulator::new());
        let request = InterceptedRequest::new("http://evil.test/x.js", "script");
        assert_eq!(simulator.intercept(&request), Decision::Allow);
    }

    #[test]
    fn test_concurrent_interception() {
        let simulator = PolicySimulator::with_config(
            PolicyConfig::new()
                .with_policy(PolicyKind::Csp, PolicyMode::Strict)
                .with_policy(PolicyKind::Cors, PolicyMode::Basic),
        );
        simulator.set_page_url("https://a.test/");

        std::thread::scope(|s| {
            for worker in 0..4 {
                let simulator = &simulator;
                s.spawn(move || {
                    for i in 0..100 {
                        let url = format!("https://cdn{}.test/{}.js", worker, i);
                        simulator.intercept(&InterceptedRequest::new(&url, "script"));
                        simulator.intercept(&InterceptedRequest::new("/ok.css", "style"));
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..100 {
                    let _ = simulator.break_level();
                    let _ = simulator.log().count_total();
                }
            });
        });

        assert_eq!(simulator.log().count_total(), 400);
        assert_eq!(simulator.request_counts(), RequestCounts { monitored: 800, blocked: 400 });
        assert_eq!(simulator.break_level(), BreakLevel::Critical);
    }

    #[test]
    fn test_report_is_consistent_during_interception() {
        let simulator = PolicySimulator::with_config(
            PolicyConfig::new().with_policy(PolicyKind::Cors, PolicyMode::Strict),
        );
        simulator.set_page_url("https://a.test/");

        std::thread::scope(|s| {
            for worker in 0..4 {
                let simulator = &simulator;
                s.spawn(move || {
                    for i in 0..500 {
                        let url = format!("https://api{}.test/{}", worker, i);
                        simulator.intercept(&InterceptedRequest::new(&url, "xhr"));
                    }
                });
            }

            for _ in 0..200 {
                let report = simulator.report();
                let summarized: usize = report.summary.iter().map(|e| e.count).sum();
                assert_eq!(summarized, report.total_violations);
                assert_eq!(report.violations.len(), report.total_violations);
                assert_eq!(report.requests.blocked as usize, report.total_violations);
                assert_eq!(report.requests.monitored, report.requests.blocked);
            }
        });

        let report = simulator.report();
        assert_eq!(report.total_violations, 2000);
        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.summary[0].count, 2000);
    }
}
