//! Policy evaluation.
//!
//! Rules run in a fixed order: HSTS, mixed content, CSP, CORS. Each kind is
//! evaluated at most once per request and yields at most one violation. The
//! request is allowed unless one of the violations blocks.

use smallvec::SmallVec;
use tracing::debug;

use crate::classifier::ClassifiedRequest;
use crate::config::{PolicyConfig, PolicyKind};
use crate::violation::ViolationDraft;
use crate::{cors, csp, hsts, mixed_content};

/// Violations found for one request, in evaluation order.
pub type Violations = SmallVec<[ViolationDraft; 4]>;

/// Outcome of evaluating one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationResult {
    pub allow: bool,
    pub violations: Violations,
}

impl EvaluationResult {
    /// No rule matched.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// The violations that caused the request to be denied.
    pub fn blocking(&self) -> impl Iterator<Item = &ViolationDraft> {
        self.violations.iter().filter(|v| v.blocked)
    }
}

/// Evaluate a classified request against a configuration snapshot.
pub fn evaluate(request: &ClassifiedRequest, config: &PolicyConfig) -> EvaluationResult {
    let mut violations = Violations::new();

    if let Some(mode) = config.active_mode(PolicyKind::Hsts) {
        violations.extend(hsts::check(request, mode));
    }

    if config.any_active() {
        violations.extend(mixed_content::check(request));
    }

    if let Some(mode) = config.active_mode(PolicyKind::Csp) {
        violations.extend(csp::check(request, mode));
    }

    if let Some(mode) = config.active_mode(PolicyKind::Cors) {
        violations.extend(cors::check(request, mode));
    }

    let allow = !violations.iter().any(|v| v.blocked);
    debug!(
        "{} {} ({}): {} violation(s)",
        if allow { "allow" } else { "deny" },
        request.url,
        request.resource_type,
        violations.len()
    );

    EvaluationResult { allow, violations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::config::PolicyMode;
    use crate::resource::ResourceType;
    use crate::severity::{ReasonCode, Severity};

    fn reasons(result: &EvaluationResult) -> Vec<ReasonCode> {
        result.violations.iter().map(|v| v.reason_code).collect()
    }

    #[test]
    fn test_no_policies_allows_everything() {
        let config = PolicyConfig::new();
        let req = classify(Some("http://evil.test/x.js"), "https://a.test", "script");
        let result = evaluate(&req, &config);
        assert!(result.allow);
        assert!(result.is_clean());
    }

    #[test]
    fn test_csp_strict_cross_origin_script() {
        let config = PolicyConfig::new().with_policy(PolicyKind::Csp, PolicyMode::Strict);
        let req = classify(Some("https://cdn.test/x.js"), "https://a.test", "script");
        let result = evaluate(&req, &config);

        assert!(!result.allow);
        assert_eq!(result.violations.len(), 1);
        let violation = &result.violations[0];
        assert_eq!(violation.policy_kind, PolicyKind::Csp);
        assert_eq!(violation.severity, Severity::High);
        assert_eq!(violation.resource_type, ResourceType::Script);
    }

    #[test]
    fn test_cors_basic_allows_listed_cdn() {
        let config = PolicyConfig::new().with_policy(PolicyKind::Cors, PolicyMode::Basic);
        let req = classify(Some("https://fonts.googleapis.com/css"), "https://a.test", "xhr");
        let result = evaluate(&req, &config);
        assert!(result.allow);
        assert!(result.is_clean());
    }

    #[test]
    fn test_hsts_blocks_http_in_every_mode() {
        for mode in [PolicyMode::Basic, PolicyMode::Strict] {
            let config = PolicyConfig::new().with_policy(PolicyKind::Hsts, mode);
            let req = classify(Some("http://a.test/page"), "http://a.test", "other");
            let result = evaluate(&req, &config);
            assert!(!result.allow);
            assert_eq!(reasons(&result), vec![ReasonCode::HstsDowngrade]);
        }
    }

    #[test]
    fn test_mixed_content_under_any_policy() {
        let req = classify(Some("http://cdn.test/img.png"), "https://a.test", "image");

        for mode in [PolicyMode::Basic, PolicyMode::Strict, PolicyMode::ReportOnly] {
            let config = PolicyConfig::new().with_policy(PolicyKind::Csp, mode);
            let result = evaluate(&req, &config);
            assert!(!result.allow);
            assert!(reasons(&result).contains(&ReasonCode::MixedContent));
        }

        let config = PolicyConfig::new().with_policy(PolicyKind::Cors, PolicyMode::Basic);
        assert_eq!(reasons(&evaluate(&req, &config)), vec![ReasonCode::MixedContent]);
    }

    #[test]
    fn test_mixed_content_requires_an_active_policy() {
        let req = classify(Some("http://cdn.test/img.png"), "https://a.test", "image");
        let config = PolicyConfig::new().with_policy(PolicyKind::Hsts, PolicyMode::ReportOnly);
        let result = evaluate(&req, &config);
        assert!(result.allow);
        assert!(result.is_clean());
    }

    #[test]
    fn test_multiple_kinds_in_order() {
        let config = PolicyConfig::new()
            .with_policy(PolicyKind::Csp, PolicyMode::Strict)
            .with_policy(PolicyKind::Hsts, PolicyMode::Basic)
            .with_policy(PolicyKind::Cors, PolicyMode::Strict);

        let req = classify(Some("http://cdn.test/x.js"), "https://a.test", "script");
        assert_eq!(
            reasons(&evaluate(&req, &config)),
            vec![ReasonCode::HstsDowngrade, ReasonCode::MixedContent, ReasonCode::CspScriptSrc]
        );

        let req = classify(Some("https://api.test/data"), "https://a.test", "xhr");
        assert_eq!(reasons(&evaluate(&req, &config)), vec![ReasonCode::CorsBlocked]);
    }

    #[test]
    fn test_report_only_allows_but_records() {
        let config = PolicyConfig::new().with_policy(PolicyKind::Csp, PolicyMode::ReportOnly);
        let req = classify(Some("https://a.test/embed"), "https://a.test", "frame");
        let result = evaluate(&req, &config);

        assert!(result.allow);
        assert_eq!(reasons(&result), vec![ReasonCode::CspFrameSrc]);
        assert_eq!(result.blocking().count(), 0);

        let basic = PolicyConfig::new().with_policy(PolicyKind::Csp, PolicyMode::Basic);
        let basic_result = evaluate(&req, &basic);
        assert!(!basic_result.allow);
        assert_eq!(basic_result.violations[0].severity, result.violations[0].severity);
    }

    #[test]
    fn test_report_only_does_not_hide_other_blocks() {
        let config = PolicyConfig::new().with_policy(PolicyKind::Csp, PolicyMode::ReportOnly);
        let req = classify(Some("http://a.test/embed"), "https://a.test", "frame");
        let result = evaluate(&req, &config);

        assert!(!result.allow);
        assert_eq!(result.blocking().count(), 1);
        assert_eq!(reasons(&result), vec![ReasonCode::MixedContent, ReasonCode::CspFrameSrc]);
    }

    #[test]
    fn test_disabled_policy_not_evaluated() {
        let mut config = PolicyConfig::new().with_policy(PolicyKind::Csp, PolicyMode::Strict);
        config.set(
            PolicyKind::Csp,
            crate::config::PolicyEntry::disabled(PolicyMode::Strict),
        );
        let req = classify(Some("https://cdn.test/x.js"), "https://a.test", "script");
        assert!(evaluate(&req, &config).allow);
    }

    #[test]
    fn test_removed_policy_not_evaluated() {
        let mut config = PolicyConfig::new().with_policy(PolicyKind::Cors, PolicyMode::Strict);
        let req = classify(Some("https://api.test/data"), "https://a.test", "xhr");
        assert!(!evaluate(&req, &config).allow);

        config.remove(PolicyKind::Cors);
        assert_eq!(config.get(PolicyKind::Cors), None);
        assert!(!config.any_active());

        let result = evaluate(&req, &config);
        assert!(result.allow);
        assert!(result.is_clean());
    }
}
