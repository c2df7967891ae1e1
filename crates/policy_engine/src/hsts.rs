//! HTTP Strict Transport Security simulation.

use url::Url;

use crate::classifier::ClassifiedRequest;
use crate::config::PolicyMode;
use crate::severity::ReasonCode;
use crate::violation::ViolationDraft;

/// Header value simulated for `mode`.
pub fn header(mode: PolicyMode) -> &'static str {
    match mode {
        PolicyMode::Strict => "max-age=31536000; includeSubDomains; preload",
        PolicyMode::Basic | PolicyMode::ReportOnly => "max-age=31536000",
    }
}

/// Whether `mode` also covers subdomains (and is preload eligible).
///
/// Only affects report metadata, never the blocking decision.
pub fn covers_subdomains(mode: PolicyMode) -> bool {
    mode == PolicyMode::Strict
}

/// The `https` URL an HSTS-aware client would have requested instead.
pub fn upgrade_url(url: &str) -> Option<String> {
    let mut upgraded = Url::parse(url).ok()?;
    if upgraded.scheme() != "http" {
        return None;
    }
    upgraded.set_scheme("https").ok()?;
    Some(upgraded.to_string())
}

/// Any plain-`http` target is a downgrade, whatever the mode.
pub fn check(request: &ClassifiedRequest, mode: PolicyMode) -> Option<ViolationDraft> {
    if !request.targets_plain_http() {
        return None;
    }

    let coverage = if covers_subdomains(mode) {
        " (subdomains included, preload)"
    } else {
        ""
    };
    let message = match upgrade_url(&request.url) {
        Some(upgraded) => format!(
            "HSTS downgrade{}: {} must be requested as {}",
            coverage, request.url, upgraded
        ),
        None => format!("HSTS downgrade{}: {}", coverage, request.url),
    };

    Some(ViolationDraft::new(ReasonCode::HstsDowngrade, request, message))
}
