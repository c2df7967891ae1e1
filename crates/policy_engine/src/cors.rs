//! Cross-Origin Resource Sharing simulation.
//!
//! Only connection-style requests (XHR/fetch and WebSocket) are subject to
//! CORS here; sub-resources such as scripts and images are left to CSP.

use crate::classifier::ClassifiedRequest;
use crate::config::PolicyMode;
use crate::origin::Origin;
use crate::severity::ReasonCode;
use crate::violation::ViolationDraft;

/// CDN hosts basic mode lets through.
pub const CDN_ALLOW_LIST: [&str; 3] = [
    "fonts.googleapis.com",
    "cdnjs.cloudflare.com",
    "ajax.googleapis.com",
];

/// Whether `origin` is one of the allow-listed CDNs.
pub fn is_allow_listed(origin: &Origin) -> bool {
    CDN_ALLOW_LIST.contains(&origin.host.as_str())
}

/// Evaluate a cross-origin connection against the CORS mode.
pub fn check(request: &ClassifiedRequest, mode: PolicyMode) -> Option<ViolationDraft> {
    if !request.is_cross_origin || !request.resource_type.is_connect() {
        return None;
    }

    let allow_listed = request.target_origin.as_ref().is_some_and(is_allow_listed);
    if mode == PolicyMode::Basic && allow_listed {
        return None;
    }

    let from = request
        .initiator_origin
        .as_ref()
        .map(Origin::serialize)
        .unwrap_or_else(|| "unknown origin".to_string());

    Some(ViolationDraft::new(
        ReasonCode::CorsBlocked,
        request,
        format!("CORS blocked request from {} to {}", from, request.url),
    ))
}
