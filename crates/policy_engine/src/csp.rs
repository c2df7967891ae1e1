//! Content Security Policy simulation.
//!
//! Each mode stands for one of the policy templates below; the rule functions
//! encode what that template would block for a classified request.
//!
//! | mode        | blocks                                                                |
//! |-------------|-----------------------------------------------------------------------|
//! | basic       | frames                                                                |
//! | strict      | frames, cross-origin or inline script/style, cross-origin img/font/media |
//! | report-only | same as basic, logged but never blocked                               |

use crate::classifier::ClassifiedRequest;
use crate::config::PolicyMode;
use crate::resource::ResourceType;
use crate::severity::ReasonCode;
use crate::violation::ViolationDraft;

pub const BASIC_TEMPLATE: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; frame-src 'none';";

pub const STRICT_TEMPLATE: &str = "default-src 'self'; script-src 'self'; style-src 'self'; img-src 'self' data:; connect-src 'self'; font-src 'self'; object-src 'none'; media-src 'self'; frame-src 'none';";

pub const REPORT_ONLY_TEMPLATE: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; frame-src 'none'; report-uri /csp-report";

/// Header value simulated for `mode`.
pub fn header(mode: PolicyMode) -> &'static str {
    match mode {
        PolicyMode::Basic => BASIC_TEMPLATE,
        PolicyMode::Strict => STRICT_TEMPLATE,
        PolicyMode::ReportOnly => REPORT_ONLY_TEMPLATE,
    }
}

/// Name of the header carrying the policy in `mode`.
pub fn header_name(mode: PolicyMode) -> &'static str {
    match mode {
        PolicyMode::ReportOnly => "Content-Security-Policy-Report-Only",
        _ => "Content-Security-Policy",
    }
}

/// Evaluate `request` against the CSP template for `mode`.
pub fn check(request: &ClassifiedRequest, mode: PolicyMode) -> Option<ViolationDraft> {
    let reason = match mode {
        PolicyMode::Strict => strict_violation(request),
        PolicyMode::Basic | PolicyMode::ReportOnly => basic_violation(request),
    }?;

    let directive = reason.directive().unwrap_or("default-src");
    let draft = ViolationDraft::new(
        reason,
        request,
        format!("CSP violation: {} blocked {}", directive, request.url),
    );

    Some(match mode {
        PolicyMode::ReportOnly => draft.report_only(),
        _ => draft,
    })
}

/// `'unsafe-inline'` is allowed and only `frame-src 'none'` can fire.
fn basic_violation(request: &ClassifiedRequest) -> Option<ReasonCode> {
    match request.resource_type {
        ResourceType::Frame => Some(ReasonCode::CspFrameSrc),
        _ => None,
    }
}

fn strict_violation(request: &ClassifiedRequest) -> Option<ReasonCode> {
    let not_self = request.is_cross_origin || request.is_inline_or_data_uri;

    match request.resource_type {
        ResourceType::Script if not_self => Some(ReasonCode::CspScriptSrc),
        ResourceType::Style if not_self => Some(ReasonCode::CspStyleSrc),
        ResourceType::Frame => Some(ReasonCode::CspFrameSrc),
        ResourceType::Font if request.is_cross_origin => Some(ReasonCode::CspFontSrc),
        ResourceType::Media if request.is_cross_origin => Some(ReasonCode::CspMediaSrc),
        // img-src 'self' data:
        ResourceType::Image if request.is_cross_origin => Some(ReasonCode::CspImgSrc),
        _ => None,
    }
}
