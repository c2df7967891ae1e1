//! Resource classification.
//!
//! Turns the raw `(url, initiator, declared kind)` triple supplied by the
//! interception point into a [`ClassifiedRequest`]. Classification never
//! fails: input that cannot be understood degrades to
//! [`ResourceType::Other`] and is treated as cross-origin.

use tracing::warn;
use url::Url;

use crate::origin::Origin;
use crate::resource::ResourceType;

/// Placeholder URL recorded for content that has no network location.
pub const INLINE_URL: &str = "inline";

/// A request after origin and resource-type analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedRequest {
    /// Requested URL as observed, or [`INLINE_URL`] for inline content.
    pub url: String,
    /// Origin of the page that issued the request.
    pub initiator_origin: Option<Origin>,
    /// Origin of the requested resource; `None` for inline, `data:` and
    /// other opaque targets.
    pub target_origin: Option<Origin>,
    pub resource_type: ResourceType,
    pub is_cross_origin: bool,
    /// Initiator is `https` while the target is plain `http`.
    pub is_mixed_content: bool,
    pub is_inline_or_data_uri: bool,
}

impl ClassifiedRequest {
    /// Whether the target is fetched over plain `http`.
    pub fn targets_plain_http(&self) -> bool {
        self.target_origin
            .as_ref()
            .is_some_and(Origin::is_plain_http)
    }

    fn degraded(url: &str, initiator_origin: Option<Origin>) -> Self {
        Self {
            url: url.to_string(),
            initiator_origin,
            target_origin: None,
            resource_type: ResourceType::Other,
            is_cross_origin: true,
            is_mixed_content: false,
            is_inline_or_data_uri: false,
        }
    }
}

/// Classify a request.
///
/// `url` is `None` (or blank) for inline script/style text. Relative URLs are
/// resolved against the initiator.
pub fn classify(url: Option<&str>, initiator: &str, declared_kind: &str) -> ClassifiedRequest {
    let initiator_url = Url::parse(initiator.trim()).ok();
    let initiator_origin = initiator_url.as_ref().and_then(Origin::from_url);
    let resource_type = ResourceType::from_declared(declared_kind);

    let raw = match url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(raw) => raw,
        None => {
            return ClassifiedRequest {
                url: INLINE_URL.to_string(),
                initiator_origin,
                target_origin: None,
                resource_type,
                is_cross_origin: false,
                is_mixed_content: false,
                is_inline_or_data_uri: true,
            };
        }
    };

    let target = match Url::parse(raw) {
        Ok(target) => target,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            match initiator_url.as_ref().and_then(|base| base.join(raw).ok()) {
                Some(resolved) => resolved,
                None => {
                    warn!("Unresolvable relative URL {:?}; classifying conservatively", raw);
                    return ClassifiedRequest::degraded(raw, initiator_origin);
                }
            }
        }
        Err(err) => {
            warn!("Unparseable URL {:?} ({}); classifying conservatively", raw, err);
            return ClassifiedRequest::degraded(raw, initiator_origin);
        }
    };

    if target.scheme() == "data" {
        return ClassifiedRequest {
            url: target.to_string(),
            initiator_origin,
            target_origin: None,
            resource_type,
            is_cross_origin: false,
            is_mixed_content: false,
            is_inline_or_data_uri: true,
        };
    }

    let target_origin = Origin::from_url(&target);

    let is_cross_origin = match (&initiator_origin, &target_origin) {
        (Some(initiator), Some(target)) => !initiator.is_same_origin(target),
        _ => true,
    };

    let is_mixed_content = match (&initiator_origin, &target_origin) {
        (Some(initiator), Some(target)) => initiator.scheme == "https" && target.is_plain_http(),
        _ => false,
    };

    ClassifiedRequest {
        url: target.to_string(),
        initiator_origin,
        target_origin,
        resource_type,
        is_cross_origin,
        is_mixed_content,
        is_inline_or_data_uri: false,
    }
}
