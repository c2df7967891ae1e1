//! Mixed content detection.

use crate::classifier::ClassifiedRequest;
use crate::severity::ReasonCode;
use crate::violation::ViolationDraft;

/// A plain-`http` sub-resource of an `https` page is always blocked.
pub fn check(request: &ClassifiedRequest) -> Option<ViolationDraft> {
    if !request.is_mixed_content {
        return None;
    }

    Some(ViolationDraft::new(
        ReasonCode::MixedContent,
        request,
        format!("Mixed content blocked: {}", request.url),
    ))
}
