//! Resource types as declared by the interception point.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of sub-resource a page request fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Script (script-src).
    Script,
    /// Stylesheet (style-src).
    Style,
    /// Image (img-src).
    Image,
    /// Web font (font-src).
    Font,
    /// Audio or video (media-src).
    Media,
    /// Fetch / XMLHttpRequest.
    Xhr,
    /// Iframe or frame (frame-src).
    Frame,
    /// WebSocket connection.
    #[serde(rename = "websocket")]
    WebSocket,
    /// Anything else, including unknown kinds.
    Other,
}

impl ResourceType {
    /// All resource types in declaration order.
    pub const ALL: [ResourceType; 9] = [
        ResourceType::Script,
        ResourceType::Style,
        ResourceType::Image,
        ResourceType::Font,
        ResourceType::Media,
        ResourceType::Xhr,
        ResourceType::Frame,
        ResourceType::WebSocket,
        ResourceType::Other,
    ];

    /// Map a declared request kind to a resource type.
    ///
    /// Unknown kinds map to [`ResourceType::Other`].
    pub fn from_declared(kind: &str) -> Self {
        match kind.trim().to_lowercase().as_str() {
            "script" | "module" | "worker" | "serviceworker" | "sharedworker" => ResourceType::Script,
            "style" | "stylesheet" | "css" => ResourceType::Style,
            "image" | "img" | "favicon" | "imageset" => ResourceType::Image,
            "font" | "fontresource" | "font_resource" => ResourceType::Font,
            "media" | "audio" | "video" => ResourceType::Media,
            "xhr" | "fetch" | "xmlhttprequest" | "ping" | "beacon" => ResourceType::Xhr,
            "frame" | "iframe" | "subframe" | "sub_frame" => ResourceType::Frame,
            "websocket" | "ws" => ResourceType::WebSocket,
            _ => ResourceType::Other,
        }
    }

    /// Lowercase name of the resource type.
    pub fn name(&self) -> &'static str {
        match self {
            ResourceType::Script => "script",
            ResourceType::Style => "style",
            ResourceType::Image => "image",
            ResourceType::Font => "font",
            ResourceType::Media => "media",
            ResourceType::Xhr => "xhr",
            ResourceType::Frame => "frame",
            ResourceType::WebSocket => "websocket",
            ResourceType::Other => "other",
        }
    }

    /// Whether requests of this type are subject to CORS checks.
    pub fn is_connect(&self) -> bool {
        matches!(self, ResourceType::Xhr | ResourceType::WebSocket)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
