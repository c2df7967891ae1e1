//! Origin model used for same-origin and mixed-content decisions.

use std::fmt;
use url::Url;

/// Represents an origin (scheme, host, port tuple).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Origin {
    /// Derive the origin of a URL.
    ///
    /// Returns `None` for schemes with opaque origins (`data:`, `blob:`,
    /// `file:`, `javascript:`) and for URLs without a host.
    pub fn from_url(url: &Url) -> Option<Self> {
        let scheme = url.scheme().to_lowercase();

        if matches!(scheme.as_str(), "data" | "file" | "blob" | "javascript") {
            return None;
        }

        let host = url.host_str()?.to_lowercase();
        let port = url.port_or_known_default();

        Some(Self { scheme, host, port })
    }

    /// Parse an origin from a string URL.
    pub fn parse(url_str: &str) -> Option<Self> {
        let url = Url::parse(url_str).ok()?;
        Self::from_url(&url)
    }

    /// Exact scheme, host and effective port comparison.
    pub fn is_same_origin(&self, other: &Origin) -> bool {
        self.scheme == other.scheme
            && self.host == other.host
            && self.effective_port() == other.effective_port()
    }

    /// Get the effective port (using default ports for known schemes).
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| match self.scheme.as_str() {
            "http" | "ws" => 80,
            "https" | "wss" => 443,
            _ => 0,
        })
    }

    /// Whether the origin uses plain `http`.
    pub fn is_plain_http(&self) -> bool {
        self.scheme == "http"
    }

    /// Serialize the origin to a string.
    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default_port = match self.scheme.as_str() {
            "http" | "ws" => Some(80),
            "https" | "wss" => Some(443),
            _ => None,
        };

        match self.port {
            Some(port) if Some(port) != default_port => {
                write!(f, "{}://{}:{}", self.scheme, self.host, port)
            }
            _ => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}
