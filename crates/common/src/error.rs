//! Common error types.

use thiserror::Error;

/// Errors raised at the edges of the simulator: user-supplied names,
/// configuration files, request traces and report output.
///
/// Request evaluation itself never fails.
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Unknown policy kind: {0}")]
    UnknownPolicyKind(String),

    #[error("Unknown policy mode: {0}")]
    UnknownPolicyMode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Malformed trace entry at line {line}: {reason}")]
    MalformedTrace { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type SimulatorResult<T> = Result<T, SimulatorError>;

impl SimulatorError {
    pub fn unknown_kind(name: impl Into<String>) -> Self {
        Self::UnknownPolicyKind(name.into())
    }

    pub fn unknown_mode(name: impl Into<String>) -> Self {
        Self::UnknownPolicyMode(name.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn malformed_trace(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedTrace {
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SimulatorError::unknown_mode("paranoid").to_string(),
            "Unknown policy mode: paranoid"
        );
        assert_eq!(
            SimulatorError::malformed_trace(3, "missing url").to_string(),
            "Malformed trace entry at line 3: missing url"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SimulatorError = io.into();
        assert!(matches!(err, SimulatorError::Io(_)));
    }
}
