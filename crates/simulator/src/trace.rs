//! Request trace parsing.
//!
//! A trace holds one request per line, either as a JSON object
//!
//! ```text
//! {"url": "https://cdn.test/x.js", "kind": "script", "initiator": "https://a.test"}
//! ```
//!
//! or in the short form `<kind> [url] [initiator]`, where a missing url (or
//! `-`) means inline content. Blank lines and lines starting with `#` are
//! ignored.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use common::{SimulatorError, SimulatorResult};
use policy_engine::InterceptedRequest;

/// Parse a trace from any buffered reader.
pub fn parse_trace(reader: impl BufRead) -> SimulatorResult<Vec<InterceptedRequest>> {
    let mut requests = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let number = index + 1;
        let request = if line.starts_with('{') {
            serde_json::from_str(line)
                .map_err(|err| SimulatorError::malformed_trace(number, err.to_string()))?
        } else {
            parse_short_form(line, number)?
        };
        requests.push(request);
    }

    Ok(requests)
}

fn parse_short_form(line: &str, number: usize) -> SimulatorResult<InterceptedRequest> {
    let mut fields = line.split_whitespace();
    let kind = fields
        .next()
        .ok_or_else(|| SimulatorError::malformed_trace(number, "missing resource kind"))?;
    let url = fields.next().filter(|url| *url != "-");
    let initiator = fields.next();

    if fields.next().is_some() {
        return Err(SimulatorError::malformed_trace(number, "too many fields"));
    }

    Ok(InterceptedRequest {
        url: url.map(str::to_string),
        initiator: initiator.map(str::to_string),
        kind: kind.to_string(),
    })
}

/// Read a trace from `path`, or from stdin when no path is given.
pub fn read_trace(path: Option<&Path>) -> SimulatorResult<Vec<InterceptedRequest>> {
    match path {
        Some(path) => parse_trace(BufReader::new(File::open(path)?)),
        None => parse_trace(io::stdin().lock()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_forms() {
        let trace = r#"
# page load
{"url": "https://cdn.test/x.js", "kind": "script", "initiator": "https://a.test"}
style
image https://a.test/logo.png
xhr https://api.test/data https://b.test
script - https://a.test
"#;
        let requests = parse_trace(trace.as_bytes()).unwrap();
        assert_eq!(requests.len(), 5);

        assert_eq!(requests[0].url.as_deref(), Some("https://cdn.test/x.js"));
        assert_eq!(requests[0].initiator.as_deref(), Some("https://a.test"));
        assert_eq!(requests[1], InterceptedRequest::inline("style"));
        assert_eq!(requests[2], InterceptedRequest::new("https://a.test/logo.png", "image"));
        assert_eq!(requests[3].initiator.as_deref(), Some("https://b.test"));
        assert_eq!(requests[4].url, None);
        assert_eq!(requests[4].initiator.as_deref(), Some("https://a.test"));
    }

    #[test]
    fn test_json_inline_request() {
        let requests = parse_trace(r#"{"kind": "script"}"#.as_bytes()).unwrap();
        assert_eq!(requests, vec![InterceptedRequest::inline("script")]);
    }

    #[test]
    fn test_malformed_lines_report_line_number() {
        let err = parse_trace("script https://a.test/x.js\n{\"url\": 1}\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SimulatorError::MalformedTrace { line: 2, .. }));

        let err = parse_trace("\nscript a b c\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SimulatorError::MalformedTrace { line: 2, .. }));
    }

    #[test]
    fn test_read_trace_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.txt");
        std::fs::write(&path, "script https://cdn.test/x.js\nfont https://a.test/f.woff\n").unwrap();

        let requests = read_trace(Some(&path)).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].kind, "font");
    }

    #[test]
    fn test_missing_file() {
        let err = read_trace(Some(Path::new("/nonexistent/trace.txt"))).unwrap_err();
        assert!(matches!(err, SimulatorError::Io(_)));
    }
}
