//! Header policy simulator - replays a request trace against simulated
//! CSP, HSTS and CORS policies and reports what would break.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use policy_engine::{PolicyKind, PolicyMode, PolicySettings, PolicySimulator};
use simulator::{read_trace, render, run, ReportFormat};

/// Simulate security header policies against a recorded request trace
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Trace file to replay (reads stdin when omitted)
    trace: Option<PathBuf>,

    /// Policy settings file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable CSP in the given mode (basic, strict, report-only)
    #[arg(long)]
    csp: Option<PolicyMode>,

    /// Enable HSTS in the given mode
    #[arg(long)]
    hsts: Option<PolicyMode>,

    /// Enable CORS in the given mode
    #[arg(long)]
    cors: Option<PolicyMode>,

    /// Page the trace was recorded on
    #[arg(long)]
    page_url: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of interception threads
    #[arg(long, default_value = "1")]
    workers: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Settings file, overridden by command line flags.
    fn settings(&self) -> Result<PolicySettings> {
        let mut settings = match &self.config {
            Some(path) => PolicySettings::from_json_file(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => PolicySettings::new(),
        };

        for (kind, mode) in [
            (PolicyKind::Csp, self.csp),
            (PolicyKind::Hsts, self.hsts),
            (PolicyKind::Cors, self.cors),
        ] {
            if let Some(mode) = mode {
                settings = settings.with_policy(kind, mode);
            }
        }

        if let Some(page_url) = &self.page_url {
            settings = settings.with_page_url(page_url);
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so the report can be piped
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Header policy simulator v{}", simulator::VERSION);

    let settings = args.settings()?;
    let session = PolicySimulator::from_settings(&settings);
    for warning in session.config().warnings() {
        warn!("{}", warning);
    }

    let requests = read_trace(args.trace.as_deref()).context("reading trace")?;
    info!("Replaying {} requests", requests.len());

    let summary = run(&session, &requests, args.workers);
    info!(
        "{} allowed, {} blocked, break level {}",
        summary.allowed,
        summary.blocked,
        session.break_level()
    );

    let report = render(&session.report(), args.format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &report)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!("Report saved to: {}", path.display());
        }
        None => print!("{}", report),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default() {
        let args = Args::parse_from(["header-policy-sim"]);
        assert!(args.trace.is_none());
        assert!(args.csp.is_none());
        assert_eq!(args.format, ReportFormat::Text);
        assert_eq!(args.workers, 1);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_policy_flags() {
        let args = Args::parse_from([
            "header-policy-sim",
            "trace.txt",
            "--csp",
            "report-only",
            "--hsts",
            "strict",
            "--page-url",
            "https://a.test/",
            "--format",
            "json",
        ]);
        assert_eq!(args.trace, Some(PathBuf::from("trace.txt")));
        assert_eq!(args.csp, Some(PolicyMode::ReportOnly));
        assert_eq!(args.hsts, Some(PolicyMode::Strict));
        assert_eq!(args.format, ReportFormat::Json);

        let settings = args.settings().unwrap();
        assert_eq!(settings.page_url.as_deref(), Some("https://a.test/"));
        assert!(settings.cors.is_none());
        assert_eq!(settings.hsts.map(|e| e.mode), Some(PolicyMode::Strict));
    }

    #[test]
    fn test_args_reject_unknown_mode() {
        assert!(Args::try_parse_from(["header-policy-sim", "--csp", "paranoid"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"page_url": "https://a.test/", "csp": {"enabled": true, "mode": "basic"}}"#,
        )
        .unwrap();

        let args = Args::parse_from([
            "header-policy-sim",
            "--config",
            path.to_str().unwrap(),
            "--csp",
            "strict",
        ]);
        let settings = args.settings().unwrap();
        assert_eq!(settings.csp.map(|e| e.mode), Some(PolicyMode::Strict));
        assert_eq!(settings.page_url.as_deref(), Some("https://a.test/"));
    }

    #[test]
    fn test_invalid_page_url() {
        let args = Args::parse_from(["header-policy-sim", "--page-url", "not a url"]);
        assert!(args.settings().is_err());
    }
}
