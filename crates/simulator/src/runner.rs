//! Trace playback and report rendering.

use clap::ValueEnum;
use common::SimulatorResult;
use policy_engine::{InterceptedRequest, RequestInterceptor, SimulationReport};
use tracing::debug;

/// Output format of the report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Decisions taken while playing a trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub allowed: usize,
    pub blocked: usize,
}

impl RunSummary {
    fn merge(self, other: RunSummary) -> RunSummary {
        RunSummary {
            allowed: self.allowed + other.allowed,
            blocked: self.blocked + other.blocked,
        }
    }
}

fn play(interceptor: &dyn RequestInterceptor, requests: &[InterceptedRequest]) -> RunSummary {
    let mut summary = RunSummary::default();
    for request in requests {
        if interceptor.intercept(request).is_allowed() {
            summary.allowed += 1;
        } else {
            summary.blocked += 1;
        }
    }
    summary
}

/// Feed every request to `interceptor`, spreading them over `workers` threads.
///
/// With a single worker requests are intercepted in trace order, so violation
/// ids follow the trace.
pub fn run(
    interceptor: &dyn RequestInterceptor,
    requests: &[InterceptedRequest],
    workers: usize,
) -> RunSummary {
    let workers = workers.max(1);
    if workers == 1 || requests.len() < 2 {
        return play(interceptor, requests);
    }

    let chunk_size = requests.len().div_ceil(workers);
    debug!("Playing {} requests on {} workers", requests.len(), workers);

    std::thread::scope(|s| {
        let handles: Vec<_> = requests
            .chunks(chunk_size)
            .map(|chunk| s.spawn(move || play(interceptor, chunk)))
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .fold(RunSummary::default(), RunSummary::merge)
    })
}

/// Render `report` in `format`.
pub fn render(report: &SimulationReport, format: ReportFormat) -> SimulatorResult<String> {
    match format {
        ReportFormat::Text => Ok(report.to_text()),
        ReportFormat::Json => report.to_json(),
    }
}
