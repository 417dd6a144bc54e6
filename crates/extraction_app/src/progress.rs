use extraction_core::{BatchKind, PollOutcome};
use extraction_engine::{EngineEvent, EventSink};

/// Prints engine progress to stderr so stdout only carries results.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl EventSink for ConsoleProgress {
    fn emit(&self, event: EngineEvent) {
        if let Some(line) = describe(&event) {
            eprintln!("{line}");
        }
    }
}

pub fn describe(event: &EngineEvent) -> Option<String> {
    match event {
        EngineEvent::Submitted { job_id, status, .. } => {
            Some(format!("job {job_id}: {}", status.label()))
        }
        EngineEvent::Polled {
            job_id,
            attempt,
            max_attempts,
            status,
        } => Some(format!(
            "job {job_id}: {} (check {attempt}/{max_attempts})",
            status.label()
        )),
        EngineEvent::PollFinished { job_id, outcome } => match outcome {
            PollOutcome::Cancelled => Some(format!("job {job_id}: stopped waiting")),
            _ => None,
        },
        EngineEvent::SuggestionsLoaded { pruned: 0, .. } => None,
        EngineEvent::SuggestionsLoaded { pruned, .. } => Some(format!(
            "{pruned} selected suggestion(s) are no longer pending and were dropped"
        )),
        EngineEvent::BatchFinished {
            kind,
            suggestion_ids,
            result: Err(failure),
            ..
        } => Some(format!(
            "{} of {} suggestion(s) failed: {failure}",
            match kind {
                BatchKind::Accept => "accepting",
                BatchKind::Reject => "rejecting",
            },
            suggestion_ids.len()
        )),
        EngineEvent::BatchFinished { .. } => None,
    }
}
