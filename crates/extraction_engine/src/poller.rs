use extraction_core::{PollOutcome, PollPolicy, PollStep, PollTracker, ProcessingJob, StatusReport};
use pipeline_logging::{pipeline_debug, pipeline_info, pipeline_warn};
use tokio_util::sync::CancellationToken;

use crate::{ApiError, EngineEvent, EventSink, ExtractionBackend};

/// Waits for one processing job to finish by polling its status.
///
/// Polls are serial: each one starts `policy.interval` after the previous
/// answer arrived, and at most `policy.max_attempts` are issued. `stop()`
/// cancels the pending timer or in-flight request. After that no more polls
/// are reported for the job; only a final `PollFinished` with
/// [`PollOutcome::Cancelled`] is emitted.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl StatusPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            cancel: CancellationToken::new(),
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Polls until the job finishes, the attempt budget runs out, or `stop()`.
    ///
    /// `on_report` sees every status answer before the next poll is scheduled;
    /// returning `false` abandons the wait as cancelled. A failed status
    /// request ends the wait with the error.
    pub async fn run<F>(
        &self,
        backend: &dyn ExtractionBackend,
        job: &ProcessingJob,
        sink: &dyn EventSink,
        mut on_report: F,
    ) -> Result<PollOutcome, ApiError>
    where
        F: FnMut(StatusReport) -> bool + Send,
    {
        let mut tracker = PollTracker::new(self.policy);
        let mut step = tracker.start(job.status());

        let outcome = loop {
            let (attempt, delay) = match step {
                PollStep::Finished(outcome) => break outcome,
                PollStep::Wait { attempt, delay } => (attempt, delay),
            };

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break tracker.cancel(),
                _ = tokio::time::sleep(delay) => {}
            }

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break tracker.cancel(),
                result = backend.job_status(job.project_id, job.id) => result,
            };
            let report = match result {
                Ok(report) => report,
                Err(err) => {
                    pipeline_warn!(
                        "Status check {} for job {} failed: {}",
                        attempt,
                        job.id,
                        err
                    );
                    return Err(err);
                }
            };

            if self.is_stopped() {
                break tracker.cancel();
            }
            pipeline_debug!(
                "Poll {}/{} for job {}: {}",
                attempt,
                self.policy.max_attempts,
                job.id,
                report.status.label()
            );
            sink.emit(EngineEvent::Polled {
                job_id: job.id,
                attempt,
                max_attempts: self.policy.max_attempts,
                status: report.status.clone(),
            });

            let status = report.status.clone();
            if !on_report(report) {
                break tracker.cancel();
            }
            step = tracker.record(&status);
        };

        match &outcome {
            PollOutcome::Completed {
                extracted_tasks_count,
            } => pipeline_info!(
                "Job {} completed with {} extracted tasks",
                job.id,
                extracted_tasks_count
            ),
            PollOutcome::Failed { error_message } => {
                pipeline_warn!("Job {} failed: {}", job.id, error_message)
            }
            PollOutcome::TimedOut { attempts } => pipeline_warn!(
                "Job {} still running after {} status checks; giving up",
                job.id,
                attempts
            ),
            PollOutcome::Cancelled => pipeline_info!("Stopped polling job {}", job.id),
        }
        sink.emit(EngineEvent::PollFinished {
            job_id: job.id,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }
}
