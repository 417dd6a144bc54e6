use std::time::Duration;

use crate::JobStatus;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

/// How often and how long to wait for a job to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    /// Longest time the client waits before giving up.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// How a wait for a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { extracted_tasks_count: u32 },
    Failed { error_message: String },
    /// The attempt budget ran out; the server may still finish the job.
    TimedOut { attempts: u32 },
    /// Polling was torn down before the job finished.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    /// Wait `delay`, then issue poll number `attempt`.
    Wait { attempt: u32, delay: Duration },
    Finished(PollOutcome),
}

/// Counts status polls for one job and decides when to stop.
///
/// Polls are strictly serial: the tracker hands out the next attempt only
/// after the previous result was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTracker {
    policy: PollPolicy,
    attempts: u32,
    outcome: Option<PollOutcome>,
}

impl PollTracker {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            outcome: None,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Status polls recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn outcome(&self) -> Option<&PollOutcome> {
        self.outcome.as_ref()
    }

    /// First step for a job in `initial` state, as returned by the upload.
    pub fn start(&mut self, initial: &JobStatus) -> PollStep {
        if let Some(outcome) = terminal_outcome(initial) {
            return self.finish(outcome);
        }
        self.next_wait()
    }

    /// Records the status returned by the latest poll.
    pub fn record(&mut self, status: &JobStatus) -> PollStep {
        if let Some(outcome) = &self.outcome {
            return PollStep::Finished(outcome.clone());
        }
        self.attempts += 1;
        if let Some(outcome) = terminal_outcome(status) {
            return self.finish(outcome);
        }
        self.next_wait()
    }

    /// Marks the wait as abandoned. Has no effect once an outcome is known.
    pub fn cancel(&mut self) -> PollOutcome {
        self.outcome.get_or_insert(PollOutcome::Cancelled).clone()
    }

    fn next_wait(&mut self) -> PollStep {
        if self.attempts >= self.policy.max_attempts {
            return self.finish(PollOutcome::TimedOut {
                attempts: self.attempts,
            });
        }
        PollStep::Wait {
            attempt: self.attempts + 1,
            delay: self.policy.interval,
        }
    }

    fn finish(&mut self, outcome: PollOutcome) -> PollStep {
        self.outcome = Some(outcome.clone());
        PollStep::Finished(outcome)
    }
}

fn terminal_outcome(status: &JobStatus) -> Option<PollOutcome> {
    match status {
        JobStatus::Completed {
            extracted_tasks_count,
        } => Some(PollOutcome::Completed {
            extracted_tasks_count: *extracted_tasks_count,
        }),
        JobStatus::Failed { error_message } => Some(PollOutcome::Failed {
            error_message: error_message.clone(),
        }),
        JobStatus::Pending | JobStatus::Processing => None,
    }
}
