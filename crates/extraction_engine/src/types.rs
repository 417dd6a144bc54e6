use std::fmt;

use extraction_core::{
    BatchKind, JobId, JobStatus, PollOutcome, ProjectId, SuggestionId, TriageError,
    ValidationError,
};
use thiserror::Error;

/// Transport or HTTP failure talking to the extraction backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "unexpected response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Everything a [`PipelineSession`](crate::PipelineSession) call can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("processing failed: {message}")]
    ServerProcessing { message: String },
    #[error(
        "processing is taking longer than expected after {attempts} status checks; check back later"
    )]
    TimedOut { attempts: u32 },
    #[error(transparent)]
    Triage(#[from] TriageError),
    #[error("no document has been uploaded yet")]
    NoJob,
    #[error("status polling for job {job_id} is already running")]
    AlreadyPolling { job_id: JobId },
    #[error("job {job_id} was discarded")]
    Cancelled { job_id: JobId },
}

/// Tasks the backend created from accepted suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreatedTasks {
    pub count: usize,
    pub task_ids: Vec<u64>,
}

/// Where the front end should go after a batch action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    LeaveTriage,
    StayInTriage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptOutcome {
    pub accepted: Vec<SuggestionId>,
    pub created: CreatedTasks,
    pub navigation: Navigation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectOutcome {
    pub rejected: Vec<SuggestionId>,
    /// Suggestions left after the reload, if the reload succeeded.
    pub remaining: Option<usize>,
    /// Why the reload after a successful reject failed, if it did.
    pub reload_error: Option<ApiError>,
    pub navigation: Navigation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    pub job_id: JobId,
    pub extracted_tasks_count: u32,
    pub suggestions_loaded: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Submitted {
        project_id: ProjectId,
        job_id: JobId,
        status: JobStatus,
    },
    Polled {
        job_id: JobId,
        attempt: u32,
        max_attempts: u32,
        status: JobStatus,
    },
    PollFinished {
        job_id: JobId,
        outcome: PollOutcome,
    },
    SuggestionsLoaded {
        job_id: JobId,
        count: usize,
        pruned: usize,
    },
    BatchFinished {
        job_id: JobId,
        kind: BatchKind,
        suggestion_ids: Vec<SuggestionId>,
        result: Result<(), FailureKind>,
    },
}
