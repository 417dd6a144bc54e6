//! Extraction core: pure state machines for the document task-extraction pipeline.
mod job;
mod poll;
mod selection;
mod store;
mod suggestion;
mod upload;
mod view_model;

pub use job::{
    JobDetails, JobId, JobStatus, ProcessingJob, ProjectId, StatusReport, TransitionError,
};
pub use poll::{
    PollOutcome, PollPolicy, PollStep, PollTracker, DEFAULT_MAX_POLL_ATTEMPTS,
    DEFAULT_POLL_INTERVAL,
};
pub use selection::SelectionSet;
pub use store::{BatchKind, BatchRequest, SuggestionPhase, SuggestionStore, TriageError};
pub use suggestion::{
    ConfidenceTier, Priority, SuggestionId, TaskSuggestion, UnknownPriority,
    HIGH_CONFIDENCE_THRESHOLD, MEDIUM_CONFIDENCE_THRESHOLD,
};
pub use upload::{
    is_mime_type_allowed, mime_type_for_file_name, validate, DocumentUpload, ValidationError,
    ALLOWED_MIME_TYPES, MAX_UPLOAD_BYTES,
};
pub use view_model::{SuggestionRow, TriageView};
