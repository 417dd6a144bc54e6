//! Extraction engine: backend IO, status polling and triage orchestration.
mod backend;
mod http;
mod poller;
mod session;
mod sink;
mod types;
mod wire;

pub use backend::ExtractionBackend;
pub use http::{batch_key, BackendSettings, ReqwestBackend, DEFAULT_API_BASE_URL};
pub use poller::StatusPoller;
pub use session::PipelineSession;
pub use sink::{ChannelEventSink, EventSink, NullSink};
pub use types::{
    AcceptOutcome, ApiError, CompletedJob, CreatedTasks, EngineEvent, FailureKind, Navigation,
    PipelineError, RejectOutcome,
};
