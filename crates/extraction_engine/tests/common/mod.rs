#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use extraction_core::{
    DocumentUpload, JobDetails, JobId, JobStatus, ProcessingJob, ProjectId, StatusReport,
    SuggestionId, TaskSuggestion,
};
use extraction_engine::{
    ApiError, CreatedTasks, EngineEvent, EventSink, ExtractionBackend, FailureKind,
};
use tokio::sync::Notify;
use tokio::time::Instant;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pipeline_logging::initialize_for_tests);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Submit { file_name: String },
    Status { job_id: JobId },
    List { job_id: JobId },
    Commit { ids: Vec<SuggestionId> },
    Reject { ids: Vec<SuggestionId> },
    ListJobs,
}

/// In-memory stand-in for the extraction service.
///
/// Status answers are served from a script; once it runs dry the last
/// scripted status repeats. Commit and reject remove ids from the pool the
/// way the real service does.
pub struct FakeBackend {
    calls: Mutex<Vec<(Call, Instant)>>,
    job_id: JobId,
    initial_status: JobStatus,
    statuses: Mutex<VecDeque<Result<JobStatus, ApiError>>>,
    last_status: Mutex<JobStatus>,
    pool: Mutex<Vec<TaskSuggestion>>,
    fail_commit: Mutex<Option<ApiError>>,
    fail_reject: Mutex<Option<ApiError>>,
    fail_list: Mutex<Option<ApiError>>,
    commit_gate: Mutex<Option<Arc<Notify>>>,
    uploads: Mutex<HashMap<String, (JobId, Duration)>>,
}

impl FakeBackend {
    pub fn new(job_id: JobId) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            job_id,
            initial_status: JobStatus::Pending,
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(JobStatus::Pending),
            pool: Mutex::new(Vec::new()),
            fail_commit: Mutex::new(None),
            fail_reject: Mutex::new(None),
            fail_list: Mutex::new(None),
            commit_gate: Mutex::new(None),
            uploads: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_initial_status(mut self, status: JobStatus) -> Self {
        self.initial_status = status;
        self
    }

    pub fn with_statuses(self, statuses: Vec<JobStatus>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .extend(statuses.into_iter().map(Ok));
        self
    }

    pub fn with_status_error(self, err: ApiError) -> Self {
        self.statuses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_suggestions(self, ids: &[SuggestionId]) -> Self {
        *self.pool.lock().unwrap() = suggestions(ids);
        self
    }

    /// Uploads of `file_name` take `delay` and create `job_id`.
    pub fn with_upload(self, file_name: &str, job_id: JobId, delay: Duration) -> Self {
        self.uploads
            .lock()
            .unwrap()
            .insert(file_name.to_string(), (job_id, delay));
        self
    }

    pub fn fail_next_commit(&self, err: ApiError) {
        *self.fail_commit.lock().unwrap() = Some(err);
    }

    pub fn fail_next_reject(&self, err: ApiError) {
        *self.fail_reject.lock().unwrap() = Some(err);
    }

    pub fn fail_next_list(&self, err: ApiError) {
        *self.fail_list.lock().unwrap() = Some(err);
    }

    /// Makes commits wait until the returned handle is notified.
    pub fn gate_commits(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.commit_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    pub fn status_call_times(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(call, _)| matches!(call, Call::Status { .. }))
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub fn pool_ids(&self) -> Vec<SuggestionId> {
        self.pool.lock().unwrap().iter().map(|s| s.id).collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((call, Instant::now()));
    }

    fn remove_from_pool(&self, ids: &[SuggestionId]) {
        self.pool.lock().unwrap().retain(|s| !ids.contains(&s.id));
    }
}

#[async_trait::async_trait]
impl ExtractionBackend for FakeBackend {
    async fn submit_document(
        &self,
        project_id: ProjectId,
        upload: &DocumentUpload,
    ) -> Result<ProcessingJob, ApiError> {
        self.record(Call::Submit {
            file_name: upload.file_name.clone(),
        });
        let planned = self.uploads.lock().unwrap().get(&upload.file_name).copied();
        let job_id = match planned {
            Some((job_id, delay)) => {
                tokio::time::sleep(delay).await;
                job_id
            }
            None => self.job_id,
        };
        Ok(ProcessingJob::new(
            job_id,
            project_id,
            self.initial_status.clone(),
        ))
    }

    async fn job_status(
        &self,
        _project_id: ProjectId,
        job_id: JobId,
    ) -> Result<StatusReport, ApiError> {
        self.record(Call::Status { job_id });
        let next = self.statuses.lock().unwrap().pop_front();
        let status = match next {
            Some(Ok(status)) => {
                *self.last_status.lock().unwrap() = status.clone();
                status
            }
            Some(Err(err)) => return Err(err),
            None => self.last_status.lock().unwrap().clone(),
        };
        Ok(StatusReport {
            job_id,
            status,
            details: JobDetails::default(),
        })
    }

    async fn list_suggestions(
        &self,
        _project_id: ProjectId,
        job_id: JobId,
    ) -> Result<Vec<TaskSuggestion>, ApiError> {
        self.record(Call::List { job_id });
        if let Some(err) = self.fail_list.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.pool.lock().unwrap().clone())
    }

    async fn commit_suggestions(
        &self,
        _project_id: ProjectId,
        _job_id: JobId,
        suggestion_ids: &[SuggestionId],
    ) -> Result<CreatedTasks, ApiError> {
        self.record(Call::Commit {
            ids: suggestion_ids.to_vec(),
        });
        let gate = self.commit_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.fail_commit.lock().unwrap().take() {
            return Err(err);
        }
        self.remove_from_pool(suggestion_ids);
        Ok(CreatedTasks {
            count: suggestion_ids.len(),
            task_ids: suggestion_ids.iter().map(|id| id + 9000).collect(),
        })
    }

    async fn reject_suggestions(
        &self,
        _project_id: ProjectId,
        _job_id: JobId,
        suggestion_ids: &[SuggestionId],
    ) -> Result<(), ApiError> {
        self.record(Call::Reject {
            ids: suggestion_ids.to_vec(),
        });
        if let Some(err) = self.fail_reject.lock().unwrap().take() {
            return Err(err);
        }
        self.remove_from_pool(suggestion_ids);
        Ok(())
    }

    async fn list_jobs(&self, project_id: ProjectId) -> Result<Vec<ProcessingJob>, ApiError> {
        self.record(Call::ListJobs);
        Ok(vec![ProcessingJob::new(
            self.job_id,
            project_id,
            self.last_status.lock().unwrap().clone(),
        )])
    }
}

pub fn suggestions(ids: &[SuggestionId]) -> Vec<TaskSuggestion> {
    ids.iter()
        .enumerate()
        .map(|(rank, id)| {
            TaskSuggestion::new(*id, format!("Task {id}"), 0.95 - rank as f64 * 0.1)
        })
        .collect()
}

pub fn server_error(status: u16, message: &str) -> ApiError {
    ApiError {
        kind: FailureKind::HttpStatus(status),
        message: message.to_string(),
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}
