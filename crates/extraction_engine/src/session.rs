use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use extraction_core::{
    validate, BatchKind, BatchRequest, DocumentUpload, JobId, PollOutcome, PollPolicy,
    ProcessingJob, ProjectId, SuggestionId, SuggestionStore, TaskSuggestion, TriageError,
    TriageView,
};
use pipeline_logging::{pipeline_debug, pipeline_info, pipeline_warn};

use crate::{
    AcceptOutcome, ApiError, CompletedJob, EngineEvent, EventSink, ExtractionBackend, Navigation,
    NullSink, PipelineError, RejectOutcome, StatusPoller,
};

#[derive(Default)]
struct SessionState {
    job: Option<ProcessingJob>,
    poller: Option<StatusPoller>,
    store: SuggestionStore,
    /// Bumped every time the current job is dropped; an answer that started
    /// under an older generation belongs to a discarded job.
    generation: u64,
}

impl SessionState {
    fn current_job_id(&self) -> Option<JobId> {
        self.job.as_ref().map(|job| job.id)
    }

    fn discard_job(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        if let Some(job) = self.job.take() {
            pipeline_debug!("Discarded job {}", job.id);
        }
        self.store.discard();
        self.generation += 1;
    }
}

/// One user's document-to-tasks flow for a single project.
///
/// Owns the current processing job, its poller and its suggestion store.
/// Every method takes `&self`; the internal lock is never held across an
/// await, so a front end can keep handling input while requests are in
/// flight. Conflicting actions on the same job are refused with
/// [`TriageError::Busy`] instead of queued.
pub struct PipelineSession {
    backend: Arc<dyn ExtractionBackend>,
    project_id: ProjectId,
    policy: PollPolicy,
    sink: Arc<dyn EventSink>,
    state: Mutex<SessionState>,
}

impl PipelineSession {
    pub fn new(backend: Arc<dyn ExtractionBackend>, project_id: ProjectId) -> Self {
        Self {
            backend,
            project_id,
            policy: PollPolicy::default(),
            sink: Arc::new(NullSink),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn job(&self) -> Option<ProcessingJob> {
        self.state().job.clone()
    }

    pub fn view(&self) -> TriageView {
        self.state().store.view()
    }

    pub fn suggestions(&self) -> Vec<TaskSuggestion> {
        self.state().store.suggestions().to_vec()
    }

    pub fn selected_ids(&self) -> Vec<SuggestionId> {
        self.state().store.selected_ids()
    }

    /// Validates and uploads a document, replacing any previous job.
    ///
    /// An invalid file fails before anything is sent. If another upload or a
    /// teardown happens while this one is in flight, the new job is not
    /// adopted and the call returns [`PipelineError::Cancelled`].
    pub async fn submit(&self, upload: DocumentUpload) -> Result<ProcessingJob, PipelineError> {
        validate(&upload)?;
        let generation = {
            let mut state = self.state();
            state.discard_job();
            state.generation
        };

        let job = self
            .backend
            .submit_document(self.project_id, &upload)
            .await?;
        {
            let mut state = self.state();
            if state.generation != generation {
                pipeline_info!(
                    "Not adopting job {} for {}; the session moved on during the upload",
                    job.id,
                    upload.file_name
                );
                return Err(PipelineError::Cancelled { job_id: job.id });
            }
            state.job = Some(job.clone());
        }
        pipeline_info!(
            "Submitted {} as job {} ({})",
            upload.file_name,
            job.id,
            job.status().label()
        );
        self.sink.emit(EngineEvent::Submitted {
            project_id: self.project_id,
            job_id: job.id,
            status: job.status().clone(),
        });
        Ok(job)
    }

    /// Adopts a job created earlier, e.g. by a previous run.
    pub fn attach(&self, job: ProcessingJob) {
        let mut state = self.state();
        state.discard_job();
        pipeline_debug!("Attached job {} ({})", job.id, job.status().label());
        state.job = Some(job);
    }

    /// Polls the current job until it finishes, then loads its suggestions once.
    pub async fn wait_for_completion(&self) -> Result<CompletedJob, PipelineError> {
        let (job, poller) = {
            let mut state = self.state();
            let job = state.job.clone().ok_or(PipelineError::NoJob)?;
            if state.poller.as_ref().is_some_and(|p| !p.is_stopped()) {
                return Err(PipelineError::AlreadyPolling { job_id: job.id });
            }
            let poller = StatusPoller::new(self.policy);
            state.poller = Some(poller.clone());
            (job, poller)
        };

        let result = poller
            .run(self.backend.as_ref(), &job, self.sink.as_ref(), |report| {
                self.apply_report(job.id, report)
            })
            .await;

        {
            let mut state = self.state();
            if state.current_job_id() == Some(job.id) {
                state.poller = None;
            }
        }

        match result? {
            PollOutcome::Completed {
                extracted_tasks_count,
            } => {
                let suggestions_loaded = self.load_suggestions_for(job.id).await?;
                Ok(CompletedJob {
                    job_id: job.id,
                    extracted_tasks_count,
                    suggestions_loaded,
                })
            }
            PollOutcome::Failed { error_message } => Err(PipelineError::ServerProcessing {
                message: error_message,
            }),
            PollOutcome::TimedOut { attempts } => Err(PipelineError::TimedOut { attempts }),
            PollOutcome::Cancelled => Err(PipelineError::Cancelled { job_id: job.id }),
        }
    }

    /// Fetches the current suggestion list for the job, replacing the local one.
    pub async fn load_suggestions(&self) -> Result<usize, PipelineError> {
        let job_id = self.state().current_job_id().ok_or(PipelineError::NoJob)?;
        self.load_suggestions_for(job_id).await
    }

    pub fn toggle_selection(&self, id: SuggestionId) -> Result<bool, PipelineError> {
        Ok(self.state().store.toggle_selection(id)?)
    }

    pub fn select_all(&self) -> Result<usize, PipelineError> {
        Ok(self.state().store.select_all()?)
    }

    pub fn clear_selection(&self) -> Result<(), PipelineError> {
        Ok(self.state().store.clear_selection()?)
    }

    /// Turns the selected suggestions into tasks.
    ///
    /// On success the selection is cleared and the caller should leave the
    /// triage screen. On failure the selection is kept for a retry; the
    /// commit is never retried automatically. A job discarded while the
    /// commit was in flight yields [`PipelineError::Cancelled`].
    pub async fn accept_selected(&self, job_id: JobId) -> Result<AcceptOutcome, PipelineError> {
        let (request, generation) = self.begin_batch(BatchKind::Accept, job_id)?;
        let result = self
            .backend
            .commit_suggestions(self.project_id, job_id, &request.suggestion_ids)
            .await;
        self.finish_batch(&request, generation, result.as_ref().err())?;

        let created = result?;
        pipeline_info!(
            "Accepted {} suggestions on job {}; {} tasks created",
            request.suggestion_ids.len(),
            job_id,
            created.count
        );
        Ok(AcceptOutcome {
            accepted: request.suggestion_ids,
            created,
            navigation: Navigation::LeaveTriage,
        })
    }

    /// Discards the selected suggestions and reloads the remaining ones.
    pub async fn reject_selected(&self, job_id: JobId) -> Result<RejectOutcome, PipelineError> {
        let (request, generation) = self.begin_batch(BatchKind::Reject, job_id)?;
        let result = self
            .backend
            .reject_suggestions(self.project_id, job_id, &request.suggestion_ids)
            .await;

        if let Err(err) = result {
            self.finish_batch(&request, generation, Some(&err))?;
            return Err(err.into());
        }

        // Release the batch and claim the reload in one step so no other
        // action slips in between.
        {
            let mut state = self.state();
            if state.generation != generation {
                pipeline_debug!("Reject result for discarded job {}", job_id);
                return Err(PipelineError::Cancelled { job_id });
            }
            state.store.complete_batch(&request, true)?;
            state.store.begin_load(job_id)?;
        }
        self.emit_batch(&request, None);
        pipeline_info!(
            "Rejected {} suggestions on job {}",
            request.suggestion_ids.len(),
            job_id
        );

        let (remaining, reload_error) = match self.fetch_and_install(job_id).await {
            Ok(count) => (Some(count), None),
            Err(PipelineError::Api(err)) => (None, Some(err)),
            Err(other) => return Err(other),
        };
        Ok(RejectOutcome {
            rejected: request.suggestion_ids,
            remaining,
            reload_error,
            navigation: Navigation::StayInTriage,
        })
    }

    /// Stops polling and forgets the current job, its suggestions and selection.
    ///
    /// Answers still in flight for the old job are dropped when they arrive.
    pub fn teardown(&self) {
        self.state().discard_job();
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_report(&self, job_id: JobId, report: extraction_core::StatusReport) -> bool {
        let mut state = self.state();
        let Some(job) = state.job.as_mut().filter(|job| job.id == job_id) else {
            return false;
        };
        if let Err(err) = job.apply(report) {
            pipeline_warn!("Ignoring status report: {}", err);
        }
        true
    }

    async fn load_suggestions_for(&self, job_id: JobId) -> Result<usize, PipelineError> {
        self.state().store.begin_load(job_id)?;
        self.fetch_and_install(job_id).await
    }

    /// Second half of a load whose busy flag is already set.
    async fn fetch_and_install(&self, job_id: JobId) -> Result<usize, PipelineError> {
        let result = self
            .backend
            .list_suggestions(self.project_id, job_id)
            .await;

        let mut state = self.state();
        if state.current_job_id() != Some(job_id) {
            return Err(PipelineError::Cancelled { job_id });
        }
        let suggestions = match result {
            Ok(suggestions) => suggestions,
            Err(err) => {
                state.store.abort_load(job_id);
                pipeline_warn!("Failed to load suggestions for job {}: {}", job_id, err);
                return Err(err.into());
            }
        };
        let count = suggestions.len();
        let pruned = state.store.finish_load(job_id, suggestions)?;
        drop(state);

        pipeline_debug!(
            "Loaded {} suggestions for job {} ({} stale selections dropped)",
            count,
            job_id,
            pruned
        );
        self.sink.emit(EngineEvent::SuggestionsLoaded {
            job_id,
            count,
            pruned,
        });
        Ok(count)
    }

    /// Claims the store for a batch and remembers which job generation the
    /// claim belongs to.
    fn begin_batch(
        &self,
        kind: BatchKind,
        job_id: JobId,
    ) -> Result<(BatchRequest, u64), PipelineError> {
        let mut state = self.state();
        if state.current_job_id() != Some(job_id) {
            return Err(TriageError::StaleJob {
                expected: state.current_job_id(),
                actual: job_id,
            }
            .into());
        }
        let request = state.store.begin_batch(kind, job_id)?;
        Ok((request, state.generation))
    }

    fn finish_batch(
        &self,
        request: &BatchRequest,
        generation: u64,
        error: Option<&ApiError>,
    ) -> Result<(), PipelineError> {
        {
            let mut state = self.state();
            if state.generation != generation {
                pipeline_debug!(
                    "{} result for discarded job {}",
                    request.kind.label(),
                    request.job_id
                );
                return Err(PipelineError::Cancelled {
                    job_id: request.job_id,
                });
            }
            state.store.complete_batch(request, error.is_none())?;
        }
        if let Some(err) = error {
            pipeline_warn!(
                "Failed to {} suggestions {:?} on job {}: {}",
                request.kind.label(),
                request.suggestion_ids,
                request.job_id,
                err
            );
        }
        self.emit_batch(request, error);
        Ok(())
    }

    fn emit_batch(&self, request: &BatchRequest, error: Option<&ApiError>) {
        self.sink.emit(EngineEvent::BatchFinished {
            job_id: request.job_id,
            kind: request.kind,
            suggestion_ids: request.suggestion_ids.clone(),
            result: match error {
                Some(err) => Err(err.kind.clone()),
                None => Ok(()),
            },
        });
    }
}
