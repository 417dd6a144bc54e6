use extraction_core::{
    DocumentUpload, JobId, ProcessingJob, ProjectId, StatusReport, SuggestionId, TaskSuggestion,
};

use crate::{ApiError, CreatedTasks};

/// The extraction service as seen by the pipeline.
///
/// Implementations only move data; ordering, bounds and selection rules live
/// in the session and the core state machines.
#[async_trait::async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Uploads a document that already passed validation.
    async fn submit_document(
        &self,
        project_id: ProjectId,
        upload: &DocumentUpload,
    ) -> Result<ProcessingJob, ApiError>;

    async fn job_status(
        &self,
        project_id: ProjectId,
        job_id: JobId,
    ) -> Result<StatusReport, ApiError>;

    /// Suggestions still pending for the job, highest confidence first.
    async fn list_suggestions(
        &self,
        project_id: ProjectId,
        job_id: JobId,
    ) -> Result<Vec<TaskSuggestion>, ApiError>;

    async fn commit_suggestions(
        &self,
        project_id: ProjectId,
        job_id: JobId,
        suggestion_ids: &[SuggestionId],
    ) -> Result<CreatedTasks, ApiError>;

    async fn reject_suggestions(
        &self,
        project_id: ProjectId,
        job_id: JobId,
        suggestion_ids: &[SuggestionId],
    ) -> Result<(), ApiError>;

    /// Earlier processing jobs for the project, newest first.
    async fn list_jobs(&self, project_id: ProjectId) -> Result<Vec<ProcessingJob>, ApiError>;
}
