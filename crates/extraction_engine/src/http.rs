use std::time::Duration;

use extraction_core::{
    BatchKind, DocumentUpload, JobId, ProcessingJob, ProjectId, StatusReport, SuggestionId,
    TaskSuggestion,
};
use pipeline_logging::{pipeline_debug, pipeline_info};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::wire::{
    error_message, SuggestionIdsBody, WireCreateTasksResponse, WireJob, WireSuggestion,
};
use crate::{ApiError, CreatedTasks, ExtractionBackend, FailureKind};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP adapter for the extraction backend's REST API.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ReqwestBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn documents_url(&self, project_id: ProjectId) -> String {
        format!("{}/projects/{project_id}/documents", self.base_url)
    }

    fn job_url(&self, project_id: ProjectId, job_id: JobId, action: &str) -> String {
        format!("{}/{job_id}/{action}", self.documents_url(project_id))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        pipeline_debug!("GET {}", url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn post_ids(
        &self,
        url: String,
        key: String,
        suggestion_ids: &[SuggestionId],
    ) -> Result<reqwest::Response, ApiError> {
        pipeline_debug!("POST {} ids={:?}", url, suggestion_ids);
        let response = self
            .authorize(self.client.post(&url))
            .header(IDEMPOTENCY_HEADER, key)
            .json(&SuggestionIdsBody { suggestion_ids })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await
    }
}

#[async_trait::async_trait]
impl ExtractionBackend for ReqwestBackend {
    async fn submit_document(
        &self,
        project_id: ProjectId,
        upload: &DocumentUpload,
    ) -> Result<ProcessingJob, ApiError> {
        let url = format!("{}/upload", self.documents_url(project_id));
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))?;
        let form = Form::new().part("file", part);

        pipeline_info!(
            "Uploading {} ({} bytes) to project {}",
            upload.file_name,
            upload.size_bytes(),
            project_id
        );
        let response = self
            .authorize(self.client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let wire: WireJob = read_json(response).await?;
        wire.into_job(project_id)
    }

    async fn job_status(
        &self,
        project_id: ProjectId,
        job_id: JobId,
    ) -> Result<StatusReport, ApiError> {
        let wire: WireJob = self
            .get_json(self.job_url(project_id, job_id, "status"))
            .await?;
        wire.into_status(Some(job_id))
    }

    async fn list_suggestions(
        &self,
        project_id: ProjectId,
        job_id: JobId,
    ) -> Result<Vec<TaskSuggestion>, ApiError> {
        let wire: Vec<WireSuggestion> = self
            .get_json(self.job_url(project_id, job_id, "suggestions"))
            .await?;
        Ok(wire.into_iter().map(TaskSuggestion::from).collect())
    }

    async fn commit_suggestions(
        &self,
        project_id: ProjectId,
        job_id: JobId,
        suggestion_ids: &[SuggestionId],
    ) -> Result<CreatedTasks, ApiError> {
        let url = self.job_url(project_id, job_id, "create-tasks");
        let key = batch_key(project_id, job_id, BatchKind::Accept, suggestion_ids);
        let response = self.post_ids(url, key, suggestion_ids).await?;
        let wire: WireCreateTasksResponse = parse_json(response).await?;
        Ok(wire.into())
    }

    async fn reject_suggestions(
        &self,
        project_id: ProjectId,
        job_id: JobId,
        suggestion_ids: &[SuggestionId],
    ) -> Result<(), ApiError> {
        let url = self.job_url(project_id, job_id, "reject-suggestions");
        let key = batch_key(project_id, job_id, BatchKind::Reject, suggestion_ids);
        self.post_ids(url, key, suggestion_ids).await?;
        Ok(())
    }

    async fn list_jobs(&self, project_id: ProjectId) -> Result<Vec<ProcessingJob>, ApiError> {
        let wire: Vec<WireJob> = self.get_json(self.documents_url(project_id)).await?;
        wire.into_iter()
            .map(|job| job.into_job(project_id))
            .collect()
    }
}

/// Stable key for one batch: the same ids on the same job always hash the same,
/// so a backend that honours the header can drop a duplicated submission.
pub fn batch_key(
    project_id: ProjectId,
    job_id: JobId,
    kind: BatchKind,
    suggestion_ids: &[SuggestionId],
) -> String {
    let mut ids = suggestion_ids.to_vec();
    ids.sort_unstable();
    let joined = ids
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let digest = Sha256::digest(format!("{project_id}:{job_id}:{}:{joined}", kind.label()));
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::new(
        FailureKind::HttpStatus(status.as_u16()),
        error_message(&body, &status.to_string()),
    ))
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    parse_json(response).await
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
