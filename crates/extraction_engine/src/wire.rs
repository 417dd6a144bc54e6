//! JSON shapes of the extraction backend and their mapping to core types.

use chrono::{DateTime, NaiveDate, Utc};
use extraction_core::{
    JobDetails, JobId, JobStatus, Priority, ProcessingJob, ProjectId, StatusReport, SuggestionId,
    TaskSuggestion,
};
use pipeline_logging::pipeline_warn;
use serde::{Deserialize, Serialize};

use crate::{ApiError, CreatedTasks, FailureKind};

const DEFAULT_FAILURE_MESSAGE: &str = "document processing failed";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireJob {
    pub id: Option<JobId>,
    pub status: String,
    pub extracted_tasks_count: Option<u32>,
    pub error_message: Option<String>,
    pub original_filename: Option<String>,
    pub file_type: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    /// The upload endpoint inlines the extracted tasks instead of a count.
    #[serde(default)]
    pub tasks: Option<Vec<serde_json::Value>>,
}

impl WireJob {
    pub(crate) fn into_status(self, fallback_id: Option<JobId>) -> Result<StatusReport, ApiError> {
        let job_id = self.id.or(fallback_id).ok_or_else(|| {
            ApiError::new(FailureKind::Decode, "processing job response has no id")
        })?;
        let status = match self.status.trim().to_ascii_uppercase().as_str() {
            "PENDING" => JobStatus::Pending,
            "PROCESSING" => JobStatus::Processing,
            "COMPLETED" => JobStatus::Completed {
                extracted_tasks_count: self
                    .extracted_tasks_count
                    .or_else(|| self.tasks.as_ref().map(|tasks| tasks.len() as u32))
                    .unwrap_or(0),
            },
            "FAILED" => JobStatus::Failed {
                error_message: self
                    .error_message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            },
            other => {
                return Err(ApiError::new(
                    FailureKind::Decode,
                    format!("unknown processing status {other:?}"),
                ))
            }
        };
        Ok(StatusReport {
            job_id,
            status,
            details: JobDetails {
                original_filename: self.original_filename,
                file_type: self.file_type,
                file_size_bytes: self.file_size_bytes,
                created_at: self.created_at,
                processing_started_at: self.processing_started_at,
                processing_completed_at: self.processing_completed_at,
            },
        })
    }

    pub(crate) fn into_job(self, project_id: ProjectId) -> Result<ProcessingJob, ApiError> {
        let report = self.into_status(None)?;
        Ok(ProcessingJob::new(report.job_id, project_id, report.status).with_details(report.details))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireSuggestion {
    pub id: SuggestionId,
    #[serde(default)]
    pub suggested_title: Option<String>,
    pub suggested_description: Option<String>,
    pub suggested_priority: Option<String>,
    pub suggested_due_date: Option<NaiveDate>,
    pub suggested_estimated_hours: Option<u32>,
    pub confidence_score: Option<f64>,
    pub extraction_method: Option<String>,
    pub line_number: Option<u32>,
    pub raw_text_snippet: Option<String>,
}

impl From<WireSuggestion> for TaskSuggestion {
    fn from(wire: WireSuggestion) -> Self {
        let priority = wire.suggested_priority.as_deref().and_then(|raw| {
            raw.parse::<Priority>()
                .map_err(|err| pipeline_warn!("suggestion {}: {}", wire.id, err))
                .ok()
        });
        TaskSuggestion {
            id: wire.id,
            title: wire.suggested_title.unwrap_or_default(),
            description: wire.suggested_description.filter(|d| !d.is_empty()),
            priority,
            due_date: wire.suggested_due_date,
            estimated_hours: wire.suggested_estimated_hours,
            confidence_score: wire.confidence_score.unwrap_or(0.0),
            extraction_method: wire.extraction_method,
            line_number: wire.line_number,
            raw_text_snippet: wire.raw_text_snippet,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SuggestionIdsBody<'a> {
    pub suggestion_ids: &'a [SuggestionId],
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCreatedTask {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCreateTasksResponse {
    pub count: Option<usize>,
    #[serde(default)]
    pub tasks: Vec<WireCreatedTask>,
}

impl From<WireCreateTasksResponse> for CreatedTasks {
    fn from(wire: WireCreateTasksResponse) -> Self {
        let task_ids: Vec<u64> = wire.tasks.into_iter().map(|t| t.id).collect();
        CreatedTasks {
            count: wire.count.unwrap_or(task_ids.len()),
            task_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Message to show for a non-2xx response body.
pub(crate) fn error_message(body: &str, status_line: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<WireErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status_line.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_error_then_message_then_body() {
        assert_eq!(
            error_message(r#"{"error":"Project is pending payment"}"#, "403 Forbidden"),
            "Project is pending payment"
        );
        assert_eq!(
            error_message(r#"{"message":"nope"}"#, "400 Bad Request"),
            "nope"
        );
        assert_eq!(error_message("  plain text \n", "500"), "plain text");
        assert_eq!(error_message("", "404 Not Found"), "404 Not Found");
        assert_eq!(error_message("{}", "400 Bad Request"), "{}");
    }

    #[test]
    fn completed_upload_counts_inline_tasks() {
        let wire: WireJob = serde_json::from_str(
            r#"{"id":12,"status":"COMPLETED","message":"done","tasks":[{"id":1},{"id":2}]}"#,
        )
        .unwrap();
        let job = wire.into_job(3).unwrap();
        assert_eq!(job.id, 12);
        assert_eq!(job.project_id, 3);
        assert_eq!(job.extracted_tasks_count(), Some(2));
    }

    #[test]
    fn failed_status_without_message_gets_a_default() {
        let wire: WireJob =
            serde_json::from_str(r#"{"id":4,"status":"FAILED","errorMessage":""}"#).unwrap();
        let report = wire.into_status(None).unwrap();
        assert_eq!(
            report.status,
            JobStatus::Failed {
                error_message: DEFAULT_FAILURE_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        let wire: WireJob = serde_json::from_str(r#"{"id":4,"status":"QUEUED"}"#).unwrap();
        let err = wire.into_status(None).unwrap_err();
        assert_eq!(err.kind, FailureKind::Decode);
    }

    #[test]
    fn status_without_id_uses_requested_job() {
        let wire: WireJob = serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        let report = wire.into_status(Some(77)).unwrap();
        assert_eq!(report.job_id, 77);
        assert_eq!(report.status, JobStatus::Processing);
    }

    #[test]
    fn suggestion_with_unknown_priority_keeps_the_rest() {
        let wire: WireSuggestion = serde_json::from_str(
            r#"{"id":5,"suggestedTitle":"Write docs","suggestedPriority":"URGENT",
                "confidenceScore":0.75,"suggestedDueDate":"2026-11-01","lineNumber":14}"#,
        )
        .unwrap();
        let suggestion = TaskSuggestion::from(wire);
        assert_eq!(suggestion.priority, None);
        assert_eq!(suggestion.title, "Write docs");
        assert_eq!(suggestion.line_number, Some(14));
        assert_eq!(
            suggestion.due_date,
            NaiveDate::from_ymd_opt(2026, 11, 1)
        );
    }
}
