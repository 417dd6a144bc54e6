use chrono::{DateTime, Utc};
use thiserror::Error;

pub type ProjectId = u64;
pub type JobId = u64;

/// Server-reported state of a processing job.
///
/// Moves forward only: `Pending -> Processing -> Completed | Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed { extracted_tasks_count: u32 },
    Failed { error_message: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed { .. } => "COMPLETED",
            JobStatus::Failed { .. } => "FAILED",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed { .. } | JobStatus::Failed { .. } => 2,
        }
    }
}

/// Bookkeeping fields the server keeps alongside a job. All optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobDetails {
    pub original_filename: Option<String>,
    pub file_type: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
}

impl JobDetails {
    /// Takes every field `newer` has and keeps ours for the rest.
    fn merge(&mut self, newer: JobDetails) {
        fn take<T>(ours: &mut Option<T>, theirs: Option<T>) {
            if theirs.is_some() {
                *ours = theirs;
            }
        }
        take(&mut self.original_filename, newer.original_filename);
        take(&mut self.file_type, newer.file_type);
        take(&mut self.file_size_bytes, newer.file_size_bytes);
        take(&mut self.created_at, newer.created_at);
        take(&mut self.processing_started_at, newer.processing_started_at);
        take(&mut self.processing_completed_at, newer.processing_completed_at);
    }
}

/// One answer from the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub details: JobDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("status report for job {actual} applied to job {expected}")]
    WrongJob { expected: JobId, actual: JobId },
    #[error("job {job_id} cannot move back from {from} to {to}")]
    Regressed {
        job_id: JobId,
        from: &'static str,
        to: &'static str,
    },
    #[error("job {job_id} already finished as {status}")]
    AlreadyFinal { job_id: JobId, status: &'static str },
}

/// Client-side handle on a job the extraction service is working on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingJob {
    pub id: JobId,
    pub project_id: ProjectId,
    status: JobStatus,
    details: JobDetails,
}

impl ProcessingJob {
    pub fn new(id: JobId, project_id: ProjectId, status: JobStatus) -> Self {
        Self {
            id,
            project_id,
            status,
            details: JobDetails::default(),
        }
    }

    pub fn with_details(mut self, details: JobDetails) -> Self {
        self.details = details;
        self
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn details(&self) -> &JobDetails {
        &self.details
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn extracted_tasks_count(&self) -> Option<u32> {
        match self.status {
            JobStatus::Completed {
                extracted_tasks_count,
            } => Some(extracted_tasks_count),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            JobStatus::Failed { error_message } => Some(error_message),
            _ => None,
        }
    }

    /// Applies a status report, returning whether the status changed.
    ///
    /// A repeated report of the current status is accepted and only refreshes
    /// the details; fields a report leaves out keep their earlier values.
    /// Reports that would move the job backwards or out of a terminal state
    /// are refused and leave the job untouched.
    pub fn apply(&mut self, report: StatusReport) -> Result<bool, TransitionError> {
        if report.job_id != self.id {
            return Err(TransitionError::WrongJob {
                expected: self.id,
                actual: report.job_id,
            });
        }
        if self.status.is_terminal() {
            if report.status != self.status {
                return Err(TransitionError::AlreadyFinal {
                    job_id: self.id,
                    status: self.status.label(),
                });
            }
            return Ok(false);
        }
        if report.status.rank() < self.status.rank() {
            return Err(TransitionError::Regressed {
                job_id: self.id,
                from: self.status.label(),
                to: report.status.label(),
            });
        }

        let changed = report.status != self.status;
        self.status = report.status;
        self.details.merge(report.details);
        Ok(changed)
    }
}
