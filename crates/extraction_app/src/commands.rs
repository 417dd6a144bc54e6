use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Local, Utc};
use extraction_core::{
    DocumentUpload, JobId, JobStatus, PollPolicy, ProcessingJob, ProjectId, SuggestionRow,
    TriageView,
};
use extraction_engine::{ExtractionBackend, PipelineError, PipelineSession, ReqwestBackend};
use pipeline_logging::{pipeline_info, set_job_tag};

use crate::cli::{BatchArgs, Commands, JobArgs};
use crate::config::ClientConfig;
use crate::persistence::JobMemory;
use crate::progress::ConsoleProgress;

struct CommandContext {
    backend: Arc<dyn ExtractionBackend>,
    policy: PollPolicy,
    memory: JobMemory,
}

impl CommandContext {
    fn session(&self, project_id: ProjectId) -> PipelineSession {
        PipelineSession::new(self.backend.clone(), project_id)
            .with_policy(self.policy)
            .with_sink(Arc::new(ConsoleProgress))
    }

    fn resolve_job(&self, args: JobArgs) -> anyhow::Result<JobId> {
        let project_id = args.project.project_id;
        args.job_id
            .or_else(|| self.memory.last_job(project_id))
            .ok_or_else(|| {
                anyhow!("no job given and none remembered for project {project_id}; pass --job")
            })
    }

    /// Fetches the job's current status and adopts it into a fresh session.
    async fn attach_job(&mut self, args: JobArgs) -> anyhow::Result<PipelineSession> {
        let project_id = args.project.project_id;
        let job_id = self.resolve_job(args)?;
        set_job_tag(Some(job_id));

        let report = self
            .backend
            .job_status(project_id, job_id)
            .await
            .with_context(|| format!("failed to fetch status of job {job_id}"))?;
        let job = ProcessingJob::new(job_id, project_id, report.status).with_details(report.details);
        self.memory
            .remember(project_id, job_id, job.details().original_filename.as_deref());

        match job.status() {
            JobStatus::Completed { .. } => {}
            JobStatus::Failed { error_message } => {
                bail!("job {job_id} failed: {error_message}")
            }
            status => bail!(
                "job {job_id} is still {}; try again later",
                status.label().to_lowercase()
            ),
        }

        let session = self.session(project_id);
        session.attach(job);
        Ok(session)
    }
}

pub async fn dispatch(command: Commands, config: &ClientConfig) -> anyhow::Result<()> {
    let backend =
        ReqwestBackend::new(config.backend_settings()).context("invalid api_base_url")?;
    let mut ctx = CommandContext {
        backend: Arc::new(backend),
        policy: config.poll_policy(),
        memory: JobMemory::load(Path::new(".")),
    };

    match command {
        Commands::Upload {
            file,
            project,
            mime,
        } => upload(&mut ctx, &file, project.project_id, mime).await,
        Commands::Status(args) => status(&mut ctx, args).await,
        Commands::Jobs(project) => jobs(&ctx, project.project_id).await,
        Commands::Suggestions(args) => suggestions(&mut ctx, args).await,
        Commands::Accept(args) => accept(&mut ctx, args).await,
        Commands::Reject(args) => reject(&mut ctx, args).await,
    }
}

async fn upload(
    ctx: &mut CommandContext,
    file: &Path,
    project_id: ProjectId,
    mime: Option<String>,
) -> anyhow::Result<()> {
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let document = match mime {
        Some(mime_type) => DocumentUpload::new(file_name.clone(), mime_type, bytes),
        None => DocumentUpload::from_file_name(file_name.clone(), bytes),
    };

    let session = ctx.session(project_id);
    let job = session.submit(document).await?;
    set_job_tag(Some(job.id));
    ctx.memory.remember(project_id, job.id, Some(&file_name));
    println!("Uploaded {file_name} as job {}", job.id);

    let result = tokio::select! {
        result = session.wait_for_completion() => result,
        _ = tokio::signal::ctrl_c() => {
            session.teardown();
            pipeline_info!("Interrupted while waiting for job {}", job.id);
            println!("Stopped waiting. Check later with `doctask status -p {project_id}`.");
            return Ok(());
        }
    };

    match result {
        Ok(completed) => {
            println!(
                "Job {} completed: {} task(s) extracted",
                completed.job_id, completed.extracted_tasks_count
            );
            print_view(&session.view());
            Ok(())
        }
        Err(err @ PipelineError::TimedOut { .. }) => {
            println!("{err}");
            println!("Run `doctask status -p {project_id}` to check on it.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn status(ctx: &mut CommandContext, args: JobArgs) -> anyhow::Result<()> {
    let project_id = args.project.project_id;
    let job_id = ctx.resolve_job(args)?;
    let report = ctx
        .backend
        .job_status(project_id, job_id)
        .await
        .with_context(|| format!("failed to fetch status of job {job_id}"))?;
    let job = ProcessingJob::new(job_id, project_id, report.status).with_details(report.details);
    ctx.memory
        .remember(project_id, job_id, job.details().original_filename.as_deref());
    print_job(&job);
    Ok(())
}

async fn jobs(ctx: &CommandContext, project_id: ProjectId) -> anyhow::Result<()> {
    let jobs = ctx
        .backend
        .list_jobs(project_id)
        .await
        .with_context(|| format!("failed to list jobs of project {project_id}"))?;
    if jobs.is_empty() {
        println!("No documents uploaded to project {project_id} yet.");
    }
    for job in &jobs {
        print_job(job);
    }
    Ok(())
}

async fn suggestions(ctx: &mut CommandContext, args: JobArgs) -> anyhow::Result<()> {
    let session = ctx.attach_job(args).await?;
    session.load_suggestions().await?;
    print_view(&session.view());
    Ok(())
}

async fn accept(ctx: &mut CommandContext, args: BatchArgs) -> anyhow::Result<()> {
    let session = prepare_batch(ctx, &args).await?;
    let job_id = job_id_of(&session)?;
    let outcome = session.accept_selected(job_id).await?;
    println!(
        "Accepted {} suggestion(s); {} task(s) created",
        outcome.accepted.len(),
        outcome.created.count
    );
    Ok(())
}

async fn reject(ctx: &mut CommandContext, args: BatchArgs) -> anyhow::Result<()> {
    let session = prepare_batch(ctx, &args).await?;
    let job_id = job_id_of(&session)?;
    let outcome = session.reject_selected(job_id).await?;
    println!("Rejected {} suggestion(s)", outcome.rejected.len());
    match (outcome.remaining, outcome.reload_error) {
        (_, Some(err)) => println!("Could not reload the remaining suggestions: {err}"),
        (Some(0), None) => println!("No suggestions left for job {job_id}."),
        (_, None) => print_view(&session.view()),
    }
    Ok(())
}

async fn prepare_batch(
    ctx: &mut CommandContext,
    args: &BatchArgs,
) -> anyhow::Result<PipelineSession> {
    let session = ctx.attach_job(args.target).await?;
    session.load_suggestions().await?;
    if args.all {
        session.select_all()?;
    } else {
        let ids: BTreeSet<_> = args.ids.iter().copied().collect();
        for id in ids {
            session.toggle_selection(id)?;
        }
    }
    Ok(session)
}

fn job_id_of(session: &PipelineSession) -> anyhow::Result<JobId> {
    session
        .job()
        .map(|job| job.id)
        .ok_or_else(|| anyhow!("job was discarded"))
}

fn print_job(job: &ProcessingJob) {
    let details = job.details();
    let name = details.original_filename.as_deref().unwrap_or("-");
    let created = details
        .created_at
        .map(format_time)
        .unwrap_or_else(|| "-".to_string());
    let status = match job.status() {
        JobStatus::Completed {
            extracted_tasks_count,
        } => format!("COMPLETED ({extracted_tasks_count} tasks)"),
        JobStatus::Failed { error_message } => format!("FAILED: {error_message}"),
        other => other.label().to_string(),
    };
    println!("{:>6}  {:<20}  {:<24}  {}", job.id, created, name, status);
}

fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn print_view(view: &TriageView) {
    if view.rows.is_empty() {
        println!("No pending suggestions.");
        return;
    }
    println!(
        "{:>6}  {:>4}  {:<6}  {:<8}  {:<10}  TITLE",
        "ID", "CONF", "TIER", "PRIORITY", "DUE"
    );
    for row in &view.rows {
        println!("{}", format_row(row));
    }
}

fn format_row(row: &SuggestionRow) -> String {
    let priority = row.priority.map(|p| p.label()).unwrap_or("-");
    let due = row
        .due_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{:>6}  {:>3}%  {:<6}  {:<8}  {:<10}  {}",
        row.id,
        row.confidence_percent,
        row.tier.label(),
        priority,
        due,
        row.title
    );
    if let Some(hours) = row.estimated_hours {
        line.push_str(&format!(" ({hours}h)"));
    }
    if let Some(line_number) = row.line_number {
        line.push_str(&format!(" [line {line_number}]"));
    }
    line
}
