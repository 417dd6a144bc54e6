use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use extraction_core::{JobId, ProjectId, SuggestionId};

/// Top-level CLI parser for the `doctask` binary.
#[derive(Debug, Parser)]
#[command(
    name = "doctask",
    version,
    about = "Turn uploaded documents into project tasks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./doctask.ron when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a document, wait for extraction and list the suggestions
    Upload {
        /// PDF or image file to upload
        file: PathBuf,
        #[command(flatten)]
        project: ProjectArg,
        /// Override the content type guessed from the file extension
        #[arg(long)]
        mime: Option<String>,
    },
    /// Show the processing status of a job
    Status(JobArgs),
    /// List earlier processing jobs of a project
    Jobs(ProjectArg),
    /// List the pending suggestions of a job
    Suggestions(JobArgs),
    /// Turn suggestions into tasks
    Accept(BatchArgs),
    /// Discard suggestions
    Reject(BatchArgs),
}

#[derive(Debug, Clone, Copy, Args)]
pub struct ProjectArg {
    /// Project the document belongs to
    #[arg(short, long = "project")]
    pub project_id: ProjectId,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct JobArgs {
    #[command(flatten)]
    pub project: ProjectArg,
    /// Processing job (defaults to the last job used for the project)
    #[arg(short, long = "job")]
    pub job_id: Option<JobId>,
}

#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    #[command(flatten)]
    pub target: JobArgs,
    /// Act on every pending suggestion
    #[arg(long, conflicts_with = "ids")]
    pub all: bool,
    /// Suggestion ids to act on
    #[arg(required_unless_present = "all")]
    pub ids: Vec<SuggestionId>,
}
