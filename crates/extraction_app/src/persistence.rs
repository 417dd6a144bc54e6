//! Remembers the last processing job used per project in `.doctask_state.ron`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use extraction_core::{JobId, ProjectId};
use pipeline_logging::{pipeline_debug, pipeline_error, pipeline_warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

pub const STATE_FILENAME: &str = ".doctask_state.ron";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state directory missing or not writable: {0}")]
    StateDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
        }

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RememberedJob {
    job_id: JobId,
    file_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedState {
    last_jobs: BTreeMap<ProjectId, RememberedJob>,
}

/// Last-used jobs, loaded from and saved to one directory.
#[derive(Debug)]
pub struct JobMemory {
    dir: PathBuf,
    state: PersistedState,
}

impl JobMemory {
    /// Loads the state file; a missing or unreadable file starts empty.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(STATE_FILENAME);
        let state = match fs::read_to_string(&path) {
            Ok(text) => match ron::from_str(&text) {
                Ok(state) => state,
                Err(err) => {
                    pipeline_warn!("Failed to parse persisted state from {:?}: {}", path, err);
                    PersistedState::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => PersistedState::default(),
            Err(err) => {
                pipeline_warn!("Failed to read persisted state from {:?}: {}", path, err);
                PersistedState::default()
            }
        };
        Self {
            dir: dir.to_path_buf(),
            state,
        }
    }

    pub fn last_job(&self, project_id: ProjectId) -> Option<JobId> {
        self.state.last_jobs.get(&project_id).map(|job| job.job_id)
    }

    /// Records `job_id` as the project's current job and saves right away.
    ///
    /// A failed save is logged; the command itself still succeeds.
    pub fn remember(&mut self, project_id: ProjectId, job_id: JobId, file_name: Option<&str>) {
        let job = RememberedJob {
            job_id,
            file_name: file_name.map(str::to_string),
        };
        if self.state.last_jobs.get(&project_id) == Some(&job) {
            return;
        }
        self.state.last_jobs.insert(project_id, job);
        if let Err(err) = self.save() {
            pipeline_error!("Failed to write persisted state to {:?}: {}", self.dir, err);
        }
    }

    fn save(&self) -> Result<PathBuf, PersistError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&self.state, pretty)
            .map_err(|err| PersistError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))?;
        let path = AtomicFileWriter::new(self.dir.clone()).write(STATE_FILENAME, &content)?;
        pipeline_debug!("Saved persisted state to {:?}", path);
        Ok(path)
    }
}
