use thiserror::Error;

use crate::view_model::{SuggestionRow, TriageView};
use crate::{JobId, SelectionSet, SuggestionId, TaskSuggestion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Accept,
    Reject,
}

impl BatchKind {
    pub fn label(self) -> &'static str {
        match self {
            BatchKind::Accept => "accept",
            BatchKind::Reject => "reject",
        }
    }
}

/// A batch action ready to be sent, with the selection snapshot it acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub kind: BatchKind,
    pub job_id: JobId,
    pub suggestion_ids: Vec<SuggestionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionPhase {
    NoSuggestions,
    Loading,
    Loaded,
    Triaging,
    Committing(BatchKind),
    /// Accepted suggestions became tasks, or every suggestion was dealt with.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriageError {
    #[error("select at least one suggestion first")]
    EmptySelection,
    #[error("another action on job {job_id} is still in progress")]
    Busy { job_id: JobId },
    #[error("job {actual} is not the job being triaged")]
    StaleJob {
        expected: Option<JobId>,
        actual: JobId,
    },
    #[error("suggestion {id} is not in the current list")]
    UnknownSuggestion { id: SuggestionId },
    #[error("suggestions for job {job_id} have not been loaded")]
    NotLoaded { job_id: JobId },
    #[error("suggestions for job {job_id} were already turned into tasks")]
    Finished { job_id: JobId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Busy {
    Loading,
    Committing(BatchKind),
}

#[derive(Debug, Clone, PartialEq)]
struct JobSuggestions {
    job_id: JobId,
    suggestions: Option<Vec<TaskSuggestion>>,
    selection: SelectionSet,
    busy: Option<Busy>,
    batches_completed: u32,
    left_triage: bool,
}

impl JobSuggestions {
    fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            suggestions: None,
            selection: SelectionSet::new(job_id),
            busy: None,
            batches_completed: 0,
            left_triage: false,
        }
    }

    fn contains(&self, id: SuggestionId) -> bool {
        self.suggestions
            .as_deref()
            .is_some_and(|list| list.iter().any(|s| s.id == id))
    }

    fn ensure_idle(&self) -> Result<(), TriageError> {
        match self.busy {
            Some(_) => Err(TriageError::Busy {
                job_id: self.job_id,
            }),
            None => Ok(()),
        }
    }

    /// Triage is closed after an accept until the list is loaded again.
    fn ensure_open(&self) -> Result<(), TriageError> {
        self.ensure_idle()?;
        if self.left_triage {
            return Err(TriageError::Finished {
                job_id: self.job_id,
            });
        }
        Ok(())
    }
}

/// Ranked suggestions for the job being triaged, plus the user's selection.
///
/// The list is replaced wholesale from a server load. Rejected suggestions
/// disappear when the next load no longer returns them; accepted ones are
/// dropped at once and triage stays closed until the next load.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SuggestionStore {
    current: Option<JobSuggestions>,
}

impl SuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.current.as_ref().map(|c| c.job_id)
    }

    pub fn phase(&self) -> SuggestionPhase {
        let Some(current) = &self.current else {
            return SuggestionPhase::NoSuggestions;
        };
        match current.busy {
            Some(Busy::Loading) => return SuggestionPhase::Loading,
            Some(Busy::Committing(kind)) => return SuggestionPhase::Committing(kind),
            None => {}
        }
        if current.left_triage {
            return SuggestionPhase::Finished;
        }
        match current.suggestions.as_deref() {
            None => SuggestionPhase::NoSuggestions,
            Some([]) if current.batches_completed > 0 => SuggestionPhase::Finished,
            Some(_) if !current.selection.is_empty() => SuggestionPhase::Triaging,
            Some(_) => SuggestionPhase::Loaded,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.busy.is_some())
    }

    pub fn suggestions(&self) -> &[TaskSuggestion] {
        self.current
            .as_ref()
            .and_then(|c| c.suggestions.as_deref())
            .unwrap_or(&[])
    }

    pub fn get(&self, id: SuggestionId) -> Option<&TaskSuggestion> {
        self.suggestions().iter().find(|s| s.id == id)
    }

    pub fn selection(&self) -> Option<&SelectionSet> {
        self.current.as_ref().map(|c| &c.selection)
    }

    /// Snapshot of the selected ids, ascending.
    pub fn selected_ids(&self) -> Vec<SuggestionId> {
        self.selection().map(SelectionSet::to_vec).unwrap_or_default()
    }

    /// Marks a load for `job_id` as in flight.
    ///
    /// Switching to a different job drops the previous job's list and selection.
    pub fn begin_load(&mut self, job_id: JobId) -> Result<(), TriageError> {
        if self.job_id() != Some(job_id) {
            self.current = Some(JobSuggestions::new(job_id));
        }
        let current = self.current_for(job_id)?;
        current.ensure_idle()?;
        current.busy = Some(Busy::Loading);
        Ok(())
    }

    /// Installs the list the server returned and prunes stale selections.
    ///
    /// Returns how many selected ids were dropped because the server no longer
    /// lists them.
    pub fn finish_load(
        &mut self,
        job_id: JobId,
        suggestions: Vec<TaskSuggestion>,
    ) -> Result<usize, TriageError> {
        let current = self.current_for(job_id)?;
        let pruned = current
            .selection
            .prune(|id| suggestions.iter().any(|s| s.id == id));
        current.suggestions = Some(suggestions);
        current.left_triage = false;
        if current.busy == Some(Busy::Loading) {
            current.busy = None;
        }
        Ok(pruned)
    }

    /// Clears the loading flag after a failed load, keeping the previous list.
    pub fn abort_load(&mut self, job_id: JobId) {
        if let Ok(current) = self.current_for(job_id) {
            if current.busy == Some(Busy::Loading) {
                current.busy = None;
            }
        }
    }

    /// Loads a list in one step, for callers that already hold the data.
    pub fn replace(
        &mut self,
        job_id: JobId,
        suggestions: Vec<TaskSuggestion>,
    ) -> Result<usize, TriageError> {
        self.begin_load(job_id)?;
        self.finish_load(job_id, suggestions)
    }

    /// Flips selection of `id` and returns whether it is now selected.
    ///
    /// Only ids in the current list can be selected, and the selection is
    /// frozen while a load or batch action is in flight.
    pub fn toggle_selection(&mut self, id: SuggestionId) -> Result<bool, TriageError> {
        let Some(current) = self.current.as_mut() else {
            return Err(TriageError::UnknownSuggestion { id });
        };
        current.ensure_open()?;
        if !current.contains(id) {
            return Err(TriageError::UnknownSuggestion { id });
        }
        Ok(current.selection.toggle(id))
    }

    /// Selects every listed suggestion. Returns the selection size.
    pub fn select_all(&mut self) -> Result<usize, TriageError> {
        let Some(current) = self.current.as_mut() else {
            return Ok(0);
        };
        current.ensure_open()?;
        for suggestion in current.suggestions.as_deref().unwrap_or(&[]) {
            current.selection.insert(suggestion.id);
        }
        Ok(current.selection.len())
    }

    pub fn clear_selection(&mut self) -> Result<(), TriageError> {
        if let Some(current) = self.current.as_mut() {
            current.ensure_idle()?;
            current.selection.clear();
        }
        Ok(())
    }

    /// Claims the job for a batch action and snapshots the selection.
    ///
    /// Fails without side effects when another action is in flight, nothing
    /// is selected, or an accept already closed triage. The selection stays frozen until [`complete_batch`].
    ///
    /// [`complete_batch`]: SuggestionStore::complete_batch
    pub fn begin_batch(
        &mut self,
        kind: BatchKind,
        job_id: JobId,
    ) -> Result<BatchRequest, TriageError> {
        let current = self.current_for(job_id)?;
        current.ensure_open()?;
        if current.suggestions.is_none() {
            return Err(TriageError::NotLoaded { job_id });
        }
        if current.selection.is_empty() {
            return Err(TriageError::EmptySelection);
        }
        current.busy = Some(Busy::Committing(kind));
        Ok(BatchRequest {
            kind,
            job_id,
            suggestion_ids: current.selection.to_vec(),
        })
    }

    /// Releases the batch claim. On success the selection is cleared; on
    /// failure it is kept so the user can retry without re-selecting.
    ///
    /// Accepted suggestions leave the list right away and close triage.
    pub fn complete_batch(
        &mut self,
        request: &BatchRequest,
        succeeded: bool,
    ) -> Result<(), TriageError> {
        let current = self.current_for(request.job_id)?;
        if current.busy == Some(Busy::Committing(request.kind)) {
            current.busy = None;
        }
        if succeeded {
            current.selection.clear();
            current.batches_completed += 1;
            if request.kind == BatchKind::Accept {
                if let Some(list) = current.suggestions.as_mut() {
                    list.retain(|s| !request.suggestion_ids.contains(&s.id));
                }
                current.left_triage = true;
            }
        }
        Ok(())
    }

    /// Forgets the current job entirely.
    pub fn discard(&mut self) {
        self.current = None;
    }

    pub fn view(&self) -> TriageView {
        let rows = self
            .suggestions()
            .iter()
            .map(|s| {
                let selected = self.selection().is_some_and(|sel| sel.contains(s.id));
                SuggestionRow::new(s, selected)
            })
            .collect();
        let selected_count = self.selection().map_or(0, SelectionSet::len);
        let idle = !self.is_busy();
        TriageView {
            job_id: self.job_id(),
            phase: self.phase(),
            rows,
            selected_count,
            can_submit_batch: idle && selected_count > 0,
        }
    }

    fn current_for(&mut self, job_id: JobId) -> Result<&mut JobSuggestions, TriageError> {
        match self.current.as_mut() {
            Some(current) if current.job_id == job_id => Ok(current),
            other => Err(TriageError::StaleJob {
                expected: other.map(|c| c.job_id),
                actual: job_id,
            }),
        }
    }
}
