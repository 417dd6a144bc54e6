use std::collections::BTreeSet;

use crate::{JobId, SuggestionId};

/// Suggestion ids the user marked for the next batch action on one job.
///
/// Ordered so the ids sent to the backend are deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet {
    job_id: JobId,
    ids: BTreeSet<SuggestionId>,
}

impl SelectionSet {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            ids: BTreeSet::new(),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: SuggestionId) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = SuggestionId> + '_ {
        self.ids.iter().copied()
    }

    /// Ids in ascending order.
    pub fn to_vec(&self) -> Vec<SuggestionId> {
        self.ids.iter().copied().collect()
    }

    /// Flips membership of `id` and returns whether it is now selected.
    pub fn toggle(&mut self, id: SuggestionId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn insert(&mut self, id: SuggestionId) -> bool {
        self.ids.insert(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops ids for which `present` is false. Returns how many were dropped.
    pub fn prune(&mut self, mut present: impl FnMut(SuggestionId) -> bool) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| present(*id));
        before - self.ids.len()
    }
}
