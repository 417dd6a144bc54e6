use chrono::NaiveDate;

use crate::{ConfidenceTier, JobId, Priority, SuggestionId, SuggestionPhase, TaskSuggestion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageView {
    pub job_id: Option<JobId>,
    pub phase: SuggestionPhase,
    pub rows: Vec<SuggestionRow>,
    pub selected_count: usize,
    pub can_submit_batch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRow {
    pub id: SuggestionId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub confidence_percent: u8,
    pub tier: ConfidenceTier,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<u32>,
    pub extraction_method: Option<String>,
    pub line_number: Option<u32>,
    pub selected: bool,
}

impl SuggestionRow {
    pub(crate) fn new(suggestion: &TaskSuggestion, selected: bool) -> Self {
        Self {
            id: suggestion.id,
            title: suggestion.title.clone(),
            description: suggestion.description.clone(),
            priority: suggestion.priority,
            confidence_percent: suggestion.confidence_percent(),
            tier: suggestion.confidence_tier(),
            due_date: suggestion.due_date,
            estimated_hours: suggestion.estimated_hours,
            extraction_method: suggestion.extraction_method.clone(),
            line_number: suggestion.line_number,
            selected,
        }
    }
}
