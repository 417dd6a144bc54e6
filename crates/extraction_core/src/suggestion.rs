use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

pub type SuggestionId = u64;

/// Scores at or above this are shown as high confidence.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;
/// Scores at or above this (and below the high threshold) are medium confidence.
pub const MEDIUM_CONFIDENCE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority {0:?}")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            "CRITICAL" => Ok(Priority::Critical),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE_THRESHOLD {
            ConfidenceTier::High
        } else if score >= MEDIUM_CONFIDENCE_THRESHOLD {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }
}

/// A candidate task the extraction service found in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSuggestion {
    pub id: SuggestionId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<u32>,
    pub confidence_score: f64,
    pub extraction_method: Option<String>,
    pub line_number: Option<u32>,
    pub raw_text_snippet: Option<String>,
}

impl TaskSuggestion {
    /// Minimal suggestion; the optional fields start empty.
    pub fn new(id: SuggestionId, title: impl Into<String>, confidence_score: f64) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            priority: None,
            due_date: None,
            estimated_hours: None,
            confidence_score,
            extraction_method: None,
            line_number: None,
            raw_text_snippet: None,
        }
    }

    /// Score clamped into `[0, 1]`; NaN reads as zero.
    pub fn clamped_confidence(&self) -> f64 {
        if self.confidence_score.is_nan() {
            0.0
        } else {
            self.confidence_score.clamp(0.0, 1.0)
        }
    }

    pub fn confidence_tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_score(self.clamped_confidence())
    }

    pub fn confidence_percent(&self) -> u8 {
        (self.clamped_confidence() * 100.0).round() as u8
    }
}
