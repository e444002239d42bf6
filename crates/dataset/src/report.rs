//! Outcome reporting for batch runs.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrialStatus {
    /// Aligned and written.
    Aligned {
        /// Ego samples in the output.
        samples: usize,
    },
    /// Skipped because of an error.
    Failed { reason: String },
}

/// Outcome of one trial in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialOutcome {
    pub participant: String,
    pub trial_name: String,
    #[serde(flatten)]
    pub status: TrialStatus,
}

impl TrialOutcome {
    pub fn is_aligned(&self) -> bool {
        matches!(self.status, TrialStatus::Aligned { .. })
    }
}

/// Summary of a batch alignment run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub participants: usize,
    pub outcomes: Vec<TrialOutcome>,
}

impl BatchReport {
    /// Number of trials aligned.
    pub fn aligned_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_aligned()).count()
    }

    /// Number of trials skipped.
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.aligned_count()
    }

    /// Skipped trials.
    pub fn failures(&self) -> impl Iterator<Item = &TrialOutcome> {
        self.outcomes.iter().filter(|o| !o.is_aligned())
    }

    /// Wall-clock duration of the run in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
