//! Batch alignment of every raw trial under a data root.
//!
//! Trials are independent, so they are aligned in parallel. A failing trial
//! is logged and recorded in the report; it never stops the batch.

use crate::report::{BatchReport, TrialOutcome, TrialStatus};
use chrono::Utc;
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};
use vrdrive_alignment::TrialAligner;
use vrdrive_core::{Error, PipelineConfig, Result};
use vrdrive_ingestion::{
    discovery::processed_trial_path, participant_dirs, raw_trials, read_trajectory,
    write_aligned, TrialFiles, VrFile,
};

/// One unit of batch work.
#[derive(Debug, Clone)]
struct TrialJob {
    participant: String,
    files: TrialFiles,
}

/// Runs the aligner over every participant's raw trials.
pub struct BatchAligner {
    aligner: TrialAligner,
    config: PipelineConfig,
}

impl BatchAligner {
    /// Create a batch runner.
    pub fn new(aligner: TrialAligner, config: PipelineConfig) -> Self {
        Self { aligner, config }
    }

    /// Align every trial under `data_root`, writing results under `output_root`.
    pub fn run(&self, data_root: impl AsRef<Path>, output_root: impl AsRef<Path>) -> Result<BatchReport> {
        let started_at = Utc::now();
        let output_root = output_root.as_ref();

        let participants = participant_dirs(data_root)?;
        let mut jobs = Vec::new();
        for participant in &participants {
            for files in raw_trials(&participant.path, &self.config.vr_file_name)? {
                jobs.push(TrialJob {
                    participant: participant.id.clone(),
                    files,
                });
            }
        }
        info!(
            participants = participants.len(),
            trials = jobs.len(),
            "starting batch alignment"
        );

        let outcomes = self.run_jobs(&jobs, output_root)?;

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            participants: participants.len(),
            outcomes,
        };
        info!(
            aligned = report.aligned_count(),
            failed = report.failed_count(),
            elapsed_secs = report.elapsed_secs(),
            "batch alignment finished"
        );
        Ok(report)
    }

    fn run_jobs(&self, jobs: &[TrialJob], output_root: &Path) -> Result<Vec<TrialOutcome>> {
        let work = || -> Vec<TrialOutcome> {
            jobs.par_iter()
                .map(|job| self.run_job(job, output_root))
                .collect()
        };

        if self.config.workers == 0 {
            return Ok(work());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| Error::config(format!("cannot start worker pool: {e}")))?;
        Ok(pool.install(work))
    }

    fn run_job(&self, job: &TrialJob, output_root: &Path) -> TrialOutcome {
        let trial_name = &job.files.trial_name;
        let output = processed_trial_path(output_root, &job.participant, trial_name);

        let status = match self.align_to(&job.files, &output) {
            Ok(samples) => TrialStatus::Aligned { samples },
            Err(e) => {
                warn!(
                    participant = %job.participant,
                    trial = %trial_name,
                    error = %e,
                    "skipping trial"
                );
                TrialStatus::Failed {
                    reason: e.root().to_string(),
                }
            }
        };

        TrialOutcome {
            participant: job.participant.clone(),
            trial_name: trial_name.clone(),
            status,
        }
    }

    fn align_to(&self, files: &TrialFiles, output: &Path) -> Result<usize> {
        let trajectory =
            read_trajectory(&files.trajectory).map_err(|e| e.in_trial(&files.trial_name))?;
        let vr = VrFile::new(&files.vr);
        let aligned = self.aligner.align(trajectory, &vr, &files.trial_name)?;
        write_aligned(output, &aligned)?;
        Ok(aligned.ego().map(|ego| ego.len()).unwrap_or(0))
    }
}
