//! Dataset building for the vrdrive system.
//!
//! This crate handles:
//! - Parallel batch alignment of every participant's raw trials
//! - Per-trial outcome reporting
//! - Aggregating processed trials into one master dataset

pub mod batch;
pub mod report;
pub mod aggregate;

pub use batch::BatchAligner;
pub use report::{BatchReport, TrialOutcome, TrialStatus};
pub use aggregate::{DatasetBuilder, MasterDataset, ParticipantTrials, SkippedTrial};
