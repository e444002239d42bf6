//! Data ingestion for the vrdrive system.
//!
//! This crate handles:
//! - Loading trajectory and VR recordings from JSON
//! - Writing and re-reading aligned trials
//! - Locating participants, trials and scenario parameter files

pub mod loader;
pub mod discovery;

pub use loader::{read_aligned, read_trajectory, read_vr, write_aligned, VrFile};
pub use discovery::{participant_dirs, raw_trials, Participant, TrialFiles};
