//! Locating participants, trials and scenario configuration on disk.
//!
//! Raw data layout:
//!
//! ```text
//! <root>/<participant>/<trial dir>/<type>_[values].json   trajectory
//! <root>/<participant>/<trial dir>/data.json              VR recording
//! ```
//!
//! Processed layout: `<root>/<participant>/traj_data/<type>_[values].json`.
//!
//! Scenario layout: `<base>/scenario*/trials_info/*_trial_params.json`.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vrdrive_core::Result;

/// Sub-directory holding a participant's aligned trials.
pub const TRAJ_DATA_DIR: &str = "traj_data";

/// A participant's data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Participant id (the directory name).
    pub id: String,
    pub path: PathBuf,
}

/// Input files of one raw trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialFiles {
    /// File name of the trajectory file, e.g. `discretionary_[72, 0.6, 64.8, 7].json`.
    pub trial_name: String,
    pub trajectory: PathBuf,
    pub vr: PathBuf,
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn is_json(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}

/// Numerically named sub-directories of `root`, in numeric order.
pub fn participant_dirs(root: impl AsRef<Path>) -> Result<Vec<Participant>> {
    let mut participants: Vec<(u64, Participant)> = sorted_entries(root.as_ref())?
        .into_iter()
        .filter(|p| p.is_dir())
        .filter_map(|path| {
            let id = file_name(&path)?.to_string();
            let number = id.parse::<u64>().ok()?;
            Some((number, Participant { id, path }))
        })
        .collect();
    participants.sort_by_key(|(number, _)| *number);
    debug!(count = participants.len(), "found participant directories");
    Ok(participants.into_iter().map(|(_, p)| p).collect())
}

/// Raw trials of one participant.
///
/// A trial directory must hold the VR file and exactly one other JSON file
/// (the trajectory). Directories that don't are skipped with a warning.
pub fn raw_trials(participant_dir: impl AsRef<Path>, vr_file_name: &str) -> Result<Vec<TrialFiles>> {
    let mut trials = Vec::new();
    for dir in sorted_entries(participant_dir.as_ref())?
        .into_iter()
        .filter(|p| p.is_dir())
    {
        let vr = dir.join(vr_file_name);
        if !vr.is_file() {
            warn!(dir = %dir.display(), vr_file_name, "trial directory has no VR file; skipping");
            continue;
        }

        let mut candidates: Vec<PathBuf> = sorted_entries(&dir)?
            .into_iter()
            .filter(|p| is_json(p) && file_name(p) != Some(vr_file_name))
            .collect();
        if candidates.len() != 1 {
            warn!(
                dir = %dir.display(),
                found = candidates.len(),
                "expected exactly one trajectory file; skipping"
            );
            continue;
        }

        let trajectory = candidates.remove(0);
        let Some(trial_name) = file_name(&trajectory).map(str::to_string) else {
            continue;
        };
        trials.push(TrialFiles {
            trial_name,
            trajectory,
            vr,
        });
    }
    Ok(trials)
}

/// Where an aligned trial is written: `<root>/<participant>/traj_data/<trial_name>`.
pub fn processed_trial_path(root: impl AsRef<Path>, participant: &str, trial_name: &str) -> PathBuf {
    root.as_ref()
        .join(participant)
        .join(TRAJ_DATA_DIR)
        .join(trial_name)
}

/// Aligned trial files of one processed participant directory, sorted by name.
pub fn processed_trials(participant_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = participant_dir.as_ref().join(TRAJ_DATA_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    Ok(sorted_entries(&dir)?.into_iter().filter(|p| is_json(p)).collect())
}

/// The `*_trial_params.json` file of a scenario folder, if any.
pub fn find_scenario_config(base: impl AsRef<Path>, scenario_name: &str) -> Result<Option<PathBuf>> {
    let dir = base.as_ref().join(scenario_name).join("trials_info");
    if !dir.is_dir() {
        return Ok(None);
    }
    Ok(sorted_entries(&dir)?.into_iter().find(|p| {
        p.is_file()
            && file_name(p).is_some_and(|n| n.ends_with("_trial_params.json"))
    }))
}

/// Names of the `scenario*` folders under `base` that carry a parameter file.
pub fn list_available_scenarios(base: impl AsRef<Path>) -> Result<Vec<String>> {
    let base = base.as_ref();
    let mut scenarios = Vec::new();
    for path in sorted_entries(base)?.into_iter().filter(|p| p.is_dir()) {
        let Some(name) = file_name(&path) else {
            continue;
        };
        if name.starts_with("scenario") && find_scenario_config(base, name)?.is_some() {
            scenarios.push(name.to_string());
        }
    }
    Ok(scenarios)
}
