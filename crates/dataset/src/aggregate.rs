//! Master dataset aggregation.
//!
//! Collects processed trials of every participant into one nested map:
//!
//! ```text
//! { type: { scenario_idx: { participant: AlignedTrial } } }
//! ```
//!
//! Each configured combination gets a slot, even when no participant drove it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use vrdrive_core::{parse_param_list, AlignedTrial, Error, Result, ScenarioConfig};
use vrdrive_ingestion::discovery::{participant_dirs, processed_trials};
use vrdrive_ingestion::loader::{read_aligned, write_json};

/// Trials of one scenario index, by participant id.
pub type ParticipantTrials = BTreeMap<String, AlignedTrial>;

/// Aggregated processed trials of a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasterDataset {
    types: BTreeMap<String, BTreeMap<usize, ParticipantTrials>>,
}

impl MasterDataset {
    /// Trials for one type and scenario index.
    pub fn slot(&self, exp_type: &str, scenario_idx: usize) -> Option<&ParticipantTrials> {
        self.types.get(exp_type)?.get(&scenario_idx)
    }

    /// Experiment types present.
    pub fn experiment_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Total number of trials stored.
    pub fn trial_count(&self) -> usize {
        self.types
            .values()
            .flat_map(|slots| slots.values())
            .map(|trials| trials.len())
            .sum()
    }

    /// Write as indented JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path, self)
    }
}

/// A processed trial that could not be placed in the dataset.
#[derive(Debug, Clone)]
pub struct SkippedTrial {
    pub path: PathBuf,
    pub reason: String,
}

/// Builds a [`MasterDataset`] for one scenario.
pub struct DatasetBuilder {
    scenario: Arc<ScenarioConfig>,
    dataset: MasterDataset,
}

impl DatasetBuilder {
    /// Start with an empty slot for every configured combination.
    pub fn new(scenario: Arc<ScenarioConfig>) -> Self {
        let mut types = BTreeMap::new();
        for exp_type in scenario.experiment_types() {
            let slots = (0..scenario.param_combinations(exp_type).map_or(0, |c| c.len()))
                .map(|idx| (idx, ParticipantTrials::new()))
                .collect();
            types.insert(exp_type.to_string(), slots);
        }
        Self {
            scenario,
            dataset: MasterDataset { types },
        }
    }

    /// Place one trial under its type and scenario index.
    ///
    /// Returns the scenario index. An existing entry for the same participant
    /// and combination is replaced.
    pub fn insert(&mut self, participant: &str, trial: AlignedTrial) -> Result<usize> {
        let info = &trial.exp_info;
        let values = parse_param_list(&info.param_name)
            .map_err(|reason| Error::malformed_trial_name(&info.param_name, reason))?;
        let idx = self
            .scenario
            .scenario_index(&info.exp_type, &values)
            .ok_or_else(|| {
                Error::data(format!(
                    "{} {} is not a configured combination",
                    info.exp_type, info.param_name
                ))
            })?;

        let slots = self
            .dataset
            .types
            .get_mut(&info.exp_type)
            .ok_or_else(|| Error::data(format!("unknown experiment type: {}", info.exp_type)))?;
        if slots
            .entry(idx)
            .or_default()
            .insert(participant.to_string(), trial)
            .is_some()
        {
            warn!(participant, scenario_idx = idx, "duplicate trial replaced");
        }
        Ok(idx)
    }

    /// Load every processed trial under `processed_root`.
    ///
    /// Participants are visited in numeric order, stopping after
    /// `max_participants` when set. Trials that fail to load or place are
    /// logged and returned; they do not stop the build.
    pub fn load_dir(
        &mut self,
        processed_root: impl AsRef<Path>,
        max_participants: Option<usize>,
    ) -> Result<Vec<SkippedTrial>> {
        let participants = participant_dirs(processed_root)?;
        let limit = max_participants.unwrap_or(participants.len());
        let mut skipped = Vec::new();

        for participant in participants.iter().take(limit) {
            for path in processed_trials(&participant.path)? {
                let placed = read_aligned(&path).and_then(|trial| self.insert(&participant.id, trial));
                if let Err(e) = placed {
                    warn!(path = %path.display(), error = %e, "skipping processed trial");
                    skipped.push(SkippedTrial {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            participants = participants.len().min(limit),
            trials = self.dataset.trial_count(),
            skipped = skipped.len(),
            "aggregated processed trials"
        );
        Ok(skipped)
    }

    pub fn build(self) -> MasterDataset {
        self.dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vrdrive_core::{TrajectoryRecord, TrialMetadata};

    fn make_scenario() -> Arc<ScenarioConfig> {
        let json = json!({
            "scenario_name": "Platoon",
            "scenario_id": 1,
            "parameter_names": {"discretionary": ["speed", "gap"], "mandatory": ["dist"]},
            "discretionary_params": [[72, 0.6], [80, 0.6], [72, 1.2]],
            "mandatory_params": [[100]]
        });
        Arc::new(ScenarioConfig::from_json_str(&json.to_string()).unwrap())
    }

    fn make_trial(exp_type: &str, param_name: &str) -> AlignedTrial {
        AlignedTrial {
            exp_info: TrialMetadata {
                exp_type: exp_type.to_string(),
                param_name: param_name.to_string(),
                param: BTreeMap::new(),
            },
            vr_id: "97".to_string(),
            all_veh_info: TrajectoryRecord::default(),
        }
    }

    #[test]
    fn test_empty_slots_for_every_combination() {
        let dataset = DatasetBuilder::new(make_scenario()).build();
        assert_eq!(dataset.experiment_types().collect::<Vec<_>>(), vec!["discretionary", "mandatory"]);
        for idx in 0..3 {
            assert!(dataset.slot("discretionary", idx).unwrap().is_empty());
        }
        assert!(dataset.slot("discretionary", 3).is_none());
        assert_eq!(dataset.trial_count(), 0);
    }

    #[test]
    fn test_insert_places_by_combination() {
        let mut builder = DatasetBuilder::new(make_scenario());
        assert_eq!(builder.insert("1", make_trial("discretionary", "[72, 1.2]")).unwrap(), 2);
        assert_eq!(builder.insert("2", make_trial("discretionary", "[72, 1.2]")).unwrap(), 2);
        assert_eq!(builder.insert("1", make_trial("mandatory", "[100]")).unwrap(), 0);

        let dataset = builder.build();
        let slot = dataset.slot("discretionary", 2).unwrap();
        assert_eq!(slot.keys().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(dataset.trial_count(), 3);
    }

    #[test]
    fn test_unknown_combination_rejected() {
        let mut builder = DatasetBuilder::new(make_scenario());
        let err = builder.insert("1", make_trial("discretionary", "[99, 0.6]")).unwrap_err();
        assert!(matches!(err, Error::Data(_)));

        let err = builder.insert("1", make_trial("discretionary", "72, 0.6")).unwrap_err();
        assert!(matches!(err, Error::MalformedTrialName { .. }));

        assert!(builder.insert("1", make_trial("lane_keep", "[100]")).is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let mut builder = DatasetBuilder::new(make_scenario());
        builder.insert("4", make_trial("mandatory", "[100]")).unwrap();

        let json = serde_json::to_value(builder.build()).unwrap();
        assert_eq!(json["mandatory"]["0"]["4"]["vr_id"], "97");
        assert_eq!(json["discretionary"]["1"], json!({}));
    }
}
