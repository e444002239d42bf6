//! Configuration structures for the vrdrive system.
//!
//! Two kinds of configuration exist:
//! - [`ScenarioConfig`]: the per-scenario trial parameter table (which
//!   experiment types exist, their parameter names and valid combinations).
//! - [`Config`]: processing settings for alignment and batch runs.

use crate::error::{Error, Result};
use crate::types::ParamValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Parameter table for one experiment type.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentParams {
    /// Ordered parameter names; trial-name values map onto them by position.
    pub param_names: Vec<String>,
    /// Valid value combinations. A combination's position is its scenario index.
    pub combinations: Vec<Vec<ParamValue>>,
}

/// Trial parameter table of one scenario.
///
/// On disk this is the `*_trial_params.json` file:
///
/// ```json
/// {
///   "scenario_name": "...",
///   "scenario_id": 1,
///   "parameter_names": { "discretionary": ["cav_max_speed", ...], ... },
///   "discretionary_params": [[72, 0.6, 64.8, 7], ...],
///   ...
/// }
/// ```
///
/// Every key of `parameter_names` needs a matching `<type>_params` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScenarioConfig", into = "RawScenarioConfig")]
pub struct ScenarioConfig {
    /// Human-readable scenario name.
    pub scenario_name: String,
    /// Numeric scenario identifier.
    pub scenario_id: u32,
    experiments: BTreeMap<String, ExperimentParams>,
}

#[derive(Serialize, Deserialize)]
struct RawScenarioConfig {
    #[serde(default = "unknown_scenario")]
    scenario_name: String,
    #[serde(default)]
    scenario_id: u32,
    parameter_names: BTreeMap<String, Vec<String>>,
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

fn unknown_scenario() -> String {
    "Unknown".to_string()
}

fn combinations_key(exp_type: &str) -> String {
    format!("{exp_type}_params")
}

impl TryFrom<RawScenarioConfig> for ScenarioConfig {
    type Error = Error;

    fn try_from(raw: RawScenarioConfig) -> Result<Self> {
        if raw.parameter_names.is_empty() {
            return Err(Error::config("parameter_names lists no experiment type"));
        }

        let mut experiments = BTreeMap::new();
        for (exp_type, param_names) in raw.parameter_names {
            let key = combinations_key(&exp_type);
            let combinations: Vec<Vec<ParamValue>> = match raw.rest.get(&key) {
                Some(v) => serde_json::from_value(v.clone())
                    .map_err(|e| Error::config(format!("invalid '{key}': {e}")))?,
                None => return Err(Error::config(format!("missing '{key}'"))),
            };

            if let Some((idx, combo)) = combinations
                .iter()
                .enumerate()
                .find(|(_, c)| c.len() != param_names.len())
            {
                return Err(Error::config(format!(
                    "'{key}'[{idx}] has {} values but {} parameter names are configured",
                    combo.len(),
                    param_names.len()
                )));
            }

            experiments.insert(
                exp_type,
                ExperimentParams {
                    param_names,
                    combinations,
                },
            );
        }

        Ok(Self {
            scenario_name: raw.scenario_name,
            scenario_id: raw.scenario_id,
            experiments,
        })
    }
}

impl From<ScenarioConfig> for RawScenarioConfig {
    fn from(config: ScenarioConfig) -> Self {
        let mut parameter_names = BTreeMap::new();
        let mut rest = BTreeMap::new();
        for (exp_type, params) in config.experiments {
            rest.insert(
                combinations_key(&exp_type),
                serde_json::to_value(&params.combinations).unwrap_or(Value::Null),
            );
            parameter_names.insert(exp_type, params.param_names);
        }
        Self {
            scenario_name: config.scenario_name,
            scenario_id: config.scenario_id,
            parameter_names,
            rest,
        }
    }
}

impl ScenarioConfig {
    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a `*_trial_params.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }

    /// Configured experiment types, in sorted order.
    pub fn experiment_types(&self) -> impl Iterator<Item = &str> {
        self.experiments.keys().map(String::as_str)
    }

    /// Ordered parameter names for an experiment type.
    pub fn param_names(&self, exp_type: &str) -> Option<&[String]> {
        self.experiments.get(exp_type).map(|e| e.param_names.as_slice())
    }

    /// Valid value combinations for an experiment type.
    pub fn param_combinations(&self, exp_type: &str) -> Option<&[Vec<ParamValue>]> {
        self.experiments.get(exp_type).map(|e| e.combinations.as_slice())
    }

    /// Scenario index of a value combination, if it is one of the configured ones.
    pub fn scenario_index(&self, exp_type: &str, values: &[ParamValue]) -> Option<usize> {
        self.param_combinations(exp_type)?
            .iter()
            .position(|combo| combo.as_slice() == values)
    }
}

/// Processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Trial alignment settings.
    #[serde(default)]
    pub aligner: AlignerConfig,
    /// Batch processing settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Trial alignment settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// Log a warning for VR matches further than this from their trajectory
    /// timestamp (ms). Matching itself is unbounded.
    pub warn_match_distance_ms: Option<u64>,
}

/// Batch processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// VR data file name inside each raw trial directory.
    pub vr_file_name: String,
    /// Number of parallel workers (0 = auto).
    pub workers: usize,
    /// Stop after this many participants when aggregating.
    pub max_participants: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vr_file_name: "data.json".to_string(),
            workers: 0,
            max_participants: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIO_JSON: &str = r#"{
        "scenario_name": "scenario1-HDV cuts into a CAV Platoon",
        "scenario_id": 1,
        "parameter_names": {
            "discretionary": ["cav_max_speed", "cav_time_gap", "front_hdv_speed", "platoon_size"],
            "mandatory": ["cav_max_speed", "cav_time_gap", "remaining_distance"]
        },
        "discretionary_params": [[72, 0.6, 64.8, 7], [72, 1.2, 64.8, 7]],
        "mandatory_params": [[72, 0.6, 100]]
    }"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.vr_file_name, "data.json");
        assert_eq!(config.pipeline.workers, 0);
        assert!(config.aligner.warn_match_distance_ms.is_none());
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"pipeline": {"workers": 4}}"#).unwrap();
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.vr_file_name, "data.json");
        assert!(config.pipeline.max_participants.is_none());
    }

    #[test]
    fn test_parse_scenario_config() {
        let config = ScenarioConfig::from_json_str(SCENARIO_JSON).unwrap();
        assert_eq!(config.scenario_id, 1);
        assert_eq!(
            config.experiment_types().collect::<Vec<_>>(),
            vec!["discretionary", "mandatory"]
        );
        assert_eq!(config.param_names("mandatory").unwrap().len(), 3);
        assert_eq!(config.param_combinations("discretionary").unwrap().len(), 2);
        assert!(config.param_names("unknown").is_none());
    }

    #[test]
    fn test_scenario_index() {
        let config = ScenarioConfig::from_json_str(SCENARIO_JSON).unwrap();
        let values = [
            ParamValue::Int(72),
            ParamValue::Float(1.2),
            ParamValue::Float(64.8),
            ParamValue::Int(7),
        ];
        assert_eq!(config.scenario_index("discretionary", &values), Some(1));
        assert_eq!(config.scenario_index("mandatory", &values), None);
    }

    #[test]
    fn test_missing_combinations_rejected() {
        let json = r#"{"parameter_names": {"discretionary": ["a"]}}"#;
        let err = ScenarioConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("discretionary_params"));
    }

    #[test]
    fn test_combination_width_checked() {
        let json = r#"{
            "parameter_names": {"discretionary": ["a", "b"]},
            "discretionary_params": [[1, 2], [3]]
        }"#;
        assert!(ScenarioConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_scenario_config_serde_round_trip() {
        let config = ScenarioConfig::from_json_str(SCENARIO_JSON).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back = ScenarioConfig::from_json_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO_JSON.as_bytes()).unwrap();
        let config = ScenarioConfig::load(file.path()).unwrap();
        assert_eq!(config.scenario_name, "scenario1-HDV cuts into a CAV Platoon");
    }
}
