//! Trial metadata from the `<type>_[v1, v2, ...].ext` naming convention.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use vrdrive_core::{parse_param_list, Error, Result, ScenarioConfig, TrialMetadata};

/// Parses trial file names against a scenario's parameter table.
#[derive(Debug, Clone)]
pub struct TrialNameParser {
    scenario: Arc<ScenarioConfig>,
}

impl TrialNameParser {
    /// Create a parser backed by the given parameter table.
    pub fn new(scenario: Arc<ScenarioConfig>) -> Self {
        Self { scenario }
    }

    /// Parse a trial file name (a full path is accepted; only its base name is used).
    pub fn parse(&self, trial_name: &str) -> Result<TrialMetadata> {
        let base = Path::new(trial_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(trial_name);
        let malformed = |reason: String| Error::malformed_trial_name(base, reason);

        let (exp_type, _) = base
            .split_once('_')
            .ok_or_else(|| malformed("expected '<type>_[values]'".to_string()))?;
        let last = base.rsplit('_').next().unwrap_or(base);

        let param_names = self.scenario.param_names(exp_type).ok_or_else(|| {
            let known: Vec<&str> = self.scenario.experiment_types().collect();
            malformed(format!(
                "unknown experiment type '{exp_type}' (configured: {})",
                known.join(", ")
            ))
        })?;

        let param_name = strip_extension(last)
            .ok_or_else(|| malformed(format!("'{last}' is not a bracketed value list")))?;
        let values = parse_param_list(param_name).map_err(malformed)?;

        if values.len() != param_names.len() {
            return Err(malformed(format!(
                "{} values given, '{exp_type}' expects {} ({})",
                values.len(),
                param_names.len(),
                param_names.join(", ")
            )));
        }

        let param: BTreeMap<String, _> = param_names.iter().cloned().zip(values).collect();

        Ok(TrialMetadata {
            exp_type: exp_type.to_string(),
            param_name: param_name.to_string(),
            param,
        })
    }
}

/// Drop a trailing file extension from the bracketed token.
///
/// The values themselves contain dots, so only a suffix after the closing
/// bracket counts as an extension.
fn strip_extension(token: &str) -> Option<&str> {
    if token.ends_with(']') {
        return Some(token);
    }
    let (stem, _ext) = token.rsplit_once('.')?;
    stem.ends_with(']').then_some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vrdrive_core::ParamValue;

    fn make_parser() -> TrialNameParser {
        let json = r#"{
            "parameter_names": {
                "discretionary": ["cav_max_speed", "cav_time_gap", "front_hdv_speed", "platoon_size"],
                "mandatory": ["cav_max_speed", "remaining_distance"]
            },
            "discretionary_params": [[72, 0.6, 64.8, 7]],
            "mandatory_params": [[72, 100]]
        }"#;
        TrialNameParser::new(Arc::new(ScenarioConfig::from_json_str(json).unwrap()))
    }

    #[test]
    fn test_parse_discretionary() {
        let meta = make_parser().parse("discretionary_[72, 0.6, 64.8, 7].json").unwrap();

        assert_eq!(meta.exp_type, "discretionary");
        assert_eq!(meta.param_name, "[72, 0.6, 64.8, 7]");
        assert_eq!(meta.param["cav_max_speed"], ParamValue::Int(72));
        assert_eq!(meta.param["platoon_size"], ParamValue::Int(7));
        let ParamValue::Float(gap) = meta.param["cav_time_gap"] else {
            panic!("cav_time_gap should parse as a float");
        };
        assert_relative_eq!(gap, 0.6);
        let ParamValue::Float(speed) = meta.param["front_hdv_speed"] else {
            panic!("front_hdv_speed should parse as a float");
        };
        assert_relative_eq!(speed, 64.8);
    }

    #[test]
    fn test_parse_full_path() {
        let meta = make_parser()
            .parse("/data/1/traj_data/mandatory_[72, 100].json")
            .unwrap();
        assert_eq!(meta.exp_type, "mandatory");
        assert_eq!(meta.param.len(), 2);
    }

    #[test]
    fn test_parse_without_extension() {
        let meta = make_parser().parse("mandatory_[72, 100]").unwrap();
        assert_eq!(meta.param_name, "[72, 100]");
    }

    #[test]
    fn test_middle_tokens_ignored() {
        let meta = make_parser().parse("mandatory_p03_[72, 100].json").unwrap();
        assert_eq!(meta.exp_type, "mandatory");
        assert_eq!(meta.param_name, "[72, 100]");
    }

    #[test]
    fn test_count_mismatch() {
        let err = make_parser().parse("discretionary_[72, 0.6].json").unwrap_err();
        assert!(matches!(err, Error::MalformedTrialName { .. }));
    }

    #[test]
    fn test_bad_number() {
        let err = make_parser().parse("mandatory_[72, far].json").unwrap_err();
        assert!(err.to_string().contains("far"));
    }

    #[test]
    fn test_unknown_type() {
        let err = make_parser().parse("merge_[72, 100].json").unwrap_err();
        assert!(err.to_string().contains("unknown experiment type"));
    }

    #[test]
    fn test_missing_separator() {
        assert!(make_parser().parse("discretionary.json").is_err());
        assert!(make_parser().parse("mandatory_72, 100.json").is_err());
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("[1, 2.5].json"), Some("[1, 2.5]"));
        assert_eq!(strip_extension("[1, 2.5]"), Some("[1, 2.5]"));
        assert_eq!(strip_extension("[1, 2.5"), None);
    }
}
