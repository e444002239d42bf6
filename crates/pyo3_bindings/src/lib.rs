//! PyO3 bindings for vrdrive Rust components.
//!
//! Exposes the trial aligner to Python:
//! - One-shot alignment of JSON-encoded recordings
//! - Trial name parsing
//! - Ego vehicle lookup
//! - A reusable `TrialAligner` bound to one scenario

use pyo3::create_exception;
use pyo3::exceptions::{PyOSError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::sync::Arc;

use vrdrive_alignment::{find_vr_vehicle as rust_find_vr_vehicle, TrialAligner as RustTrialAligner};
use vrdrive_core::{
    AlignerConfig, Error as RustError, ErrorKind, ParamValue, ScenarioConfig, TrajectoryRecord,
    TrialMetadata as RustTrialMetadata, VrRecord,
};

create_exception!(vrdrive_py, VrdriveError, PyValueError, "Base class for vrdrive errors.");
create_exception!(vrdrive_py, EgoVehicleNotFoundError, VrdriveError);
create_exception!(vrdrive_py, NoOverlapError, VrdriveError);
create_exception!(vrdrive_py, MalformedTrialNameError, VrdriveError);
create_exception!(vrdrive_py, ChannelLengthMismatchError, VrdriveError);
create_exception!(vrdrive_py, ChannelCollisionError, VrdriveError);
create_exception!(vrdrive_py, InsufficientDataError, VrdriveError);

fn to_py_err(e: RustError) -> PyErr {
    let msg = e.to_string();
    match e.kind() {
        ErrorKind::EgoVehicleNotFound => EgoVehicleNotFoundError::new_err(msg),
        ErrorKind::NoOverlap => NoOverlapError::new_err(msg),
        ErrorKind::MalformedTrialName => MalformedTrialNameError::new_err(msg),
        ErrorKind::ChannelLengthMismatch => ChannelLengthMismatchError::new_err(msg),
        ErrorKind::ChannelCollision => ChannelCollisionError::new_err(msg),
        ErrorKind::InsufficientData => InsufficientDataError::new_err(msg),
        ErrorKind::Io => PyOSError::new_err(msg),
        ErrorKind::Config | ErrorKind::Data | ErrorKind::Json => VrdriveError::new_err(msg),
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> PyResult<T> {
    serde_json::from_str(json).map_err(|e| PyValueError::new_err(format!("invalid {what} JSON: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| PyValueError::new_err(e.to_string()))
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// Experiment metadata parsed from a trial name.
#[pyclass]
#[derive(Clone)]
pub struct TrialMetadata {
    #[pyo3(get)]
    pub exp_type: String,
    #[pyo3(get)]
    pub param_name: String,
    values: Vec<(String, ParamValue)>,
}

#[pymethods]
impl TrialMetadata {
    /// Parameter values by name; integers stay integers.
    #[getter]
    fn param<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new_bound(py);
        for (name, value) in &self.values {
            match value {
                ParamValue::Int(v) => dict.set_item(name, *v)?,
                ParamValue::Float(v) => dict.set_item(name, *v)?,
            }
        }
        Ok(dict)
    }

    fn __repr__(&self) -> String {
        format!(
            "TrialMetadata(exp_type={:?}, param_name={:?})",
            self.exp_type, self.param_name
        )
    }
}

impl From<RustTrialMetadata> for TrialMetadata {
    fn from(m: RustTrialMetadata) -> Self {
        TrialMetadata {
            exp_type: m.exp_type,
            param_name: m.param_name,
            values: m.param.into_iter().collect(),
        }
    }
}

// ============================================================================
// Python-exposed Engine Classes
// ============================================================================

/// Trial aligner bound to one scenario parameter table.
#[pyclass(name = "TrialAligner")]
pub struct PyTrialAligner {
    inner: RustTrialAligner,
}

impl PyTrialAligner {
    fn build(scenario: ScenarioConfig, warn_match_distance_ms: Option<u64>) -> Self {
        let config = AlignerConfig {
            warn_match_distance_ms,
        };
        PyTrialAligner {
            inner: RustTrialAligner::new(Arc::new(scenario), config),
        }
    }
}

#[pymethods]
impl PyTrialAligner {
    /// Create from the JSON text of a `*_trial_params.json` file.
    #[new]
    #[pyo3(signature = (config_json, warn_match_distance_ms=None))]
    fn new(config_json: &str, warn_match_distance_ms: Option<u64>) -> PyResult<Self> {
        let scenario = ScenarioConfig::from_json_str(config_json).map_err(to_py_err)?;
        Ok(Self::build(scenario, warn_match_distance_ms))
    }

    /// Create from a `*_trial_params.json` path.
    #[staticmethod]
    #[pyo3(signature = (path, warn_match_distance_ms=None))]
    fn from_file(path: &str, warn_match_distance_ms: Option<u64>) -> PyResult<Self> {
        let scenario = ScenarioConfig::load(path).map_err(to_py_err)?;
        Ok(Self::build(scenario, warn_match_distance_ms))
    }

    /// Align one trial; returns the aligned trial as JSON.
    fn align(&self, trajectory_json: &str, vr_json: &str, trial_name: &str) -> PyResult<String> {
        let trajectory: TrajectoryRecord = parse_json(trajectory_json, "trajectory")?;
        let vr: VrRecord = parse_json(vr_json, "VR")?;
        let aligned = self
            .inner
            .align(trajectory, &vr, trial_name)
            .map_err(to_py_err)?;
        to_json(&aligned)
    }

    /// Parse a trial name against this aligner's scenario.
    fn parse_trial_name(&self, trial_name: &str) -> PyResult<TrialMetadata> {
        self.inner
            .names()
            .parse(trial_name)
            .map(Into::into)
            .map_err(to_py_err)
    }

    /// Configured experiment types.
    fn experiment_types(&self) -> Vec<String> {
        self.inner
            .scenario()
            .experiment_types()
            .map(str::to_string)
            .collect()
    }

    #[getter]
    fn scenario_name(&self) -> String {
        self.inner.scenario().scenario_name.clone()
    }
}

// ============================================================================
// Module Functions
// ============================================================================

/// Align one trial given JSON-encoded inputs; returns the aligned trial as JSON.
#[pyfunction]
fn align_trial(
    trajectory_json: &str,
    vr_json: &str,
    trial_name: &str,
    config_json: &str,
) -> PyResult<String> {
    PyTrialAligner::new(config_json, None)?.align(trajectory_json, vr_json, trial_name)
}

/// Parse `<type>_[v1, v2, ...]` against a scenario parameter table.
#[pyfunction]
fn parse_trial_name(trial_name: &str, config_json: &str) -> PyResult<TrialMetadata> {
    PyTrialAligner::new(config_json, None)?.parse_trial_name(trial_name)
}

/// Id of the VR-controlled vehicle in a JSON trajectory recording.
#[pyfunction]
fn find_vr_vehicle(trajectory_json: &str) -> PyResult<String> {
    let trajectory: TrajectoryRecord = parse_json(trajectory_json, "trajectory")?;
    rust_find_vr_vehicle(&trajectory).map_err(to_py_err)
}

// ============================================================================
// Module Definition
// ============================================================================

/// vrdrive - VR trial alignment for Python.
#[pymodule]
fn vrdrive_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<TrialMetadata>()?;

    // Exceptions
    let py = m.py();
    m.add("VrdriveError", py.get_type_bound::<VrdriveError>())?;
    m.add("EgoVehicleNotFoundError", py.get_type_bound::<EgoVehicleNotFoundError>())?;
    m.add("NoOverlapError", py.get_type_bound::<NoOverlapError>())?;
    m.add("MalformedTrialNameError", py.get_type_bound::<MalformedTrialNameError>())?;
    m.add("ChannelLengthMismatchError", py.get_type_bound::<ChannelLengthMismatchError>())?;
    m.add("ChannelCollisionError", py.get_type_bound::<ChannelCollisionError>())?;
    m.add("InsufficientDataError", py.get_type_bound::<InsufficientDataError>())?;

    // Engine classes
    m.add_class::<PyTrialAligner>()?;

    // Functions
    m.add_function(wrap_pyfunction!(align_trial, m)?)?;
    m.add_function(wrap_pyfunction!(parse_trial_name, m)?)?;
    m.add_function(wrap_pyfunction!(find_vr_vehicle, m)?)?;

    Ok(())
}
