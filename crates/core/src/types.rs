//! Core data types for the vrdrive system.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Timestamp in milliseconds of CARLA simulation time.
pub type TimestampMs = i64;

/// Vehicle identifier as it appears in the trajectory recording.
pub type VehicleId = String;

/// A single sample of any channel (number, bool, vector, ...).
pub type Sample = Value;

/// An ordered, timestamp-indexed sequence of samples.
pub type Channel = Vec<Sample>;

/// Named channels of one VR sub-system (e.g. `EyeTracker`).
pub type ChannelGroup = BTreeMap<String, Channel>;

/// Trajectory timestamp channel (seconds).
pub const CARLA_TS: &str = "carla_ts";

/// Trajectory channel flagging VR control per sample.
pub const IF_VR: &str = "if_vr";

/// VR channel carrying the elapsed-time counter.
pub const TIME_ELAPSED: &str = "TimeElapsed";

/// VR channel carrying CARLA time in milliseconds.
pub const TIMESTAMP_CARLA: &str = "TimestampCarla";

/// Convert CARLA seconds to milliseconds, truncating toward zero.
#[inline]
pub fn seconds_to_ms(ts_s: f64) -> TimestampMs {
    (ts_s * 1000.0) as TimestampMs
}

/// All channels recorded for one vehicle.
///
/// `carla_ts` is the reference channel; every other channel is index-aligned
/// with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSet {
    /// Sample timestamps in seconds.
    pub carla_ts: Vec<f64>,
    /// Every other channel, by name.
    #[serde(flatten)]
    pub channels: BTreeMap<String, Channel>,
}

impl ChannelSet {
    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.carla_ts.len()
    }

    /// True if the vehicle has no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.carla_ts.is_empty()
    }

    /// Look up a non-timestamp channel.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Whether a channel of that name exists, `carla_ts` included.
    pub fn has_channel(&self, name: &str) -> bool {
        name == CARLA_TS || self.channels.contains_key(name)
    }

    /// Sample timestamps converted to milliseconds.
    pub fn timestamps_ms(&self) -> impl Iterator<Item = TimestampMs> + '_ {
        self.carla_ts.iter().map(|&ts| seconds_to_ms(ts))
    }

    /// First and last timestamp in milliseconds.
    pub fn time_range_ms(&self) -> Option<(TimestampMs, TimestampMs)> {
        let first = self.carla_ts.first()?;
        let last = self.carla_ts.last()?;
        Some((seconds_to_ms(*first), seconds_to_ms(*last)))
    }

    /// Whether `if_vr` is true for at least one sample.
    pub fn is_vr_controlled(&self) -> bool {
        self.channels
            .get(IF_VR)
            .map(|flags| flags.iter().any(|v| v == &Value::Bool(true)))
            .unwrap_or(false)
    }

    /// Check that every channel is as long as `carla_ts`.
    pub fn validate(&self, owner: &str) -> Result<()> {
        let expected = self.len();
        for (name, channel) in &self.channels {
            if channel.len() != expected {
                return Err(Error::length_mismatch(owner, name, expected, channel.len()));
            }
        }
        Ok(())
    }

    /// Keep only the samples whose mask entry is true.
    ///
    /// The mask must be as long as the channel set.
    pub fn retain_mask(&self, mask: &[bool]) -> ChannelSet {
        debug_assert_eq!(mask.len(), self.len());
        ChannelSet {
            carla_ts: select(&self.carla_ts, mask),
            channels: self
                .channels
                .iter()
                .map(|(name, channel)| (name.clone(), select(channel, mask)))
                .collect(),
        }
    }

    /// Add a channel, refusing to overwrite an existing one.
    pub fn insert_channel(&mut self, name: impl Into<String>, channel: Channel) -> Result<()> {
        let name = name.into();
        if self.has_channel(&name) {
            return Err(Error::ChannelCollision { channel: name });
        }
        self.channels.insert(name, channel);
        Ok(())
    }
}

fn select<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(v, _)| v.clone())
        .collect()
}

/// Trajectory recording of every tracked vehicle in a trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrajectoryRecord {
    /// Vehicles in the order the recording lists them.
    pub vehicles: IndexMap<VehicleId, ChannelSet>,
}

impl TrajectoryRecord {
    /// Channels of one vehicle.
    pub fn vehicle(&self, id: &str) -> Option<&ChannelSet> {
        self.vehicles.get(id)
    }

    /// Iterate vehicles in record order.
    pub fn iter(&self) -> impl Iterator<Item = (&VehicleId, &ChannelSet)> {
        self.vehicles.iter()
    }

    /// Number of vehicles.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// True if no vehicle was recorded.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Check the equal-length invariant for every vehicle.
    pub fn validate(&self) -> Result<()> {
        for (id, channels) in &self.vehicles {
            channels.validate(&format!("vehicle {id}"))?;
        }
        Ok(())
    }
}

impl FromIterator<(VehicleId, ChannelSet)> for TrajectoryRecord {
    fn from_iter<I: IntoIterator<Item = (VehicleId, ChannelSet)>>(iter: I) -> Self {
        Self {
            vehicles: iter.into_iter().collect(),
        }
    }
}

/// VR / eye-tracking recording of one trial.
///
/// Any `Actors` block in the source is not read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VrRecord {
    #[serde(rename = "TimeElapsed")]
    pub time_elapsed: Channel,
    #[serde(rename = "TimestampCarla")]
    pub timestamp_carla: Vec<TimestampMs>,
    #[serde(rename = "EyeTracker", default)]
    pub eye_tracker: ChannelGroup,
    #[serde(rename = "FocusInfo", default)]
    pub focus_info: ChannelGroup,
    #[serde(rename = "EgoVariables", default)]
    pub ego_variables: ChannelGroup,
    #[serde(rename = "UserInputs", default)]
    pub user_inputs: ChannelGroup,
}

impl VrRecord {
    /// Number of VR samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamp_carla.len()
    }

    /// True if no VR sample was recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamp_carla.is_empty()
    }

    /// The grouped sub-systems with their source names.
    pub fn groups(&self) -> [(&'static str, &ChannelGroup); 4] {
        [
            ("EyeTracker", &self.eye_tracker),
            ("FocusInfo", &self.focus_info),
            ("EgoVariables", &self.ego_variables),
            ("UserInputs", &self.user_inputs),
        ]
    }

    /// First and last VR timestamp in milliseconds.
    pub fn time_range_ms(&self) -> Option<(TimestampMs, TimestampMs)> {
        Some((*self.timestamp_carla.first()?, *self.timestamp_carla.last()?))
    }

    /// Check that every channel is as long as `TimestampCarla`.
    pub fn validate(&self) -> Result<()> {
        let expected = self.len();
        if self.time_elapsed.len() != expected {
            return Err(Error::length_mismatch(
                "VR record",
                TIME_ELAPSED,
                expected,
                self.time_elapsed.len(),
            ));
        }
        for (group, channels) in self.groups() {
            for (name, channel) in channels {
                if channel.len() != expected {
                    return Err(Error::length_mismatch(
                        format!("VR group {group}"),
                        name,
                        expected,
                        channel.len(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Anything that can provide the VR record of a trial.
///
/// Lets callers pass either an already-parsed record or a lazy loader.
pub trait VrSource {
    fn load_vr(&self) -> Result<Cow<'_, VrRecord>>;
}

impl VrSource for VrRecord {
    fn load_vr(&self) -> Result<Cow<'_, VrRecord>> {
        Ok(Cow::Borrowed(self))
    }
}

/// A numeric experiment parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    /// Parse a literal, trying integer first and then float.
    ///
    /// Non-finite floats are rejected.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if let Ok(v) = token.parse::<i64>() {
            return Some(ParamValue::Int(v));
        }
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(ParamValue::Float(v)),
            _ => None,
        }
    }
}

/// Parse a bracketed, comma-separated value list such as `[72, 0.6, 7]`.
///
/// Returns the reason on failure.
pub fn parse_param_list(bracketed: &str) -> std::result::Result<Vec<ParamValue>, String> {
    let inner = bracketed
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| format!("'{bracketed}' is not enclosed in brackets"))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|token| {
            ParamValue::parse(token).ok_or_else(|| format!("'{}' is not a number", token.trim()))
        })
        .collect()
}

/// Experiment metadata carried by a trial's file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMetadata {
    /// Experiment category (e.g. `discretionary`).
    #[serde(rename = "type")]
    pub exp_type: String,
    /// The literal bracketed parameter string, e.g. `[72, 0.6, 64.8, 7]`.
    pub param_name: String,
    /// Parameter values by configured name.
    pub param: BTreeMap<String, ParamValue>,
}

/// One trial with VR channels merged into the ego vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedTrial {
    pub exp_info: TrialMetadata,
    pub vr_id: VehicleId,
    pub all_veh_info: TrajectoryRecord,
}

impl AlignedTrial {
    /// Channels of the ego vehicle.
    pub fn ego(&self) -> Option<&ChannelSet> {
        self.all_veh_info.vehicle(&self.vr_id)
    }
}
