//! Trial aligner.
//!
//! Combines the alignment steps into a single all-or-nothing operation per
//! trial.

use crate::{
    ego::find_vr_vehicle,
    matcher::{match_nearest, VrMatches},
    merge::merge_vr_channels,
    trial_name::TrialNameParser,
    window::{overlap_window, trim},
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vrdrive_core::{
    AlignedTrial, AlignerConfig, Error, Result, ScenarioConfig, TimestampMs, TrajectoryRecord,
    VrSource,
};

/// Aligns one trial's trajectory and VR recordings into an [`AlignedTrial`].
///
/// Holds no per-trial state; a single aligner can be shared across threads.
#[derive(Debug, Clone)]
pub struct TrialAligner {
    scenario: Arc<ScenarioConfig>,
    names: TrialNameParser,
    config: AlignerConfig,
}

impl TrialAligner {
    /// Create an aligner for the given scenario parameter table.
    pub fn new(scenario: Arc<ScenarioConfig>, config: AlignerConfig) -> Self {
        Self {
            names: TrialNameParser::new(Arc::clone(&scenario)),
            scenario,
            config,
        }
    }

    /// The scenario parameter table.
    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    /// Trial-name parser sharing this aligner's parameter table.
    pub fn names(&self) -> &TrialNameParser {
        &self.names
    }

    /// Align one trial.
    ///
    /// Any failure is reported with `trial_name` attached and no partial
    /// result is returned.
    pub fn align<S>(
        &self,
        trajectory: TrajectoryRecord,
        vr: &S,
        trial_name: &str,
    ) -> Result<AlignedTrial>
    where
        S: VrSource + ?Sized,
    {
        self.align_inner(trajectory, vr, trial_name)
            .map_err(|e| e.in_trial(trial_name))
    }

    fn align_inner<S>(
        &self,
        trajectory: TrajectoryRecord,
        vr: &S,
        trial_name: &str,
    ) -> Result<AlignedTrial>
    where
        S: VrSource + ?Sized,
    {
        let exp_info = self.names.parse(trial_name)?;

        trajectory.validate()?;
        let vr = vr.load_vr()?;
        vr.validate()?;

        let vr_id = find_vr_vehicle(&trajectory)?;
        let window = overlap_window(&trajectory, &vr, &vr_id)?;
        let mut all_veh_info = trim(&trajectory, window);

        let ego = all_veh_info
            .vehicles
            .get_mut(&vr_id)
            .ok_or_else(|| Error::data(format!("vehicle {vr_id} lost while trimming")))?;
        let traj_ms: Vec<TimestampMs> = ego.timestamps_ms().collect();
        debug!(
            vr_id = %vr_id,
            ego_samples = traj_ms.len(),
            vr_samples = vr.len(),
            "matching VR samples onto ego timestamps"
        );

        let matches = match_nearest(&traj_ms, &vr.timestamp_carla);
        self.report_matches(trial_name, &matches);
        merge_vr_channels(ego, &vr, &matches.indices)?;

        info!(
            trial = trial_name,
            vr_id = %vr_id,
            start_ms = window.start_ms,
            end_ms = window.end_ms,
            duration_ms = window.duration_ms(),
            samples = matches.len(),
            "aligned trial"
        );

        Ok(AlignedTrial {
            exp_info,
            vr_id,
            all_veh_info,
        })
    }

    fn report_matches(&self, trial_name: &str, matches: &VrMatches) {
        if matches.is_empty() {
            warn!(trial = trial_name, "no ego samples inside the overlap window");
        }
        if matches.forced_reuse > 0 {
            warn!(
                trial = trial_name,
                forced_reuse = matches.forced_reuse,
                "trajectory samples outnumber VR samples; VR samples reused"
            );
        }
        if let Some(limit) = self.config.warn_match_distance_ms {
            let far = matches.count_beyond(limit);
            if far > 0 {
                warn!(
                    trial = trial_name,
                    far,
                    limit_ms = limit,
                    max_distance_ms = ?matches.max_distance_ms(),
                    "VR matches beyond distance limit"
                );
            }
        }
    }
}
