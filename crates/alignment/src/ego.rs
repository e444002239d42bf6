//! Ego (VR-driven) vehicle identification.

use tracing::{debug, warn};
use vrdrive_core::{Error, Result, TrajectoryRecord, VehicleId};

/// Find the vehicle driven from the VR rig.
///
/// Returns the first vehicle, in record order, whose `if_vr` channel holds
/// `true` at least once.
pub fn find_vr_vehicle(trajectory: &TrajectoryRecord) -> Result<VehicleId> {
    let mut flagged = trajectory
        .iter()
        .filter(|(_, channels)| channels.is_vr_controlled())
        .map(|(id, _)| id);

    let ego = flagged.next().ok_or(Error::EgoVehicleNotFound)?;

    let others: Vec<&VehicleId> = flagged.collect();
    if !others.is_empty() {
        warn!(ego = %ego, ?others, "multiple vehicles flagged as VR-controlled; using the first");
    }

    debug!(ego = %ego, "identified VR vehicle");
    Ok(ego.clone())
}
