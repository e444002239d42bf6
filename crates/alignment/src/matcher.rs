//! Nearest-timestamp matching of trajectory samples onto VR samples.
//!
//! Every trajectory timestamp takes the closest VR sample that no earlier
//! trajectory timestamp has taken. Ties go to the lowest VR index. Once all
//! VR samples are taken, further timestamps reuse the plain nearest sample;
//! those reuses are counted in [`VrMatches::forced_reuse`].
//!
//! Match distance is not bounded: when VR samples run short a trajectory
//! timestamp can be paired with a sample arbitrarily far away.

use vrdrive_core::TimestampMs;

/// Result of matching trajectory timestamps onto VR timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VrMatches {
    /// VR index chosen for each trajectory timestamp, in trajectory order.
    pub indices: Vec<usize>,
    /// Absolute distance of each match (ms).
    pub distances_ms: Vec<u64>,
    /// Matches that had to reuse an already-taken VR index.
    pub forced_reuse: usize,
}

impl VrMatches {
    /// Number of matched trajectory timestamps.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True if nothing was matched.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Largest match distance.
    pub fn max_distance_ms(&self) -> Option<u64> {
        self.distances_ms.iter().copied().max()
    }

    /// Number of matches further than `limit_ms`.
    pub fn count_beyond(&self, limit_ms: u64) -> usize {
        self.distances_ms.iter().filter(|&&d| d > limit_ms).count()
    }
}

/// Nearest index among candidates accepted by `eligible`; lowest index on ties.
fn nearest<F>(ts: TimestampMs, vr_ts: &[TimestampMs], eligible: F) -> Option<(usize, u64)>
where
    F: Fn(usize) -> bool,
{
    let mut best: Option<(usize, u64)> = None;
    for (j, &candidate) in vr_ts.iter().enumerate() {
        if !eligible(j) {
            continue;
        }
        let distance = ts.abs_diff(candidate);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((j, distance)),
        }
    }
    best
}

/// Match each trajectory timestamp to a VR index without reuse.
///
/// Trajectory timestamps are processed in order, so earlier timestamps get
/// first pick.
pub fn match_nearest(traj_ts: &[TimestampMs], vr_ts: &[TimestampMs]) -> VrMatches {
    let mut used = vec![false; vr_ts.len()];
    let mut matches = VrMatches {
        indices: Vec::with_capacity(traj_ts.len()),
        distances_ms: Vec::with_capacity(traj_ts.len()),
        forced_reuse: 0,
    };

    for &ts in traj_ts {
        let choice = match nearest(ts, vr_ts, |j| !used[j]) {
            Some(found) => Some(found),
            None => {
                let fallback = nearest(ts, vr_ts, |_| true);
                if fallback.is_some() {
                    matches.forced_reuse += 1;
                }
                fallback
            }
        };

        // No VR samples at all: nothing to match against.
        let Some((j, distance)) = choice else {
            break;
        };

        used[j] = true;
        matches.indices.push(j);
        matches.distances_ms.push(distance);
    }

    matches
}
