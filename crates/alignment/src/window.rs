//! Overlap window computation and trajectory trimming.

use tracing::debug;
use vrdrive_core::{
    seconds_to_ms, Error, Result, TimestampMs, TrajectoryRecord, VrRecord,
};

/// Inclusive millisecond time range covered by both sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapWindow {
    pub start_ms: TimestampMs,
    pub end_ms: TimestampMs,
}

impl OverlapWindow {
    /// Intersect two inclusive ranges. Fails with `NoOverlap` if disjoint.
    pub fn intersect(
        a: (TimestampMs, TimestampMs),
        b: (TimestampMs, TimestampMs),
    ) -> Result<Self> {
        let start_ms = a.0.max(b.0);
        let end_ms = a.1.min(b.1);
        if start_ms > end_ms {
            return Err(Error::NoOverlap { start_ms, end_ms });
        }
        Ok(Self { start_ms, end_ms })
    }

    /// Whether a timestamp lies inside the window (bounds included).
    #[inline]
    pub fn contains(&self, ts_ms: TimestampMs) -> bool {
        self.start_ms <= ts_ms && ts_ms <= self.end_ms
    }

    /// Window length in milliseconds.
    pub fn duration_ms(&self) -> TimestampMs {
        self.end_ms - self.start_ms
    }
}

/// Time range present in both the VR record and the ego vehicle's trajectory.
pub fn overlap_window(
    trajectory: &TrajectoryRecord,
    vr: &VrRecord,
    ego_id: &str,
) -> Result<OverlapWindow> {
    let ego = trajectory
        .vehicle(ego_id)
        .ok_or_else(|| Error::data(format!("vehicle {ego_id} is not in the trajectory record")))?;

    let vr_range = vr
        .time_range_ms()
        .ok_or_else(|| Error::insufficient_data("VR record has no samples"))?;
    let traj_range = ego
        .time_range_ms()
        .ok_or_else(|| Error::insufficient_data(format!("vehicle {ego_id} has no samples")))?;

    let window = OverlapWindow::intersect(vr_range, traj_range)?;
    debug!(
        ?vr_range,
        ?traj_range,
        start_ms = window.start_ms,
        end_ms = window.end_ms,
        "overlap window"
    );
    Ok(window)
}

/// Keep only samples whose timestamp falls inside the window.
///
/// Each vehicle is filtered by its own `carla_ts`, so vehicles may end up with
/// different lengths; within a vehicle all channels stay index-aligned.
pub fn trim(trajectory: &TrajectoryRecord, window: OverlapWindow) -> TrajectoryRecord {
    trajectory
        .iter()
        .map(|(id, channels)| {
            let mask: Vec<bool> = channels
                .carla_ts
                .iter()
                .map(|&ts| window.contains(seconds_to_ms(ts)))
                .collect();
            (id.clone(), channels.retain_mask(&mask))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use vrdrive_core::ChannelSet;

    fn make_vehicle(ts: &[f64]) -> ChannelSet {
        let mut channels = BTreeMap::new();
        channels.insert(
            "speed".to_string(),
            ts.iter().map(|&t| json!(t * 10.0)).collect(),
        );
        channels.insert(
            "location".to_string(),
            ts.iter().map(|&t| json!([t, 0.0, 0.0])).collect(),
        );
        ChannelSet {
            carla_ts: ts.to_vec(),
            channels,
        }
    }

    fn make_vr(ts: &[i64]) -> VrRecord {
        VrRecord {
            time_elapsed: ts.iter().map(|&t| json!(t)).collect(),
            timestamp_carla: ts.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_intersect() {
        let w = OverlapWindow::intersect((0, 2000), (500, 3000)).unwrap();
        assert_eq!(w, OverlapWindow { start_ms: 500, end_ms: 2000 });
        assert_eq!(w.duration_ms(), 1500);
    }

    #[test]
    fn test_intersect_disjoint() {
        let err = OverlapWindow::intersect((100, 200), (300, 400)).unwrap_err();
        assert!(matches!(err, Error::NoOverlap { start_ms: 300, end_ms: 200 }));
    }

    #[test]
    fn test_intersect_single_point() {
        let w = OverlapWindow::intersect((0, 300), (300, 400)).unwrap();
        assert_eq!(w.duration_ms(), 0);
        assert!(w.contains(300));
    }

    #[test]
    fn test_intersect_is_commutative() {
        let a = (120, 9_000);
        let b = (0, 4_500);
        assert_eq!(
            OverlapWindow::intersect(a, b).unwrap(),
            OverlapWindow::intersect(b, a).unwrap()
        );
    }

    #[test]
    fn test_overlap_window_uses_ego() {
        let trajectory: TrajectoryRecord = vec![
            ("1".to_string(), make_vehicle(&[0.0, 5.0, 10.0])),
            ("2".to_string(), make_vehicle(&[1.0, 1.5, 2.0, 2.5])),
        ]
        .into_iter()
        .collect();
        let vr = make_vr(&[900, 1200, 2200, 2700]);

        let w = overlap_window(&trajectory, &vr, "2").unwrap();
        assert_eq!(w, OverlapWindow { start_ms: 1000, end_ms: 2500 });
    }

    #[test]
    fn test_overlap_window_truncates_seconds() {
        let trajectory: TrajectoryRecord =
            vec![("1".to_string(), make_vehicle(&[0.0019, 2.0009]))]
                .into_iter()
                .collect();
        let vr = make_vr(&[0, 5000]);

        let w = overlap_window(&trajectory, &vr, "1").unwrap();
        assert_eq!(w, OverlapWindow { start_ms: 1, end_ms: 2000 });
    }

    #[test]
    fn test_overlap_window_no_overlap() {
        let trajectory: TrajectoryRecord =
            vec![("1".to_string(), make_vehicle(&[0.3, 0.4]))].into_iter().collect();
        let vr = make_vr(&[100, 200]);

        assert!(matches!(
            overlap_window(&trajectory, &vr, "1"),
            Err(Error::NoOverlap { .. })
        ));
    }

    #[test]
    fn test_overlap_window_empty_vr() {
        let trajectory: TrajectoryRecord =
            vec![("1".to_string(), make_vehicle(&[0.3, 0.4]))].into_iter().collect();

        assert!(matches!(
            overlap_window(&trajectory, &make_vr(&[]), "1"),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_trim_per_vehicle() {
        let trajectory: TrajectoryRecord = vec![
            ("1".to_string(), make_vehicle(&[0.0, 1.0, 2.0, 3.0])),
            ("2".to_string(), make_vehicle(&[0.5, 1.5, 2.5, 3.5])),
        ]
        .into_iter()
        .collect();
        let window = OverlapWindow { start_ms: 1000, end_ms: 2500 };

        let trimmed = trim(&trajectory, window);

        let v1 = trimmed.vehicle("1").unwrap();
        assert_eq!(v1.carla_ts, vec![1.0, 2.0]);
        assert_eq!(v1.channel("speed").unwrap(), &vec![json!(10.0), json!(20.0)]);

        let v2 = trimmed.vehicle("2").unwrap();
        assert_eq!(v2.carla_ts, vec![1.5, 2.5]);
        assert!(v2.validate("vehicle 2").is_ok());
    }

    #[test]
    fn test_trim_can_empty_a_vehicle() {
        let trajectory: TrajectoryRecord = vec![
            ("1".to_string(), make_vehicle(&[0.0, 1.0])),
            ("2".to_string(), make_vehicle(&[7.0, 8.0])),
        ]
        .into_iter()
        .collect();

        let trimmed = trim(&trajectory, OverlapWindow { start_ms: 0, end_ms: 1000 });
        assert_eq!(trimmed.vehicle("2").unwrap().len(), 0);
        assert!(trimmed.vehicle("2").unwrap().channel("speed").unwrap().is_empty());
    }

    fn ms_range(lo: i64, hi: i64) -> impl Strategy<Value = (i64, i64)> {
        (lo..hi, lo..hi).prop_map(|(a, b)| (a.min(b), a.max(b)))
    }

    proptest! {
        #[test]
        fn prop_intersect_commutative(
            a in ms_range(-1_000_000, 1_000_000),
            b in ms_range(-1_000_000, 1_000_000),
        ) {
            let start = a.0.max(b.0);
            let end = a.1.min(b.1);
            match (OverlapWindow::intersect(a, b), OverlapWindow::intersect(b, a)) {
                (Ok(ab), Ok(ba)) => {
                    prop_assert_eq!(ab, ba);
                    prop_assert_eq!(ab, OverlapWindow { start_ms: start, end_ms: end });
                }
                (
                    Err(Error::NoOverlap { start_ms: s1, end_ms: e1 }),
                    Err(Error::NoOverlap { start_ms: s2, end_ms: e2 }),
                ) => {
                    prop_assert_eq!((s1, e1), (s2, e2));
                    prop_assert!(start > end);
                }
                (ab, ba) => prop_assert!(false, "asymmetric result: {:?} vs {:?}", ab, ba),
            }
        }

        #[test]
        fn prop_trim_keeps_channels_aligned_inside_window(
            vehicles in prop::collection::vec(prop::collection::vec(0i64..10_000, 0..30), 1..5),
            (start_ms, end_ms) in ms_range(0, 10_000),
        ) {
            let trajectory: TrajectoryRecord = vehicles
                .iter()
                .enumerate()
                .map(|(i, ms)| {
                    let mut ms = ms.clone();
                    ms.sort_unstable();
                    let ts: Vec<f64> = ms.iter().map(|&t| t as f64 / 1000.0).collect();
                    (i.to_string(), make_vehicle(&ts))
                })
                .collect();
            let window = OverlapWindow { start_ms, end_ms };

            let trimmed = trim(&trajectory, window);
            prop_assert_eq!(trimmed.len(), trajectory.len());
            for (id, channels) in trimmed.iter() {
                prop_assert!(channels.validate(id).is_ok());
                prop_assert!(channels.timestamps_ms().all(|ts| window.contains(ts)));

                let expected = trajectory
                    .vehicle(id)
                    .unwrap()
                    .timestamps_ms()
                    .filter(|&ts| window.contains(ts))
                    .count();
                prop_assert_eq!(channels.len(), expected);
            }
        }
    }
}
