//! Merging resampled VR channels into the ego vehicle.

use serde_json::Value;
use vrdrive_core::{
    Channel, ChannelSet, Error, Result, VrRecord, TIMESTAMP_CARLA, TIME_ELAPSED,
};

fn pick<T, F>(values: &[T], indices: &[usize], to_sample: F, channel: &str) -> Result<Channel>
where
    F: Fn(&T) -> Value,
{
    indices
        .iter()
        .map(|&j| {
            values.get(j).map(&to_sample).ok_or_else(|| {
                Error::data(format!(
                    "VR index {j} out of range for '{channel}' ({} samples)",
                    values.len()
                ))
            })
        })
        .collect()
}

/// Resample every VR channel at `indices` and flatten them onto `ego`.
///
/// `TimeElapsed` and `TimestampCarla` keep their names; sub-fields of the
/// grouped VR sub-systems are added under their own names. Existing ego
/// channels are left untouched; a name clash fails with `ChannelCollision`
/// and leaves `ego` unchanged.
pub fn merge_vr_channels(ego: &mut ChannelSet, vr: &VrRecord, indices: &[usize]) -> Result<()> {
    let mut merged: Vec<(String, Channel)> = vec![
        (
            TIME_ELAPSED.to_string(),
            pick(&vr.time_elapsed, indices, Value::clone, TIME_ELAPSED)?,
        ),
        (
            TIMESTAMP_CARLA.to_string(),
            pick(&vr.timestamp_carla, indices, |&ts| Value::from(ts), TIMESTAMP_CARLA)?,
        ),
    ];
    for (_, group) in vr.groups() {
        for (name, channel) in group {
            merged.push((name.clone(), pick(channel, indices, Value::clone, name)?));
        }
    }

    // Check every name before touching the ego vehicle.
    let mut staged = ChannelSet {
        carla_ts: Vec::new(),
        channels: ego.channels.clone(),
    };
    for (name, channel) in merged {
        staged.insert_channel(name, channel)?;
    }
    ego.channels = staged.channels;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn make_ego() -> ChannelSet {
        let mut channels = BTreeMap::new();
        channels.insert("speed".to_string(), vec![json!(1.0), json!(2.0)]);
        channels.insert("if_vr".to_string(), vec![json!(true), json!(true)]);
        ChannelSet {
            carla_ts: vec![1.0, 2.0],
            channels,
        }
    }

    fn make_vr() -> VrRecord {
        let mut vr = VrRecord {
            time_elapsed: vec![json!(0), json!(5), json!(10), json!(15)],
            timestamp_carla: vec![1000, 1500, 2000, 2500],
            ..Default::default()
        };
        vr.eye_tracker.insert(
            "GazeDir".into(),
            vec![json!([1, 0, 0]), json!([0, 1, 0]), json!([0, 0, 1]), json!([1, 1, 0])],
        );
        vr.user_inputs
            .insert("Throttle".into(), vec![json!(0.0), json!(0.1), json!(0.2), json!(0.3)]);
        vr
    }

    #[test]
    fn test_merge_selects_indices_in_order() {
        let mut ego = make_ego();
        merge_vr_channels(&mut ego, &make_vr(), &[0, 2]).unwrap();

        assert_eq!(ego.channel("TimestampCarla").unwrap(), &vec![json!(1000), json!(2000)]);
        assert_eq!(ego.channel("TimeElapsed").unwrap(), &vec![json!(0), json!(10)]);
        assert_eq!(ego.channel("Throttle").unwrap(), &vec![json!(0.0), json!(0.2)]);
        assert_eq!(
            ego.channel("GazeDir").unwrap(),
            &vec![json!([1, 0, 0]), json!([0, 0, 1])]
        );
        assert!(ego.validate("ego").is_ok());
    }

    #[test]
    fn test_merge_leaves_trajectory_channels() {
        let before = make_ego();
        let mut ego = before.clone();
        merge_vr_channels(&mut ego, &make_vr(), &[3, 1]).unwrap();

        assert_eq!(ego.carla_ts, before.carla_ts);
        for (name, channel) in &before.channels {
            assert_eq!(ego.channel(name).unwrap(), channel);
        }
    }

    #[test]
    fn test_merge_rejects_collision() {
        let mut vr = make_vr();
        vr.ego_variables
            .insert("speed".into(), vec![json!(9.0); 4]);
        let mut ego = make_ego();
        let before = ego.clone();

        let err = merge_vr_channels(&mut ego, &vr, &[0, 1]).unwrap_err();
        assert!(matches!(err, Error::ChannelCollision { ref channel } if channel == "speed"));
        assert_eq!(ego, before);
    }

    #[test]
    fn test_merge_rejects_out_of_range_index() {
        let mut ego = make_ego();
        assert!(merge_vr_channels(&mut ego, &make_vr(), &[0, 9]).is_err());
    }
}
