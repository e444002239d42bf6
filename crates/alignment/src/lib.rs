//! Trial alignment for the vrdrive system.
//!
//! This crate handles:
//! - Ego (VR-driven) vehicle identification
//! - Overlap window computation and trajectory trimming
//! - Nearest-timestamp VR resampling without sample reuse
//! - Flattening VR channels into the ego vehicle
//! - Trial metadata parsing from file names

pub mod ego;
pub mod window;
pub mod matcher;
pub mod merge;
pub mod trial_name;
pub mod aligner;

pub use ego::find_vr_vehicle;
pub use window::{overlap_window, trim, OverlapWindow};
pub use matcher::{match_nearest, VrMatches};
pub use merge::merge_vr_channels;
pub use trial_name::TrialNameParser;
pub use aligner::TrialAligner;
