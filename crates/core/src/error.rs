//! Error types for the vrdrive system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the vrdrive system.
#[derive(Error, Debug)]
pub enum Error {
    /// No vehicle in the trajectory record is flagged as VR-controlled.
    #[error("No vehicle has `if_vr` set; cannot identify the ego vehicle")]
    EgoVehicleNotFound,

    /// The VR and trajectory time ranges do not intersect.
    #[error("No overlap between VR and trajectory data: window [{start_ms}, {end_ms}] is empty")]
    NoOverlap { start_ms: i64, end_ms: i64 },

    /// The trial name does not follow `<type>_[v1, v2, ...].ext`.
    #[error("Malformed trial name '{name}': {reason}")]
    MalformedTrialName { name: String, reason: String },

    /// A channel's length differs from its reference timestamp channel.
    #[error("Channel '{channel}' of {owner} has {actual} samples, expected {expected}")]
    ChannelLengthMismatch {
        owner: String,
        channel: String,
        expected: usize,
        actual: usize,
    },

    /// A merged VR channel would overwrite an existing channel.
    #[error("Channel '{channel}' already exists on the ego vehicle")]
    ChannelCollision { channel: String },

    /// Insufficient data for computation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or missing data).
    #[error("Data error: {0}")]
    Data(String),

    /// Failure while processing a specific trial.
    #[error("Trial '{trial}': {source}")]
    Trial {
        trial: String,
        #[source]
        source: Box<Error>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error category, independent of any trial tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EgoVehicleNotFound,
    NoOverlap,
    MalformedTrialName,
    ChannelLengthMismatch,
    ChannelCollision,
    InsufficientData,
    Config,
    Data,
    Io,
    Json,
}

impl Error {
    /// Create a malformed trial name error.
    pub fn malformed_trial_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedTrialName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a channel length mismatch error.
    pub fn length_mismatch(
        owner: impl Into<String>,
        channel: impl Into<String>,
        expected: usize,
        actual: usize,
    ) -> Self {
        Error::ChannelLengthMismatch {
            owner: owner.into(),
            channel: channel.into(),
            expected,
            actual,
        }
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Error::InsufficientData(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Attach a trial identifier. Already-tagged errors are returned as is.
    pub fn in_trial(self, trial: impl Into<String>) -> Self {
        match self {
            tagged @ Error::Trial { .. } => tagged,
            other => Error::Trial {
                trial: trial.into(),
                source: Box::new(other),
            },
        }
    }

    /// Category of the underlying error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EgoVehicleNotFound => ErrorKind::EgoVehicleNotFound,
            Error::NoOverlap { .. } => ErrorKind::NoOverlap,
            Error::MalformedTrialName { .. } => ErrorKind::MalformedTrialName,
            Error::ChannelLengthMismatch { .. } => ErrorKind::ChannelLengthMismatch,
            Error::ChannelCollision { .. } => ErrorKind::ChannelCollision,
            Error::InsufficientData(_) => ErrorKind::InsufficientData,
            Error::Config(_) => ErrorKind::Config,
            Error::Data(_) => ErrorKind::Data,
            Error::Trial { source, .. } => source.kind(),
            Error::Io(_) => ErrorKind::Io,
            Error::Json(_) => ErrorKind::Json,
        }
    }

    /// The underlying error, looking through any trial tag.
    pub fn root(&self) -> &Error {
        match self {
            Error::Trial { source, .. } => source.root(),
            other => other,
        }
    }
}
