//! JSON loading and saving of trial recordings.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use vrdrive_core::{AlignedTrial, Error, Result, TrajectoryRecord, VrRecord, VrSource};

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|e| Error::data(format!("{}: {e}", path.display())))
}

/// Serialize to a JSON file with 4-space indentation.
///
/// Parent directories are created as needed.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    {
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
        value.serialize(&mut ser)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), "wrote JSON");
    Ok(())
}

/// Load a trajectory recording.
pub fn read_trajectory(path: impl AsRef<Path>) -> Result<TrajectoryRecord> {
    read_json(path)
}

/// Load a VR recording.
pub fn read_vr(path: impl AsRef<Path>) -> Result<VrRecord> {
    read_json(path)
}

/// Load a previously written aligned trial.
pub fn read_aligned(path: impl AsRef<Path>) -> Result<AlignedTrial> {
    read_json(path)
}

/// Save an aligned trial.
pub fn write_aligned(path: impl AsRef<Path>, trial: &AlignedTrial) -> Result<()> {
    write_json(path, trial)
}

/// VR recording loaded from disk only when the aligner asks for it.
#[derive(Debug, Clone)]
pub struct VrFile {
    path: PathBuf,
}

impl VrFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VrSource for VrFile {
    fn load_vr(&self) -> Result<Cow<'_, VrRecord>> {
        read_vr(&self.path).map(Cow::Owned)
    }
}
