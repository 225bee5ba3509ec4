//! Alert snapshots.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use phoenix_models::constants::RECORDING_TIMESTAMP_FORMAT;

use crate::error::MediaResult;
use crate::frame::Frame;

/// `{dir}/alert_{camera}_{%Y-%m-%d_%H-%M-%S}.png`
pub fn snapshot_path(dir: &Path, camera: &str, taken: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "alert_{}_{}.png",
        camera,
        taken.format(RECORDING_TIMESTAMP_FORMAT)
    ))
}

/// Write `frame` as PNG, creating the parent directory.
pub fn write_snapshot(frame: &Frame, path: &Path) -> MediaResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    frame
        .as_image()
        .save_with_format(path, image::ImageFormat::Png)?;
    debug!(path = %path.display(), "Snapshot written");
    Ok(())
}
