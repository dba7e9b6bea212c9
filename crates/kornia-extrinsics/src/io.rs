//! Output of the calibrated camera pose.
//!
//! The record is a single line, `pose: [x, y, z, qx, qy, qz, qw]`.

use std::path::{Path, PathBuf};

use kornia_lie::SE3;

use crate::{NodeError, TRANSFORM_TOLERANCE};

/// Path of the extrinsics file of `camera_name` inside `dir`.
pub fn extrinsics_path(dir: impl AsRef<Path>, camera_name: &str) -> PathBuf {
    dir.as_ref().join(format!("{camera_name}_extrinsics.yaml"))
}

/// Format a transform as a pose record line, including the trailing newline.
pub fn format_pose_line(transform: &SE3) -> String {
    let values = transform
        .to_pose7()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("pose: [{values}]\n")
}

/// Parse a pose record line written by [`format_pose_line`].
pub fn parse_pose_line(line: &str) -> Result<SE3, NodeError> {
    let malformed = || NodeError::MalformedPose(line.trim().to_string());

    let values = line
        .trim()
        .strip_prefix("pose:")
        .map(str::trim)
        .and_then(|s| s.strip_prefix('['))
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(malformed)?;

    let values = values
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed())?;

    let pose: [f64; 7] = values.try_into().map_err(|_| malformed())?;

    let transform = SE3::from_pose7(pose);
    transform
        .validate(TRANSFORM_TOLERANCE)
        .map_err(|_| malformed())?;
    Ok(transform)
}

/// Write the pose record of `transform` to `path`, creating parent directories.
pub fn write_pose_file(path: impl AsRef<Path>, transform: &SE3) -> Result<(), NodeError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format_pose_line(transform))?;
    Ok(())
}

/// Read the pose record stored at `path`.
pub fn read_pose_file(path: impl AsRef<Path>) -> Result<SE3, NodeError> {
    let contents = std::fs::read_to_string(path)?;
    let line = contents
        .lines()
        .find(|l| l.trim_start().starts_with("pose:"))
        .ok_or_else(|| NodeError::MalformedPose(contents.trim().to_string()))?;
    parse_pose_line(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_format_pose_line() {
        let transform = SE3::new(kornia_lie::SO3::IDENTITY, DVec3::new(0.5, -1.0, 2.25));
        assert_eq!(
            format_pose_line(&transform),
            "pose: [0.5, -1, 2.25, 0, 0, 0, 1]\n"
        );
    }

    #[test]
    fn test_extrinsics_path() {
        assert_eq!(
            extrinsics_path("/tmp/calib", "head_camera"),
            PathBuf::from("/tmp/calib/head_camera_extrinsics.yaml")
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for line in [
            "pose: [1, 2, 3]",
            "position: [0, 0, 0, 0, 0, 0, 1]",
            "pose: [a, 0, 0, 0, 0, 0, 1]",
            "pose: [0, 0, 0, 0, 0, 0, 3]",
        ] {
            assert!(parse_pose_line(line).is_err(), "{line}");
        }
    }

    #[test]
    fn test_file_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = extrinsics_path(dir.path().join("camera_info"), "head_camera");
        let transform =
            SE3::from_axis_angle(DVec3::new(1.0, 2.0, 3.0), 0.7, DVec3::new(0.1, 0.2, 0.3));

        write_pose_file(&path, &transform)?;
        let back = read_pose_file(&path)?;

        // the shortest round-trip float formatting makes the record lossless
        assert_eq!(back, transform);
        Ok(())
    }
}
