//! JSON configuration and per-tick reports.

use crate::{ConfigError, PipelineError};
use nalgebra::Point2;
use paper_anchor_aruco::MarkerObservation;
use paper_anchor_board::{BoardLayout, MarkerDetectorParams, MarkerRoleMap};
use paper_anchor_core::{CameraIntrinsics, CameraPose, Homography, WorldPose};
use paper_anchor_pose::{CalibrationOffsets, PnpParams};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// What a tick hands back to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    /// World pose of the plane, for 3D overlay.
    #[default]
    Pose,
    /// Reference image warped into the observed quadrilateral.
    Project,
}

fn default_intrinsics() -> CameraIntrinsics {
    CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0, 640, 480)
}

fn default_max_rms_px() -> f64 {
    4.0
}

/// Settings for the image-warping path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    /// Reference-image points mapped onto the board slots. Defaults to the
    /// reference image's own corners.
    pub source_corners: Option<[Point2<f64>; 4]>,
    /// Output size. Defaults to the camera frame size.
    pub output_width: Option<usize>,
    pub output_height: Option<usize>,
}

/// Everything needed to build a [`PaperAnchor`](crate::PaperAnchor).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorConfig {
    #[serde(default)]
    pub mode: AnchorMode,
    #[serde(default = "default_intrinsics")]
    pub intrinsics: CameraIntrinsics,
    #[serde(default)]
    pub board: BoardLayout,
    #[serde(default)]
    pub role_map: MarkerRoleMap,
    #[serde(default)]
    pub detector: MarkerDetectorParams,
    #[serde(default)]
    pub pose: PnpParams,
    /// Pose fits with a larger RMS reprojection error, or that did not
    /// converge, produce no update.
    #[serde(default = "default_max_rms_px")]
    pub max_rms_px: f64,
    #[serde(default)]
    pub offsets: CalibrationOffsets,
    #[serde(default)]
    pub projector: ProjectorConfig,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            mode: AnchorMode::default(),
            intrinsics: default_intrinsics(),
            board: BoardLayout::default(),
            role_map: MarkerRoleMap::default(),
            detector: MarkerDetectorParams::default(),
            pose: PnpParams::default(),
            max_rms_px: default_max_rms_px(),
            offsets: CalibrationOffsets::default(),
            projector: ProjectorConfig::default(),
        }
    }
}

impl AnchorConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Everything one tick produced, for logging and offline inspection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub mode: AnchorMode,
    pub frame_width: usize,
    pub frame_height: usize,
    #[serde(default)]
    pub observations: Vec<MarkerObservation>,
    /// Board corners in slot order (TL, TR, BR, BL).
    #[serde(default)]
    pub quadrilateral: Option<[Point2<f64>; 4]>,
    #[serde(default)]
    pub camera_pose: Option<CameraPose>,
    #[serde(default)]
    pub rms_px: Option<f64>,
    #[serde(default)]
    pub converged: Option<bool>,
    #[serde(default)]
    pub world_pose: Option<WorldPose>,
    /// Reference → frame mapping in projection mode.
    #[serde(default)]
    pub homography: Option<Homography>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TickReport {
    pub fn new(mode: AnchorMode, frame_width: usize, frame_height: usize) -> Self {
        Self {
            mode,
            frame_width,
            frame_height,
            ..Self::default()
        }
    }

    /// `true` when the tick produced an update.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Record why the tick produced no update.
    pub fn set_error(&mut self, err: &PipelineError) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg: AnchorConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(cfg, AnchorConfig::default());
        assert_eq!(cfg.detector.dictionary, "DICT_4X4_50");
        assert_eq!(cfg.max_rms_px, 4.0);
    }

    #[test]
    fn sections_override_independently() {
        let cfg: AnchorConfig = serde_json::from_str(
            r#"{
                "mode": "project",
                "intrinsics": {"fx": 800.0, "fy": 790.0, "cx": 640.0, "cy": 360.0,
                               "width": 1280, "height": 720},
                "pose": {"max_iterations": 10},
                "max_rms_px": 1.5,
                "projector": {"output_width": 320}
            }"#,
        )
        .expect("parse");
        assert_eq!(cfg.mode, AnchorMode::Project);
        assert_eq!(cfg.intrinsics.width, 1280);
        assert_eq!(cfg.intrinsics.skew, 0.0);
        assert_eq!(cfg.pose.max_iterations, 10);
        assert_eq!(cfg.pose.initial_damping, PnpParams::default().initial_damping);
        assert_eq!(cfg.max_rms_px, 1.5);
        assert_eq!(cfg.projector.output_width, Some(320));
        assert_eq!(cfg.projector.output_height, None);
        assert_eq!(cfg.board, BoardLayout::default());
    }

    #[test]
    fn config_and_report_survive_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("anchor.json");
        let cfg = AnchorConfig {
            mode: AnchorMode::Project,
            ..AnchorConfig::default()
        };
        cfg.write_json(&cfg_path).expect("write");
        assert_eq!(AnchorConfig::load_json(&cfg_path).expect("load"), cfg);

        let report_path = dir.path().join("report.json");
        let mut report = TickReport::new(AnchorMode::Pose, 640, 480);
        report.set_error(&PipelineError::MissingReference);
        report.write_json(&report_path).expect("write");
        let back = TickReport::load_json(&report_path).expect("load");
        assert!(!back.is_success());
        assert_eq!(back, report);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AnchorConfig::load_json("/nonexistent/paper-anchor.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
