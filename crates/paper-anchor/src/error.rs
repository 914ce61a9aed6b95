use paper_anchor_board::{DetectionFailure, DetectorConfigError};
use paper_anchor_core::{FrameError, HomographyError, IntrinsicsError};
use paper_anchor_pose::PoseError;
use serde::{Deserialize, Serialize};

/// Coarse failure classes a host reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The board was not seen as exactly four known markers.
    DetectionFailure,
    /// The observed or configured geometry admits no solution.
    DegenerateGeometry,
    /// The camera intrinsics are unusable.
    InvalidIntrinsics,
    /// The frame or reference buffer is malformed or absent.
    InvalidInput,
}

/// Why a tick produced no update.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Detection(#[from] DetectionFailure),
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error(transparent)]
    InvalidIntrinsics(#[from] IntrinsicsError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("projection mode needs a reference image")]
    MissingReference,
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Detection(_) => FailureKind::DetectionFailure,
            PipelineError::DegenerateGeometry(_) => FailureKind::DegenerateGeometry,
            PipelineError::InvalidIntrinsics(_) => FailureKind::InvalidIntrinsics,
            PipelineError::Frame(_) | PipelineError::MissingReference => FailureKind::InvalidInput,
        }
    }
}

impl From<PoseError> for PipelineError {
    fn from(err: PoseError) -> Self {
        match err {
            PoseError::InvalidIntrinsics(e) => PipelineError::InvalidIntrinsics(e),
            other => PipelineError::DegenerateGeometry(other.to_string()),
        }
    }
}

impl From<HomographyError> for PipelineError {
    fn from(err: HomographyError) -> Self {
        PipelineError::DegenerateGeometry(err.to_string())
    }
}

/// Errors loading configuration or building a pipeline from it.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Detector(#[from] DetectorConfigError),
    #[error("invalid projector settings: {0}")]
    Projector(HomographyError),
}
