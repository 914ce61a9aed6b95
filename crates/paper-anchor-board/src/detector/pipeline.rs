use super::{DetectionFailure, DetectorConfigError, MarkerDetectorParams};
use crate::assemble_quadrilateral;
use crate::board::{MarkerRoleMap, Quadrilateral};
use log::debug;
use paper_anchor_aruco::{builtins, detect_markers, MarkerObservation, Matcher};
use paper_anchor_core::FrameView;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Observations plus the assembly outcome for one frame.
#[derive(Clone, Debug)]
pub struct BoardDetection {
    pub observations: Vec<MarkerObservation>,
    pub quadrilateral: Result<Quadrilateral, DetectionFailure>,
}

/// Finds the four board markers in a frame and assembles the quadrilateral.
#[derive(Clone, Debug)]
pub struct MarkerDetector {
    params: MarkerDetectorParams,
    role_map: MarkerRoleMap,
    matcher: Matcher,
}

impl MarkerDetector {
    pub fn new(
        params: MarkerDetectorParams,
        role_map: MarkerRoleMap,
    ) -> Result<Self, DetectorConfigError> {
        let dict = builtins::builtin_dictionary(&params.dictionary)
            .ok_or_else(|| DetectorConfigError::UnknownDictionary(params.dictionary.clone()))?;
        if dict.len() < MarkerRoleMap::MARKER_COUNT {
            return Err(DetectorConfigError::NotEnoughMarkers {
                name: dict.name,
                available: dict.len(),
                needed: MarkerRoleMap::MARKER_COUNT,
            });
        }
        let matcher = Matcher::new(dict, params.markers.max_hamming);
        Ok(Self {
            params,
            role_map,
            matcher,
        })
    }

    #[inline]
    pub fn params(&self) -> &MarkerDetectorParams {
        &self.params
    }

    #[inline]
    pub fn role_map(&self) -> &MarkerRoleMap {
        &self.role_map
    }

    pub fn set_role_map(&mut self, role_map: MarkerRoleMap) {
        self.role_map = role_map;
    }

    /// Decode every marker in the frame.
    pub fn observe(&self, frame: &FrameView<'_>) -> Vec<MarkerObservation> {
        let gray = frame.to_gray();
        detect_markers(&gray.view(), &self.params.markers, &self.matcher)
    }

    /// Detect the board quadrilateral.
    pub fn detect(&self, frame: &FrameView<'_>) -> Result<Quadrilateral, DetectionFailure> {
        self.detect_with_observations(frame).quadrilateral
    }

    /// Like [`detect`](Self::detect) but keeps the raw observations.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = frame.width, height = frame.height))
    )]
    pub fn detect_with_observations(&self, frame: &FrameView<'_>) -> BoardDetection {
        let observations = self.observe(frame);
        let quadrilateral = assemble_quadrilateral(&observations, &self.role_map);
        match &quadrilateral {
            Ok(q) => debug!("board quadrilateral {:?}", q.corners()),
            Err(e) => debug!("no board quadrilateral: {e}"),
        }
        BoardDetection {
            observations,
            quadrilateral,
        }
    }
}
