//! Whole-frame marker detection: threshold, quad candidates, decoding.

use crate::quad::{find_dark_quads, QuadParams};
use crate::scan::{decode_marker_in_quad, ScanDecodeConfig};
use crate::threshold::otsu_threshold;
use crate::Matcher;
use log::debug;
use nalgebra::Point2;
use paper_anchor_core::GrayImageView;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One decoded marker with corners in the marker's own orientation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    pub id: u32,
    /// Image corners in the marker's own TL, TR, BR, BL order (clockwise on
    /// screen, y down).
    pub corners: [Point2<f64>; 4],
    pub hamming: u8,
    pub border_score: f32,
}

impl MarkerObservation {
    /// Mean of the four corners.
    pub fn center(&self) -> Point2<f64> {
        let sum = self
            .corners
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / 4.0)
    }
}

/// Parameters for [`detect_markers`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerDetectParams {
    /// Fixed binarization threshold; the frame's Otsu threshold when `None`.
    pub threshold: Option<u8>,
    pub quad: QuadParams,
    pub decode: ScanDecodeConfig,
    /// Maximum Hamming distance for dictionary matching.
    pub max_hamming: u8,
    /// Keep only the best detection per id.
    pub dedup_by_id: bool,
}

impl Default for MarkerDetectParams {
    fn default() -> Self {
        Self {
            threshold: None,
            quad: QuadParams::default(),
            decode: ScanDecodeConfig::default(),
            max_hamming: 1,
            dedup_by_id: false,
        }
    }
}

/// Detect and decode every marker in `image`, in scan order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(width = image.width, height = image.height))
)]
pub fn detect_markers(
    image: &GrayImageView<'_>,
    params: &MarkerDetectParams,
    matcher: &Matcher,
) -> Vec<MarkerObservation> {
    let threshold = params.threshold.unwrap_or_else(|| otsu_threshold(image));
    let quads = find_dark_quads(image, threshold, &params.quad);

    let mut decoded: Vec<(MarkerObservation, f32)> = quads
        .iter()
        .filter_map(|quad| {
            let det = decode_marker_in_quad(image, &quad.corners, &params.decode, matcher)?;
            if det.hamming > params.max_hamming {
                return None;
            }
            let rot = det.rotation as usize;
            let corners = std::array::from_fn(|k| {
                let p = quad.corners[(k + rot) % 4];
                Point2::new(p.x as f64, p.y as f64)
            });
            let obs = MarkerObservation {
                id: det.id,
                corners,
                hamming: det.hamming,
                border_score: det.border_score,
            };
            Some((obs, det.score))
        })
        .collect();

    debug!(
        "threshold {threshold}: {} quad candidates, {} decoded markers",
        quads.len(),
        decoded.len()
    );

    if params.dedup_by_id {
        decoded = dedup_by_id_keep_best(decoded);
    }
    decoded.into_iter().map(|(obs, _)| obs).collect()
}

fn dedup_by_id_keep_best(
    mut dets: Vec<(MarkerObservation, f32)>,
) -> Vec<(MarkerObservation, f32)> {
    // Stable sort keeps scan order among equal scores.
    dets.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut seen = std::collections::HashSet::new();
    dets.retain(|(obs, _)| seen.insert(obs.id));
    dets
}
