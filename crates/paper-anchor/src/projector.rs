//! 2D alternative to the pose path: warp a reference image into the
//! observed board quadrilateral.

use nalgebra::Point2;
use paper_anchor_board::Quadrilateral;
use paper_anchor_core::{
    homography_from_4pt, warp_perspective, Frame, FrameView, Homography, HomographyError,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Corners of a `width x height` image in slot order, pixel-edge convention.
pub fn image_corners(width: usize, height: usize) -> [Point2<f64>; 4] {
    let (w, h) = (width as f64, height as f64);
    [
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(w, h),
        Point2::new(0.0, h),
    ]
}

/// Maps canonical source corners onto an observed quadrilateral and
/// resamples a reference image accordingly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HomographyProjector {
    source_corners: [Point2<f64>; 4],
    out_width: usize,
    out_height: usize,
}

impl HomographyProjector {
    /// `source_corners` are in reference-image pixels, slot order.
    pub fn new(
        source_corners: [Point2<f64>; 4],
        out_width: usize,
        out_height: usize,
    ) -> Result<Self, HomographyError> {
        if out_width == 0 || out_height == 0 {
            return Err(HomographyError::InvalidOutputSize {
                width: out_width,
                height: out_height,
            });
        }
        Ok(Self {
            source_corners,
            out_width,
            out_height,
        })
    }

    /// Use the full `ref_width x ref_height` reference image as source.
    pub fn for_reference(
        ref_width: usize,
        ref_height: usize,
        out_width: usize,
        out_height: usize,
    ) -> Result<Self, HomographyError> {
        Self::new(image_corners(ref_width, ref_height), out_width, out_height)
    }

    #[inline]
    pub fn source_corners(&self) -> &[Point2<f64>; 4] {
        &self.source_corners
    }

    #[inline]
    pub fn output_size(&self) -> (usize, usize) {
        (self.out_width, self.out_height)
    }

    /// Source → observed mapping for `quad`.
    pub fn homography(&self, quad: &Quadrilateral) -> Result<Homography, HomographyError> {
        self.homography_for_points(quad.corners())
    }

    /// Source → `corners` mapping.
    pub fn homography_for_points(
        &self,
        corners: &[Point2<f64>; 4],
    ) -> Result<Homography, HomographyError> {
        homography_from_4pt(&self.source_corners, corners)
    }

    /// Warp `reference` into `quad`. The result has the projector's output
    /// size and the reference's pixel format.
    pub fn project(
        &self,
        reference: &FrameView<'_>,
        quad: &Quadrilateral,
    ) -> Result<Frame, HomographyError> {
        self.project_to_points(reference, quad.corners())
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(out_w = self.out_width, out_h = self.out_height))
    )]
    pub fn project_to_points(
        &self,
        reference: &FrameView<'_>,
        corners: &[Point2<f64>; 4],
    ) -> Result<Frame, HomographyError> {
        let h = self.homography_for_points(corners)?;
        let src_from_dst = h.inverse().ok_or(HomographyError::Singular)?;
        warp_perspective(reference, &src_from_dst, self.out_width, self.out_height)
    }
}
