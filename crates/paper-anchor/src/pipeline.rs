//! One camera frame in, one host update (or a reason for none) out.

use crate::config::{AnchorConfig, AnchorMode, ProjectorConfig, TickReport};
use crate::projector::{image_corners, HomographyProjector};
use crate::{ConfigError, PipelineError};
use log::{debug, log, Level};
use nalgebra::Point2;
use paper_anchor_board::{BoardLayout, MarkerDetector, MarkerRoleMap, Quadrilateral};
use paper_anchor_core::{
    CameraIntrinsics, EyePose, Frame, FrameView, HomographyError, PixelFormat, WorldPose,
};
use paper_anchor_pose::{CoordinateTransformer, PlanarPoseEstimator, PlanePoseEstimate};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Result of a successful tick.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutput {
    Pose(WorldPose),
    Image(Frame),
}

/// Per-frame alignment pipeline.
///
/// Holds configuration only; every buffer created during a tick is dropped
/// before it returns.
#[derive(Clone, Debug)]
pub struct PaperAnchor {
    mode: AnchorMode,
    intrinsics: CameraIntrinsics,
    layout: BoardLayout,
    detector: MarkerDetector,
    estimator: PlanarPoseEstimator,
    max_rms_px: f64,
    transformer: CoordinateTransformer,
    projector: ProjectorConfig,
    reference: Option<Frame>,
}

impl PaperAnchor {
    pub fn new(config: AnchorConfig) -> Result<Self, ConfigError> {
        let detector = MarkerDetector::new(config.detector, config.role_map)?;
        let (out_w, out_h) = (config.projector.output_width, config.projector.output_height);
        if out_w == Some(0) || out_h == Some(0) {
            return Err(ConfigError::Projector(HomographyError::InvalidOutputSize {
                width: out_w.unwrap_or_default(),
                height: out_h.unwrap_or_default(),
            }));
        }
        Ok(Self {
            mode: config.mode,
            intrinsics: config.intrinsics,
            layout: config.board,
            detector,
            estimator: PlanarPoseEstimator::new(config.pose),
            max_rms_px: config.max_rms_px,
            transformer: CoordinateTransformer::new(config.offsets),
            projector: config.projector,
            reference: None,
        })
    }

    /// Build from a JSON config file.
    pub fn from_json(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        Self::new(AnchorConfig::load_json(path)?)
    }

    #[inline]
    pub fn mode(&self) -> AnchorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AnchorMode) {
        self.mode = mode;
    }

    #[inline]
    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    /// Takes effect from the next tick.
    pub fn set_intrinsics(&mut self, intrinsics: CameraIntrinsics) {
        self.intrinsics = intrinsics;
    }

    #[inline]
    pub fn role_map(&self) -> &MarkerRoleMap {
        self.detector.role_map()
    }

    pub fn set_role_map(&mut self, role_map: MarkerRoleMap) {
        self.detector.set_role_map(role_map);
    }

    /// RMS reprojection error (pixels) above which a pose is rejected.
    #[inline]
    pub fn max_rms_px(&self) -> f64 {
        self.max_rms_px
    }

    pub fn set_max_rms_px(&mut self, max_rms_px: f64) {
        self.max_rms_px = max_rms_px;
    }

    #[inline]
    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    /// Image warped into the board in [`AnchorMode::Project`].
    pub fn set_reference(&mut self, reference: Frame) {
        self.reference = Some(reference);
    }

    pub fn reference(&self) -> Option<&Frame> {
        self.reference.as_ref()
    }

    /// Run one frame through the pipeline.
    ///
    /// `Err` means "no update this tick"; the host keeps its previous state.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = frame.width, height = frame.height))
    )]
    pub fn tick(&self, frame: &FrameView<'_>, eye: &EyePose) -> Result<TickOutput, PipelineError> {
        let result = self
            .detector
            .detect(frame)
            .map_err(PipelineError::from)
            .and_then(|quad| match self.mode {
                AnchorMode::Pose => {
                    let estimate = self.solve(&quad)?;
                    Ok(TickOutput::Pose(self.world_pose(&estimate, eye)?))
                }
                AnchorMode::Project => self.project(frame, &quad).map(TickOutput::Image),
            });
        if let Err(e) = &result {
            log!(rejection_level(e), "tick rejected: {e}");
        }
        result
    }

    /// Validate a raw buffer and [`tick`](Self::tick) it.
    pub fn tick_raw(
        &self,
        width: usize,
        height: usize,
        format: PixelFormat,
        data: &[u8],
        eye: &EyePose,
    ) -> Result<TickOutput, PipelineError> {
        let frame = FrameView::new(width, height, format, data)?;
        self.tick(&frame, eye)
    }

    /// Same stages as [`tick`](Self::tick), recording every intermediate.
    pub fn tick_report(
        &self,
        frame: &FrameView<'_>,
        eye: &EyePose,
    ) -> (TickReport, Result<TickOutput, PipelineError>) {
        let mut report = TickReport::new(self.mode, frame.width, frame.height);
        let detection = self.detector.detect_with_observations(frame);
        report.observations = detection.observations;

        let result = detection.quadrilateral.map_err(PipelineError::from).and_then(|quad| {
            report.quadrilateral = Some(*quad.corners());
            match self.mode {
                AnchorMode::Pose => {
                    let estimate = self.solve(&quad)?;
                    report.camera_pose = Some(estimate.pose);
                    report.rms_px = Some(estimate.rms_px);
                    report.converged = Some(estimate.converged);
                    let world = self.world_pose(&estimate, eye)?;
                    report.world_pose = Some(world);
                    Ok(TickOutput::Pose(world))
                }
                AnchorMode::Project => {
                    let (projector, reference) = self.projector_for(frame)?;
                    report.homography = Some(projector.homography(&quad)?);
                    Ok(TickOutput::Image(projector.project(&reference.view(), &quad)?))
                }
            }
        });
        if let Err(e) = &result {
            log!(rejection_level(e), "tick rejected: {e}");
            report.set_error(e);
        }
        (report, result)
    }

    fn solve(&self, quad: &Quadrilateral) -> Result<PlanePoseEstimate, PipelineError> {
        Ok(self.estimator.estimate(
            quad.corners(),
            &self.layout.object_points,
            &self.intrinsics,
        )?)
    }

    /// Gate the fit on convergence and RMS, then map it to the world frame.
    fn world_pose(
        &self,
        estimate: &PlanePoseEstimate,
        eye: &EyePose,
    ) -> Result<WorldPose, PipelineError> {
        if !estimate.converged {
            return Err(PipelineError::DegenerateGeometry(format!(
                "pose refinement did not converge after {} iterations (rms {:.3} px)",
                estimate.iterations, estimate.rms_px
            )));
        }
        if estimate.rms_px > self.max_rms_px {
            return Err(PipelineError::DegenerateGeometry(format!(
                "reprojection rms {:.3} px exceeds {:.3} px",
                estimate.rms_px, self.max_rms_px
            )));
        }
        let world = self.transformer.to_world(&estimate.pose, eye);
        debug!(
            "board at {:?} (rms {:.3} px)",
            world.position.coords.as_slice(),
            estimate.rms_px
        );
        Ok(world)
    }

    fn project(&self, frame: &FrameView<'_>, quad: &Quadrilateral) -> Result<Frame, PipelineError> {
        let (projector, reference) = self.projector_for(frame)?;
        Ok(projector.project(&reference.view(), quad)?)
    }

    fn projector_for(
        &self,
        frame: &FrameView<'_>,
    ) -> Result<(HomographyProjector, &Frame), PipelineError> {
        let reference = self.reference.as_ref().ok_or(PipelineError::MissingReference)?;
        let source: [Point2<f64>; 4] = self
            .projector
            .source_corners
            .unwrap_or_else(|| image_corners(reference.width, reference.height));
        let projector = HomographyProjector::new(
            source,
            self.projector.output_width.unwrap_or(frame.width),
            self.projector.output_height.unwrap_or(frame.height),
        )?;
        Ok((projector, reference))
    }
}

/// A hidden page is the normal idle state; everything else deserves a warning.
fn rejection_level(err: &PipelineError) -> Level {
    match err {
        PipelineError::Detection(_) => Level::Debug,
        _ => Level::Warn,
    }
}
