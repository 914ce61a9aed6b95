//! Conversion of a board pose from the camera (vision) convention into the
//! host's world convention.
//!
//! The camera frame is x right, y down, z forward. The world frame is y up,
//! so poses are first mirrored through the vertical axis, turned into a
//! look orientation, composed with the tracked eye pose and finally
//! corrected by the rig's calibration offsets.

use nalgebra::{Matrix3, Point3, Rotation3, UnitQuaternion, Vector3};
use paper_anchor_core::{CameraPose, EyePose, WorldPose};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Euler angles in degrees, applied Z first, then X, then Y.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct EulerDegrees {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EulerDegrees {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// `q_y * q_x * q_z`.
    pub fn to_quaternion(&self) -> UnitQuaternion<f64> {
        let qx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.x.to_radians());
        let qy = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.y.to_radians());
        let qz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.z.to_radians());
        qy * qx * qz
    }
}

fn default_plane_frame_correction() -> EulerDegrees {
    EulerDegrees::new(-90.0, 0.0, 0.0)
}

fn default_center_offset() -> Vector3<f64> {
    Vector3::new(0.11, 0.0, -0.11)
}

fn default_front_face_correction() -> EulerDegrees {
    EulerDegrees::new(0.0, 180.0, 0.0)
}

/// Rig calibration applied after composing with the eye pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOffsets {
    /// Turns the plane's local frame into the rendered quad's frame.
    #[serde(default = "default_plane_frame_correction")]
    pub plane_frame_correction: EulerDegrees,
    /// Offset (meters, in the corrected frame) from the board origin to the
    /// rendered content's center.
    #[serde(default = "default_center_offset")]
    pub center_offset: Vector3<f64>,
    /// Flips the rendered quad to face the viewer.
    #[serde(default = "default_front_face_correction")]
    pub front_face_correction: EulerDegrees,
}

impl Default for CalibrationOffsets {
    fn default() -> Self {
        Self {
            plane_frame_correction: default_plane_frame_correction(),
            center_offset: default_center_offset(),
            front_face_correction: default_front_face_correction(),
        }
    }
}

impl CalibrationOffsets {
    /// No correction at all.
    pub fn identity() -> Self {
        Self {
            plane_frame_correction: EulerDegrees::default(),
            center_offset: Vector3::zeros(),
            front_face_correction: EulerDegrees::default(),
        }
    }
}

/// Mirror a pose through the vertical axis: `R' = S R S`, `t' = S t` with
/// `S = diag(1, -1, 1)`.
pub fn flip_vertical_axis(
    rotation: &Rotation3<f64>,
    translation: &Vector3<f64>,
) -> (Rotation3<f64>, Vector3<f64>) {
    let s = Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, 1.0));
    let r = s * rotation.matrix() * s;
    (
        Rotation3::from_matrix_unchecked(r),
        Vector3::new(translation.x, -translation.y, translation.z),
    )
}

/// Orientation looking along the third column of `rotation` with the
/// second column as up hint.
pub fn look_orientation(rotation: &Rotation3<f64>) -> UnitQuaternion<f64> {
    let m = rotation.matrix();
    let forward = m.column(2).into_owned();
    let up = m.column(1).into_owned();
    UnitQuaternion::face_towards(&forward, &up)
}

/// Express a pose given relative to the eye in world coordinates:
/// `p = p_eye + q_eye * t`, `q = q_eye * q_local`.
pub fn compose_with_eye(
    eye: &EyePose,
    local_position: &Vector3<f64>,
    local_orientation: &UnitQuaternion<f64>,
) -> WorldPose {
    WorldPose::new(
        eye.position + eye.orientation * local_position,
        eye.orientation * local_orientation,
    )
}

/// Apply the rig calibration: rotate into the plane frame, shift to the
/// content center, then turn the content to face the viewer.
pub fn apply_offsets(pose: &WorldPose, offsets: &CalibrationOffsets) -> WorldPose {
    let q = pose.orientation * offsets.plane_frame_correction.to_quaternion();
    let p: Point3<f64> = pose.position + q * offsets.center_offset;
    let q = q * offsets.front_face_correction.to_quaternion();
    WorldPose::new(p, q)
}

/// Turns board poses from the camera into world poses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransformer {
    #[serde(default)]
    pub offsets: CalibrationOffsets,
}

impl CoordinateTransformer {
    pub fn new(offsets: CalibrationOffsets) -> Self {
        Self { offsets }
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn to_world(&self, camera: &CameraPose, eye: &EyePose) -> WorldPose {
        let (r, t) = flip_vertical_axis(&camera.rotation, &camera.translation);
        let local = look_orientation(&r);
        let composed = compose_with_eye(eye, &t, &local);
        apply_offsets(&composed, &self.offsets)
    }
}
