//! Rigid poses tagged by the frame they are expressed in.
//!
//! A [`CameraPose`] maps board-plane coordinates into the camera frame of
//! the vision convention (x right, y down, z forward). A [`WorldPose`] is
//! a position and orientation in the host's render/world convention (y up).
//! The two are distinct types so they cannot be mixed by accident.

use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Board → camera transform: `p_cam = rotation * p_board + translation`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub rotation: Rotation3<f64>,
    /// Translation in meters, camera frame.
    pub translation: Vector3<f64>,
}

impl CameraPose {
    pub fn new(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Rotation3::identity(), Vector3::zeros())
    }

    /// Map a board-plane point into the camera frame.
    #[inline]
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation * p + self.translation
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.translation),
            UnitQuaternion::from_rotation_matrix(&self.rotation),
        )
    }

    /// Rotation angle (radians) between this pose's rotation and `other`'s.
    pub fn rotation_angle_to(&self, other: &CameraPose) -> f64 {
        self.rotation.rotation_to(&other.rotation).angle()
    }
}

/// Position and orientation in the host world (render) convention.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldPose {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

/// Tracked eye/head pose; the camera is rigidly attached to it.
pub type EyePose = WorldPose;

impl WorldPose {
    pub fn new(position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Point3::origin(), UnitQuaternion::identity())
    }
}

impl Default for WorldPose {
    fn default() -> Self {
        Self::identity()
    }
}
