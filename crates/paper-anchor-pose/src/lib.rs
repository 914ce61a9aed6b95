//! Board pose from four image corners, and its conversion into the host's
//! world frame.
//!
//! [`PlanarPoseEstimator`] solves the camera-frame pose of a planar target
//! from exactly four correspondences. [`CoordinateTransformer`] turns that
//! pose into a [`paper_anchor_core::WorldPose`] given the tracked eye pose.
//!
//! ```
//! use nalgebra::{Point2, Point3};
//! use paper_anchor_core::CameraIntrinsics;
//! use paper_anchor_pose::PlanarPoseEstimator;
//!
//! let k = CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0, 640, 480);
//! let object = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(0.1, 0.0, 0.0),
//!     Point3::new(0.1, 0.1, 0.0),
//!     Point3::new(0.0, 0.1, 0.0),
//! ];
//! let image = [
//!     Point2::new(320.0, 240.0),
//!     Point2::new(420.0, 240.0),
//!     Point2::new(420.0, 340.0),
//!     Point2::new(320.0, 340.0),
//! ];
//! let est = PlanarPoseEstimator::default().estimate(&image, &object, &k).unwrap();
//! assert!((est.translation().z - 0.5).abs() < 1e-6);
//! ```

mod error;
mod pnp;
mod transform;

pub use error::PoseError;
pub use pnp::{PlanarPoseEstimator, PlanePoseEstimate, PnpParams};
pub use transform::{
    apply_offsets, compose_with_eye, flip_vertical_axis, look_orientation, CalibrationOffsets,
    CoordinateTransformer, EulerDegrees,
};
