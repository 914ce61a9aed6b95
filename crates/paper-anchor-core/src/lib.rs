//! Core types shared by the paper-anchor crates.
//!
//! Frames and grayscale views, pinhole intrinsics, frame-tagged poses and
//! planar homographies. Nothing here knows about markers or boards.

mod camera;
mod homography;
mod image;
mod logger;
mod pose;

pub use camera::{CameraIntrinsics, IntrinsicsError};
pub use homography::{
    homography_from_4pt, homography_from_4pt_f32, in_general_position, warp_perspective,
    Homography, HomographyError,
};
pub use image::{
    get_gray, sample_bilinear, sample_bilinear_u8, Frame, FrameError, FrameView, GrayImage,
    GrayImageView, PixelFormat,
};
pub use pose::{CameraPose, EyePose, WorldPose};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
