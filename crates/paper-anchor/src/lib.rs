//! Align virtual content to a fiducial-marked sheet of paper.
//!
//! Every camera frame goes through the same stages: four ArUco markers are
//! detected and assembled into the page quadrilateral, the plane pose is
//! solved from the four corners, and the pose is converted into the host's
//! world frame. Alternatively the quadrilateral drives a homography that
//! warps a reference image onto the page.
//!
//! ## Quickstart
//!
//! ```no_run
//! use paper_anchor::{AnchorConfig, PaperAnchor, TickOutput};
//! use paper_anchor::core::{EyePose, FrameView, PixelFormat};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let anchor = PaperAnchor::new(AnchorConfig::default())?;
//! let pixels = vec![0u8; 640 * 480];
//! let frame = FrameView::new(640, 480, PixelFormat::Gray8, &pixels)?;
//! match anchor.tick(&frame, &EyePose::identity()) {
//!     Ok(TickOutput::Pose(pose)) => println!("page at {:?}", pose.position),
//!     Ok(TickOutput::Image(img)) => println!("warped {}x{}", img.width, img.height),
//!     Err(e) => println!("no update: {e}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `paper_anchor::core`: frames, intrinsics, poses, homographies, logging.
//! - `paper_anchor::aruco`: embedded dictionary and marker decoding.
//! - `paper_anchor::board`: role map, board layout, quadrilateral detector.
//! - `paper_anchor::pose`: planar pose solver and world-frame conversion.
//! - `paper_anchor::imageio` (feature `image`): `image` crate conversions.

pub use paper_anchor_aruco as aruco;
pub use paper_anchor_board as board;
pub use paper_anchor_core as core;
pub use paper_anchor_pose as pose;

mod config;
mod error;
mod pipeline;
mod projector;

#[cfg(feature = "image")]
pub mod imageio;

pub use config::{AnchorConfig, AnchorMode, ProjectorConfig, TickReport};
pub use error::{ConfigError, FailureKind, PipelineError};
pub use pipeline::{PaperAnchor, TickOutput};
pub use projector::{image_corners, HomographyProjector};
