//! The four-marker paper board.
//!
//! A [`MarkerRoleMap`] says which corner of which marker fills each slot of
//! the [`Quadrilateral`]; a [`BoardLayout`] gives the matching physical
//! points. [`MarkerDetector`] turns a frame into a quadrilateral, failing
//! unless exactly the four board markers are seen.
//!
//! ```no_run
//! use paper_anchor_board::{MarkerDetector, MarkerDetectorParams, MarkerRoleMap};
//! use paper_anchor_core::{FrameView, PixelFormat};
//!
//! let pixels = vec![255u8; 640 * 480];
//! let frame = FrameView::new(640, 480, PixelFormat::Gray8, &pixels).unwrap();
//! let detector =
//!     MarkerDetector::new(MarkerDetectorParams::default(), MarkerRoleMap::DEFAULT).unwrap();
//! match detector.detect(&frame) {
//!     Ok(quad) => println!("board at {:?}", quad.corners()),
//!     Err(reason) => println!("no board: {reason}"),
//! }
//! ```

mod assemble;
mod board;
mod detector;
mod render;

pub use assemble::assemble_quadrilateral;
pub use board::{
    BoardLayout, Corner, MarkerRole, MarkerRoleMap, Quadrilateral, RoleMapError, LETTER_WIDTH_M,
};
pub use detector::{
    BoardDetection, DetectionFailure, DetectorConfigError, MarkerDetector, MarkerDetectorParams,
};
pub use render::{render_board, render_board_view, BoardPainter, RenderError, INK, PAPER};
