//! Fiducial marker detection for paper-anchor.
//!
//! This crate covers:
//! - an embedded 4x4 dictionary (compiled into the binary),
//! - matching observed codes against it in all four rotations,
//! - dark-blob quad candidates from a globally thresholded frame,
//! - per-quad bit sampling and decoding,
//! - marker rendering for printing and synthetic frames.

pub mod builtins;
mod detect;
mod dictionary;
mod draw;
mod matcher;
mod quad;
mod scan;
mod threshold;

pub use detect::{detect_markers, MarkerDetectParams, MarkerObservation};
pub use dictionary::Dictionary;
pub use draw::{draw_marker, marker_cell_is_black};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use quad::{find_dark_quads, QuadCandidate, QuadParams};
pub use scan::{decode_marker_in_quad, MarkerDecode, ScanDecodeConfig};
pub use threshold::{otsu_threshold, otsu_threshold_from_histogram};
