//! Board detection: decode markers in a frame, then assemble the
//! quadrilateral from the role map.

mod error;
mod params;
mod pipeline;

pub use error::{DetectionFailure, DetectorConfigError};
pub use params::MarkerDetectorParams;
pub use pipeline::{BoardDetection, MarkerDetector};
