use paper_anchor_aruco::MarkerDetectParams;
use serde::{Deserialize, Serialize};

fn default_dictionary() -> String {
    "DICT_4X4_50".to_string()
}

/// Configuration for the board detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetectorParams {
    /// Built-in dictionary name.
    #[serde(default = "default_dictionary")]
    pub dictionary: String,
    /// Frame-level marker detection.
    #[serde(default)]
    pub markers: MarkerDetectParams,
}

impl Default for MarkerDetectorParams {
    fn default() -> Self {
        Self {
            dictionary: default_dictionary(),
            markers: MarkerDetectParams::default(),
        }
    }
}
