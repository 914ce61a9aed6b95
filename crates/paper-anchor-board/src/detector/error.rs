/// Why a frame did not yield a quadrilateral.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionFailure {
    #[error("marker ids {missing:?} not found (observed {observed:?})")]
    MissingIds { missing: Vec<u32>, observed: Vec<u32> },
    #[error("marker id {0} observed more than once")]
    DuplicateId(u32),
    #[error("marker id {0} is not part of the board")]
    UnrecognizedId(u32),
}

/// Errors building a [`MarkerDetector`](super::MarkerDetector).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorConfigError {
    #[error("unknown marker dictionary {0:?}")]
    UnknownDictionary(String),
    #[error("dictionary {name} has {available} markers, the board needs {needed}")]
    NotEnoughMarkers {
        name: &'static str,
        available: usize,
        needed: usize,
    },
}
