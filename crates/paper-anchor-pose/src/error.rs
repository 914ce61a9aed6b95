use paper_anchor_core::IntrinsicsError;

/// Errors returned by the planar pose estimator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error(transparent)]
    InvalidIntrinsics(#[from] IntrinsicsError),
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
    #[error("object points are not on z = 0 (|z| up to {max_abs_z})")]
    NotPlanar { max_abs_z: f64 },
    #[error("input points contain non-finite values")]
    NonFinite,
}
