//! Pinhole camera intrinsics supplied by the host camera subsystem.
//!
//! Frames are assumed to be undistorted upstream, so the model carries no
//! distortion coefficients.

use nalgebra::{Matrix3, Point2, Point3};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum IntrinsicsError {
    #[error("intrinsics contain non-finite values")]
    NonFinite,
    #[error("focal lengths must be > 0 (fx={fx}, fy={fy})")]
    NonPositiveFocalLength { fx: f64, fy: f64 },
    #[error("resolution must be non-zero (width={width}, height={height})")]
    InvalidResolution { width: u32, height: u32 },
    #[error("principal point ({cx}, {cy}) lies outside the {width}x{height} image")]
    PrincipalPointOutOfRange {
        cx: f64,
        cy: f64,
        width: u32,
        height: u32,
    },
}

/// Pinhole intrinsics with optional skew, valid at `width x height`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in pixels along X.
    pub fx: f64,
    /// Focal length in pixels along Y.
    pub fy: f64,
    /// Principal point X coordinate in pixels.
    pub cx: f64,
    /// Principal point Y coordinate in pixels.
    pub cy: f64,
    /// Skew term (typically 0).
    #[serde(default)]
    pub skew: f64,
    /// Resolution the intrinsics apply to.
    pub width: u32,
    pub height: u32,
}

impl CameraIntrinsics {
    /// Zero-skew intrinsics.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            skew: 0.0,
            width,
            height,
        }
    }

    pub fn validate(&self) -> Result<(), IntrinsicsError> {
        if ![self.fx, self.fy, self.cx, self.cy, self.skew]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(IntrinsicsError::NonFinite);
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(IntrinsicsError::NonPositiveFocalLength {
                fx: self.fx,
                fy: self.fy,
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(IntrinsicsError::InvalidResolution {
                width: self.width,
                height: self.height,
            });
        }
        if self.cx < 0.0
            || self.cy < 0.0
            || self.cx > self.width as f64
            || self.cy > self.height as f64
        {
            return Err(IntrinsicsError::PrincipalPointOutOfRange {
                cx: self.cx,
                cy: self.cy,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Return the 3x3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, self.skew, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Project a camera-frame point. `None` for points at or behind the
    /// camera plane.
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        if p.z <= f64::EPSILON {
            return None;
        }
        let x = p.x / p.z;
        let y = p.y / p.z;
        Some(self.normalized_to_pixel(&Point2::new(x, y)))
    }

    pub fn normalized_to_pixel(&self, n: &Point2<f64>) -> Point2<f64> {
        Point2::new(
            self.fx * n.x + self.skew * n.y + self.cx,
            self.fy * n.y + self.cy,
        )
    }

    pub fn pixel_to_normalized(&self, pixel: &Point2<f64>) -> Point2<f64> {
        let y = (pixel.y - self.cy) / self.fy;
        let x = (pixel.x - self.cx - self.skew * y) / self.fx;
        Point2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics {
            skew: 0.5,
            ..CameraIntrinsics::new(500.0, 480.0, 320.0, 240.0, 640, 480)
        }
    }

    #[test]
    fn json_without_skew_defaults_to_zero() {
        let k: CameraIntrinsics = serde_json::from_str(
            r#"{"fx": 600.0, "fy": 610.0, "cx": 320.0, "cy": 240.0, "width": 640, "height": 480}"#,
        )
        .expect("parse");
        assert_eq!(k, CameraIntrinsics::new(600.0, 610.0, 320.0, 240.0, 640, 480));
        assert!(k.validate().is_ok());

        let missing_height = r#"{"fx": 600.0, "fy": 610.0, "cx": 320.0, "cy": 240.0, "width": 640}"#;
        assert!(serde_json::from_str::<CameraIntrinsics>(missing_height).is_err());
    }

    #[test]
    fn pixel_normalized_round_trip() {
        let k = intrinsics();
        let px = Point2::new(100.0, 400.0);
        let back = k.normalized_to_pixel(&k.pixel_to_normalized(&px));
        assert_relative_eq!(back, px, epsilon = 1e-9);
    }

    #[test]
    fn projection_matches_k_matrix() {
        let k = intrinsics();
        let p = Point3::new(0.1, -0.05, 0.8);
        let h = k.k_matrix() * p.coords;
        let expected = Point2::new(h.x / h.z, h.y / h.z);
        assert_relative_eq!(k.project(&p).unwrap(), expected, epsilon = 1e-9);
        assert!(k.project(&Point3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn validation_rejects_bad_intrinsics() {
        assert!(intrinsics().validate().is_ok());

        let zero_f = CameraIntrinsics {
            fx: 0.0,
            ..intrinsics()
        };
        assert!(matches!(
            zero_f.validate(),
            Err(IntrinsicsError::NonPositiveFocalLength { .. })
        ));

        let off_image = CameraIntrinsics {
            cx: 700.0,
            ..intrinsics()
        };
        assert!(matches!(
            off_image.validate(),
            Err(IntrinsicsError::PrincipalPointOutOfRange { .. })
        ));

        let nan = CameraIntrinsics {
            cy: f64::NAN,
            ..intrinsics()
        };
        assert_eq!(nan.validate(), Err(IntrinsicsError::NonFinite));
    }
}
