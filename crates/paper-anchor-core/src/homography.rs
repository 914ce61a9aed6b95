use crate::{Frame, FrameView};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Minimum triangle area of any three correspondences, relative to the
/// squared mean distance from the centroid, for a 4-point set to count as
/// being in general position.
const MIN_RELATIVE_TRIANGLE_AREA: f64 = 1e-3;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HomographyError {
    #[error("correspondences are degenerate (three points near-collinear)")]
    Degenerate,
    #[error("homography system is singular")]
    Singular,
    #[error("homography has non-finite entries")]
    NonFinite,
    #[error("invalid output size {width}x{height}")]
    InvalidOutputSize { width: usize, height: usize },
}

/// Planar projective transform, normalized so that `h[(2, 2)] == 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }

    #[inline]
    pub fn apply_f32(&self, p: Point2<f32>) -> Point2<f32> {
        let q = self.apply(Point2::new(p.x as f64, p.y as f64));
        Point2::new(q.x as f32, q.y as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        let inv = self.h.try_inverse()?;
        normalize_homography(inv).map(Self::new)
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn centroid_and_spread(pts: &[Point2<f64>]) -> (f64, f64, f64) {
    let n = pts.len() as f64;
    let (mut cx, mut cy) = (0.0, 0.0);
    for p in pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        mean_dist += ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt();
    }
    (cx, cy, mean_dist / n)
}

fn normalize_points(pts: &[Point2<f64>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    // Hartley normalization: translate to centroid, scale so mean distance = sqrt(2)
    let (cx, cy, mean_dist) = centroid_and_spread(pts);
    let t = hartley_normalization(cx, cy, mean_dist);

    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x, p.y, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

fn normalize_homography(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

fn denormalize_homography(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    Some(t_dst_inv * hn * t_src)
}

fn finalize(h: Matrix3<f64>) -> Result<Homography, HomographyError> {
    let h = normalize_homography(h).ok_or(HomographyError::Singular)?;
    if h.iter().any(|v| !v.is_finite()) {
        return Err(HomographyError::NonFinite);
    }
    if h.determinant().abs() < 1e-12 {
        return Err(HomographyError::Singular);
    }
    Ok(Homography::new(h))
}

/// `true` when no three of the 4 points are (near-)collinear.
pub fn in_general_position(pts: &[Point2<f64>; 4]) -> bool {
    if pts.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return false;
    }
    let (_, _, mean_dist) = centroid_and_spread(pts);
    if mean_dist <= f64::EPSILON {
        return false;
    }
    let scale = mean_dist * mean_dist;
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().all(|&[a, b, c]| {
        let ab = pts[b] - pts[a];
        let ac = pts[c] - pts[a];
        let area = 0.5 * (ab.x * ac.y - ab.y * ac.x).abs();
        area / scale > MIN_RELATIVE_TRIANGLE_AREA
    })
}

/// Compute H such that `dst ~ H * src` from exactly 4 correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Fails when
/// either set has three near-collinear points.
pub fn homography_from_4pt(
    src: &[Point2<f64>; 4],
    dst: &[Point2<f64>; 4],
) -> Result<Homography, HomographyError> {
    if !in_general_position(src) || !in_general_position(dst) {
        return Err(HomographyError::Degenerate);
    }

    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
    // h11 x + h12 y + h13 - u h31 x - u h32 y = u
    // h21 x + h22 y + h23 - v h31 x - v h32 y = v
    let (src_n, t_src) = normalize_points(src);
    let (dst_n, t_dst) = normalize_points(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let x = src_n[k].x;
        let y = src_n[k].y;
        let u = dst_n[k].x;
        let v = dst_n[k].y;

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b).ok_or(HomographyError::Singular)?;

    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    let h_den = denormalize_homography(hn, t_src, t_dst).ok_or(HomographyError::Singular)?;
    finalize(h_den)
}

/// `f32` convenience wrapper around [`homography_from_4pt`].
pub fn homography_from_4pt_f32(
    src: &[Point2<f32>; 4],
    dst: &[Point2<f32>; 4],
) -> Result<Homography, HomographyError> {
    let widen = |p: &Point2<f32>| Point2::new(p.x as f64, p.y as f64);
    homography_from_4pt(&src.map(|p| widen(&p)), &dst.map(|p| widen(&p)))
}

/// Inverse-mapping warp: every output pixel center `(x + 0.5, y + 0.5)` is
/// mapped through `h_src_from_dst` and bilinearly sampled from `src`, with
/// the same pixel-center convention. Samples outside `src` are 0.
pub fn warp_perspective(
    src: &FrameView<'_>,
    h_src_from_dst: &Homography,
    out_w: usize,
    out_h: usize,
) -> Result<Frame, HomographyError> {
    if out_w == 0 || out_h == 0 {
        return Err(HomographyError::InvalidOutputSize {
            width: out_w,
            height: out_h,
        });
    }
    let ch = src.format.channels();
    let mut out = vec![0u8; out_w * out_h * ch];

    for y in 0..out_h {
        for x in 0..out_w {
            let q = h_src_from_dst.apply(Point2::new(x as f64 + 0.5, y as f64 + 0.5));
            if !q.x.is_finite() || !q.y.is_finite() {
                continue;
            }
            let sx = (q.x - 0.5) as f32;
            let sy = (q.y - 0.5) as f32;
            let base = (y * out_w + x) * ch;
            for c in 0..ch {
                out[base + c] = src.sample_bilinear(sx, sy, c).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Ok(Frame {
        width: out_w,
        height: out_h,
        format: src.format,
        data: out,
    })
}
