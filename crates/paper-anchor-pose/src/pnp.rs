//! Four-point planar pose: homography seed refined by Levenberg-Marquardt
//! on the pixel reprojection error.

use crate::PoseError;
use log::debug;
use nalgebra::{Matrix3, Point2, Point3, Rotation3, SMatrix, SVector, Vector2, Vector3, Vector6};
use paper_anchor_core::{
    homography_from_4pt, in_general_position, CameraIntrinsics, CameraPose, HomographyError,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

type Residuals = SVector<f64, 8>;
type Jacobian = SMatrix<f64, 8, 6>;

/// Cost (squared pixels) below which the solution is taken as exact.
const EXACT_COST: f64 = 1e-20;
const MAX_DAMPING: f64 = 1e12;

/// Solver settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnpParams {
    /// Maximum Levenberg-Marquardt iterations.
    pub max_iterations: usize,
    /// Initial damping, relative to the diagonal of `JᵀJ`.
    pub initial_damping: f64,
    /// Stop once a step is smaller than this (relative to the parameters).
    pub step_tolerance: f64,
    /// Stop once the relative cost decrease falls below this.
    pub cost_tolerance: f64,
    /// Relative central-difference step for the Jacobian.
    pub jacobian_step: f64,
    /// Largest `|z|` (meters) accepted for object points.
    pub planarity_tolerance: f64,
}

impl Default for PnpParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            initial_damping: 1e-3,
            step_tolerance: 1e-12,
            cost_tolerance: 1e-12,
            jacobian_step: 1e-7,
            planarity_tolerance: 1e-9,
        }
    }
}

/// Pose of the board plane in the camera frame plus fit diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanePoseEstimate {
    pub pose: CameraPose,
    /// Projected minus observed position per point, pixels.
    pub residuals_px: [Vector2<f64>; 4],
    /// Root-mean-square reprojection error, pixels.
    pub rms_px: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl PlanePoseEstimate {
    #[inline]
    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.pose.rotation
    }

    #[inline]
    pub fn translation(&self) -> &Vector3<f64> {
        &self.pose.translation
    }

    /// Converged with an RMS reprojection error of at most `max_rms_px`.
    pub fn is_confident(&self, max_rms_px: f64) -> bool {
        self.converged && self.rms_px <= max_rms_px
    }
}

/// Solves board→camera pose from four image/object correspondences.
#[derive(Clone, Debug, Default)]
pub struct PlanarPoseEstimator {
    params: PnpParams,
}

impl PlanarPoseEstimator {
    pub fn new(params: PnpParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &PnpParams {
        &self.params
    }

    /// Estimate the pose mapping `object_points` (board plane, `z = 0`) onto
    /// `image_points` (pixels) through a distortion-free pinhole camera.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn estimate(
        &self,
        image_points: &[Point2<f64>; 4],
        object_points: &[Point3<f64>; 4],
        intrinsics: &CameraIntrinsics,
    ) -> Result<PlanePoseEstimate, PoseError> {
        intrinsics.validate()?;

        let finite = image_points.iter().all(|p| p.coords.iter().all(|v| v.is_finite()))
            && object_points.iter().all(|p| p.coords.iter().all(|v| v.is_finite()));
        if !finite {
            return Err(PoseError::NonFinite);
        }

        let max_abs_z = object_points.iter().map(|p| p.z.abs()).fold(0.0, f64::max);
        if max_abs_z > self.params.planarity_tolerance {
            return Err(PoseError::NotPlanar { max_abs_z });
        }

        let plane = object_points.map(|p| Point2::new(p.x, p.y));
        if !in_general_position(&plane) {
            return Err(PoseError::DegenerateGeometry("object points are collinear"));
        }
        if !in_general_position(image_points) {
            return Err(PoseError::DegenerateGeometry("image points are collinear"));
        }

        let normalized = image_points.map(|p| intrinsics.pixel_to_normalized(&p));
        let (r0, t0) = homography_seed(&plane, &normalized)?;

        let problem = Reprojection {
            object: object_points,
            image: image_points,
            intrinsics,
            base: r0,
        };
        let seed = Vector6::new(0.0, 0.0, 0.0, t0.x, t0.y, t0.z);
        let fit = problem.minimize(seed, &self.params)?;

        let (rotation, translation) = problem.unpack(&fit.x);
        let pose = CameraPose::new(rotation, translation);
        let in_front = object_points
            .iter()
            .all(|p| pose.transform_point(p).z > f64::EPSILON);
        if !in_front || !fit.x.iter().all(|v| v.is_finite()) {
            return Err(PoseError::DegenerateGeometry("refined pose is not in front of the camera"));
        }

        let residuals_px = std::array::from_fn(|i| Vector2::new(fit.r[2 * i], fit.r[2 * i + 1]));
        let rms_px = (fit.r.norm_squared() / 4.0).sqrt();
        debug!(
            "planar pose: t = {:?}, rms {:.4} px after {} iterations (converged: {})",
            translation.as_slice(),
            rms_px,
            fit.iterations,
            fit.converged
        );

        Ok(PlanePoseEstimate {
            pose,
            residuals_px,
            rms_px,
            iterations: fit.iterations,
            converged: fit.converged,
        })
    }
}

/// Decompose the plane → normalized-image homography into `[r1 r2 t]`.
fn homography_seed(
    plane: &[Point2<f64>; 4],
    normalized: &[Point2<f64>; 4],
) -> Result<(Rotation3<f64>, Vector3<f64>), PoseError> {
    let h = homography_from_4pt(plane, normalized)
        .map_err(|e| match e {
            HomographyError::NonFinite => PoseError::NonFinite,
            _ => PoseError::DegenerateGeometry("plane homography is singular"),
        })?
        .h;

    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();
    let (n1, n2) = (h1.norm(), h2.norm());
    if n1 <= 1e-12 || n2 <= 1e-12 {
        return Err(PoseError::DegenerateGeometry("plane homography is singular"));
    }

    // Scale from the mean column norm; the board must lie in front (t.z > 0).
    let mut lambda = 2.0 / (n1 + n2);
    if h3.z < 0.0 {
        lambda = -lambda;
    }
    let r1 = h1 * lambda;
    let r2 = h2 * lambda;
    let t = h3 * lambda;
    let r3 = r1.cross(&r2);

    let svd = Matrix3::from_columns(&[r1, r2, r3]).svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PoseError::DegenerateGeometry("rotation projection failed"));
    };
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u = u;
        u.column_mut(2).neg_mut();
        r = u * v_t;
    }

    Ok((Rotation3::from_matrix_unchecked(r), t))
}

struct Fit {
    x: Vector6<f64>,
    r: Residuals,
    iterations: usize,
    converged: bool,
}

struct Reprojection<'a> {
    object: &'a [Point3<f64>; 4],
    image: &'a [Point2<f64>; 4],
    intrinsics: &'a CameraIntrinsics,
    /// Seed rotation. The solver moves `exp([w]) * base`, so `w` stays small
    /// and never crosses the half-turn where axis-angle folds.
    base: Rotation3<f64>,
}

impl Reprojection<'_> {
    /// `x = (w, t)`: rotation increment on top of `base` and translation.
    fn unpack(&self, x: &Vector6<f64>) -> (Rotation3<f64>, Vector3<f64>) {
        (
            Rotation3::new(Vector3::new(x[0], x[1], x[2])) * self.base,
            Vector3::new(x[3], x[4], x[5]),
        )
    }

    /// `None` when a point falls behind the camera.
    fn residuals(&self, x: &Vector6<f64>) -> Option<Residuals> {
        let (r, t) = self.unpack(x);
        let mut out = Residuals::zeros();
        for (i, (obj, img)) in self.object.iter().zip(self.image).enumerate() {
            let p = self.intrinsics.project(&(r * obj + t))?;
            out[2 * i] = p.x - img.x;
            out[2 * i + 1] = p.y - img.y;
        }
        Some(out)
    }

    fn jacobian(&self, x: &Vector6<f64>, rel_step: f64) -> Option<Jacobian> {
        let mut j = Jacobian::zeros();
        for c in 0..6 {
            let h = rel_step * x[c].abs().max(1.0);
            let mut xp = *x;
            let mut xm = *x;
            xp[c] += h;
            xm[c] -= h;
            let d = (self.residuals(&xp)? - self.residuals(&xm)?) / (2.0 * h);
            j.set_column(c, &d);
        }
        Some(j)
    }

    fn minimize(&self, seed: Vector6<f64>, params: &PnpParams) -> Result<Fit, PoseError> {
        let mut x = seed;
        let mut r = self
            .residuals(&x)
            .ok_or(PoseError::DegenerateGeometry("initial pose places the board behind the camera"))?;
        let mut cost = r.norm_squared();
        let mut lambda = params.initial_damping;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < params.max_iterations {
            if cost <= EXACT_COST {
                converged = true;
                break;
            }
            iterations += 1;

            let j = self
                .jacobian(&x, params.jacobian_step)
                .ok_or(PoseError::DegenerateGeometry("jacobian evaluation left the image plane"))?;
            let jtj = j.transpose() * j;
            let g = j.transpose() * r;

            let mut stepped = false;
            while lambda <= MAX_DAMPING {
                let mut a = jtj;
                for d in 0..6 {
                    a[(d, d)] += lambda * jtj[(d, d)].max(1e-12);
                }
                let Some(chol) = a.cholesky() else {
                    lambda *= 10.0;
                    continue;
                };
                let delta = chol.solve(&(-g));
                let x_new = x + delta;
                match self.residuals(&x_new) {
                    Some(r_new) if r_new.norm_squared() < cost => {
                        let cost_new = r_new.norm_squared();
                        let rel_decrease = (cost - cost_new) / cost;
                        x = x_new;
                        r = r_new;
                        cost = cost_new;
                        lambda = (lambda * 0.1).max(1e-15);
                        stepped = true;
                        converged = delta.norm() <= params.step_tolerance * (x.norm() + 1.0)
                            || rel_decrease <= params.cost_tolerance;
                        break;
                    }
                    _ => lambda *= 10.0,
                }
            }

            // No descent direction left: we sit at a minimum up to precision.
            if !stepped {
                converged = true;
                break;
            }
            if converged {
                break;
            }
        }

        if !x.iter().all(|v| v.is_finite()) || !cost.is_finite() {
            return Err(PoseError::DegenerateGeometry("refinement diverged"));
        }
        Ok(Fit {
            x,
            r,
            iterations,
            converged,
        })
    }
}
