//! Synthetic rendering of the board, flat for printing or seen through a
//! pinhole camera for tests.

use crate::board::{BoardLayout, Corner, MarkerRoleMap};
use nalgebra::{Matrix3, Point2, Point3};
use paper_anchor_aruco::{marker_cell_is_black, Dictionary};
use paper_anchor_core::{CameraIntrinsics, CameraPose, GrayImage, Homography, IntrinsicsError};

/// Intensity of printed marker cells.
pub const INK: u8 = 20;
/// Intensity of the paper.
pub const PAPER: u8 = 245;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("invalid image size {width}x{height}")]
    InvalidSize { width: usize, height: usize },
    #[error(transparent)]
    Intrinsics(#[from] IntrinsicsError),
    #[error("board plane is seen edge-on")]
    EdgeOn,
}

/// Paints the board's markers given a point in board coordinates.
#[derive(Clone, Copy, Debug)]
pub struct BoardPainter<'a> {
    layout: &'a BoardLayout,
    role_map: &'a MarkerRoleMap,
    dict: &'a Dictionary,
}

impl<'a> BoardPainter<'a> {
    pub fn new(layout: &'a BoardLayout, role_map: &'a MarkerRoleMap, dict: &'a Dictionary) -> Self {
        Self {
            layout,
            role_map,
            dict,
        }
    }

    /// Intensity at board point `p` (meters), `None` off the board.
    pub fn value_at(&self, p: Point2<f64>) -> Option<u8> {
        let side = self.layout.board_side;
        if !(0.0..side).contains(&p.x) || !(0.0..side).contains(&p.y) {
            return None;
        }
        let m = self.layout.marker_size;
        let cells = self.dict.marker_size + 2;
        for slot in Corner::ALL {
            let o = self.layout.marker_origin(slot);
            let (u, v) = ((p.x - o.x) / m, (p.y - o.y) / m);
            if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                continue;
            }
            let id = self.role_map.id_for_slot(slot);
            let cx = (u * cells as f64) as usize;
            let cy = (v * cells as f64) as usize;
            let black = marker_cell_is_black(self.dict, id, 1, cx, cy).unwrap_or(false);
            return Some(if black { INK } else { PAPER });
        }
        Some(PAPER)
    }
}

/// Fronto-parallel board image at `px_per_meter`, with a paper-colored
/// margin of `margin_px` on every side.
pub fn render_board(
    painter: &BoardPainter<'_>,
    px_per_meter: f64,
    margin_px: usize,
) -> Result<GrayImage, RenderError> {
    let inner = (painter.layout.board_side * px_per_meter).round();
    if !inner.is_finite() || inner < 1.0 {
        return Err(RenderError::InvalidSize {
            width: 0,
            height: 0,
        });
    }
    let side = inner as usize + 2 * margin_px;
    let mut data = vec![PAPER; side * side];
    for y in 0..side {
        for x in 0..side {
            let p = Point2::new(
                (x as f64 + 0.5 - margin_px as f64) / px_per_meter,
                (y as f64 + 0.5 - margin_px as f64) / px_per_meter,
            );
            if let Some(v) = painter.value_at(p) {
                data[y * side + x] = v;
            }
        }
    }
    Ok(GrayImage {
        width: side,
        height: side,
        data,
    })
}

/// Render the board as seen by a camera with `pose` (board -> camera).
/// Pixels not covering the board get `background`. Each pixel averages a
/// 2x2 grid of sub-samples.
pub fn render_board_view(
    painter: &BoardPainter<'_>,
    intrinsics: &CameraIntrinsics,
    pose: &CameraPose,
    background: u8,
) -> Result<GrayImage, RenderError> {
    intrinsics.validate()?;
    let (w, h) = (intrinsics.width as usize, intrinsics.height as usize);

    let r = pose.rotation.matrix();
    let t = pose.translation;
    let board_to_cam = Matrix3::from_columns(&[r.column(0).into_owned(), r.column(1).into_owned(), t]);
    let board_from_img = Homography::new(intrinsics.k_matrix() * board_to_cam)
        .inverse()
        .ok_or(RenderError::EdgeOn)?;

    let mut data = vec![background; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u32;
            for (dx, dy) in [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)] {
                let q = board_from_img.apply(Point2::new(x as f64 + dx, y as f64 + dy));
                let in_front = q.x.is_finite()
                    && q.y.is_finite()
                    && pose.transform_point(&Point3::new(q.x, q.y, 0.0)).z > 0.0;
                let v = if in_front {
                    painter.value_at(q).unwrap_or(background)
                } else {
                    background
                };
                acc += v as u32;
            }
            data[y * w + x] = ((acc + 2) / 4) as u8;
        }
    }

    Ok(GrayImage {
        width: w,
        height: h,
        data,
    })
}
