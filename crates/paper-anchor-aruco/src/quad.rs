//! Dark connected components fitted with four outer corners.
//!
//! Candidates come from a global threshold: 4-connected dark pixels are
//! grouped, filtered by size and fill, and each surviving blob is reduced
//! to an ordered, convex quad.

use std::collections::VecDeque;

use nalgebra::Point2;
use paper_anchor_core::GrayImageView;
use serde::{Deserialize, Serialize};

/// Component and quad acceptance bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadParams {
    /// Minimum bounding-box side in pixels.
    pub min_side_px: u32,
    /// Maximum bounding-box side relative to the shorter image side.
    pub max_side_frac: f32,
    /// Maximum bounding-box aspect ratio (long / short side).
    pub max_aspect: f32,
    /// Dark pixels over bounding-box area.
    pub min_fill: f32,
    pub max_fill: f32,
    /// Minimum area of the fitted quad in square pixels.
    pub min_quad_area_px: f32,
}

impl Default for QuadParams {
    fn default() -> Self {
        Self {
            min_side_px: 12,
            max_side_frac: 0.9,
            max_aspect: 4.0,
            min_fill: 0.18,
            max_fill: 1.0,
            min_quad_area_px: 144.0,
        }
    }
}

/// A dark blob reduced to four corners, ordered TL, TR, BR, BL-wise
/// (clockwise on screen, y down). Which corner comes first is arbitrary.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadCandidate {
    pub corners: [Point2<f32>; 4],
    /// Number of dark pixels in the component.
    pub pixel_count: usize,
}

struct Component {
    pixels: Vec<(u32, u32)>,
    min: (u32, u32),
    max: (u32, u32),
    touches_border: bool,
}

/// Find quad candidates among pixels with `value <= threshold`.
pub fn find_dark_quads(
    img: &GrayImageView<'_>,
    threshold: u8,
    params: &QuadParams,
) -> Vec<QuadCandidate> {
    let (w, h) = (img.width, img.height);
    let mut out = Vec::new();
    if w < 3 || h < 3 {
        return out;
    }

    let max_side = (params.max_side_frac * w.min(h) as f32).max(params.min_side_px as f32);
    let mut visited = vec![false; w * h];
    let mut queue = VecDeque::new();

    for y0 in 0..h {
        for x0 in 0..w {
            let idx0 = y0 * w + x0;
            if visited[idx0] || img.data[idx0] > threshold {
                continue;
            }
            let comp = flood_component(img, threshold, x0, y0, &mut visited, &mut queue);
            if comp.touches_border {
                continue;
            }

            let bw = comp.max.0 - comp.min.0 + 1;
            let bh = comp.max.1 - comp.min.1 + 1;
            let (short, long) = (bw.min(bh) as f32, bw.max(bh) as f32);
            if short < params.min_side_px as f32 || long > max_side {
                continue;
            }
            if long / short > params.max_aspect {
                continue;
            }
            let fill = comp.pixels.len() as f32 / (bw as f32 * bh as f32);
            if fill < params.min_fill || fill > params.max_fill {
                continue;
            }

            let Some(corners) = fit_quad(&comp.pixels) else {
                continue;
            };
            if quad_signed_area(&corners) < params.min_quad_area_px {
                continue;
            }
            out.push(QuadCandidate {
                corners,
                pixel_count: comp.pixels.len(),
            });
        }
    }

    out
}

fn flood_component(
    img: &GrayImageView<'_>,
    threshold: u8,
    x0: usize,
    y0: usize,
    visited: &mut [bool],
    queue: &mut VecDeque<(u32, u32)>,
) -> Component {
    let (w, h) = (img.width, img.height);
    let mut comp = Component {
        pixels: Vec::new(),
        min: (x0 as u32, y0 as u32),
        max: (x0 as u32, y0 as u32),
        touches_border: false,
    };

    visited[y0 * w + x0] = true;
    queue.clear();
    queue.push_back((x0 as u32, y0 as u32));

    while let Some((x, y)) = queue.pop_front() {
        comp.pixels.push((x, y));
        comp.min = (comp.min.0.min(x), comp.min.1.min(y));
        comp.max = (comp.max.0.max(x), comp.max.1.max(y));
        if x == 0 || y == 0 || x as usize + 1 == w || y as usize + 1 == h {
            comp.touches_border = true;
        }

        let (xi, yi) = (x as i64, y as i64);
        for (nx, ny) in [(xi - 1, yi), (xi + 1, yi), (xi, yi - 1), (xi, yi + 1)] {
            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                continue;
            }
            let nidx = ny as usize * w + nx as usize;
            if visited[nidx] || img.data[nidx] > threshold {
                continue;
            }
            visited[nidx] = true;
            queue.push_back((nx as u32, ny as u32));
        }
    }

    comp
}

/// Farthest-point corner construction on pixel centers.
fn fit_quad(pixels: &[(u32, u32)]) -> Option<[Point2<f32>; 4]> {
    if pixels.len() < 4 {
        return None;
    }
    let pts: Vec<Point2<f32>> = pixels
        .iter()
        .map(|&(x, y)| Point2::new(x as f32 + 0.5, y as f32 + 0.5))
        .collect();

    let n = pts.len() as f32;
    let centroid = pts
        .iter()
        .fold(Point2::origin(), |acc: Point2<f32>, p| acc + p.coords / n);

    let farthest_from = |anchor: Point2<f32>| {
        pts.iter()
            .copied()
            .max_by(|a, b| (a - anchor).norm_squared().total_cmp(&(b - anchor).norm_squared()))
    };
    let c0 = farthest_from(centroid)?;
    let c2 = farthest_from(c0)?;

    let d = c2 - c0;
    if d.norm_squared() < 1.0 {
        return None;
    }
    let side = |p: &Point2<f32>| d.x * (p.y - c0.y) - d.y * (p.x - c0.x);
    let c_pos = pts
        .iter()
        .copied()
        .max_by(|a, b| side(a).total_cmp(&side(b)))?;
    let c_neg = pts
        .iter()
        .copied()
        .min_by(|a, b| side(a).total_cmp(&side(b)))?;
    if side(&c_pos) <= 0.0 || side(&c_neg) >= 0.0 {
        return None;
    }

    let mut quad = [c0, c_pos, c2, c_neg];
    if quad_signed_area(&quad) < 0.0 {
        quad = [c0, c_neg, c2, c_pos];
    }
    if !is_convex(&quad) {
        return None;
    }

    // Pixel centers sit half a pixel inside the blob outline.
    Some(quad.map(|p| {
        Point2::new(
            p.x + 0.5 * (p.x - centroid.x).signum(),
            p.y + 0.5 * (p.y - centroid.y).signum(),
        )
    }))
}

/// Shoelace area; positive for TL, TR, BR, BL order in y-down image coords.
pub(crate) fn quad_signed_area(q: &[Point2<f32>; 4]) -> f32 {
    let mut a = 0.0;
    for i in 0..4 {
        let p = q[i];
        let n = q[(i + 1) % 4];
        a += p.x * n.y - n.x * p.y;
    }
    0.5 * a
}

fn is_convex(q: &[Point2<f32>; 4]) -> bool {
    (0..4).all(|i| {
        let a = q[i];
        let b = q[(i + 1) % 4];
        let c = q[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        cross > 0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_anchor_core::GrayImage;

    fn canvas(w: usize, h: usize) -> GrayImage {
        GrayImage {
            width: w,
            height: h,
            data: vec![230; w * h],
        }
    }

    fn fill_rect(img: &mut GrayImage, x0: usize, y0: usize, x1: usize, y1: usize) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.data[y * img.width + x] = 10;
            }
        }
    }

    #[test]
    fn square_blob_yields_ordered_corners() {
        let mut img = canvas(80, 60);
        fill_rect(&mut img, 20, 10, 50, 40);
        let quads = find_dark_quads(&img.view(), 120, &QuadParams::default());
        assert_eq!(quads.len(), 1);

        let q = &quads[0];
        assert_eq!(q.pixel_count, 900);
        assert!(quad_signed_area(&q.corners) > 0.0);
        let mut xs: Vec<f32> = q.corners.iter().map(|p| p.x).collect();
        xs.sort_by(f32::total_cmp);
        assert_eq!(xs, vec![20.0, 20.0, 50.0, 50.0]);
        let mut ys: Vec<f32> = q.corners.iter().map(|p| p.y).collect();
        ys.sort_by(f32::total_cmp);
        assert_eq!(ys, vec![10.0, 10.0, 40.0, 40.0]);
    }

    #[test]
    fn border_touching_and_tiny_blobs_are_rejected() {
        let mut img = canvas(80, 60);
        fill_rect(&mut img, 0, 5, 30, 35);
        fill_rect(&mut img, 60, 40, 65, 45);
        assert!(find_dark_quads(&img.view(), 120, &QuadParams::default()).is_empty());
    }

    #[test]
    fn thin_line_is_rejected_by_aspect() {
        let mut img = canvas(120, 60);
        fill_rect(&mut img, 10, 20, 110, 34);
        assert!(find_dark_quads(&img.view(), 120, &QuadParams::default()).is_empty());
    }
}
