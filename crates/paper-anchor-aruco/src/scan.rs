//! Bit sampling and decoding of one marker inside an image quad.

use crate::threshold::otsu_threshold_from_samples;
use crate::Matcher;
use nalgebra::Point2;
use paper_anchor_core::{get_gray, homography_from_4pt_f32, GrayImageView, Homography};
use serde::{Deserialize, Serialize};

const MIN_SIDE_PX: f32 = 12.0;
const THRESH_SUBDIV: usize = 3;

/// Sampling and acceptance settings for decoding a marker inside a quad.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanDecodeConfig {
    /// Marker border width in cells.
    pub border_bits: usize,
    /// Fraction of the marker side ignored near the quad edges.
    pub inset_frac: f32,
    /// Marker side relative to the quad side (1.0 when the quad is the
    /// marker outline).
    pub marker_size_rel: f32,
    /// Side of the canonical square the quad is mapped from, in pixels.
    pub px_per_marker: f32,
    /// Require border-black ratio >= this.
    pub min_border_score: f32,
    /// Reject quads whose samples span fewer grey levels than this.
    pub min_contrast: u8,
}

impl Default for ScanDecodeConfig {
    fn default() -> Self {
        Self {
            border_bits: 1,
            inset_frac: 0.0,
            marker_size_rel: 1.0,
            px_per_marker: 60.0,
            min_border_score: 0.85,
            min_contrast: 20,
        }
    }
}

/// A decoded marker, corners still in quad order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerDecode {
    pub id: u32,
    /// Quarter turns such that marker corner `k` is quad corner `(k + rotation) % 4`.
    pub rotation: u8,
    pub hamming: u8,
    /// Border score scaled down by the bit-error fraction.
    pub score: f32,
    pub border_score: f32,
    /// Observed inner bits (row-major, black = 1).
    pub code: u64,
    /// Whether polarity was inverted to maximize `border_score`.
    pub inverted: bool,
}

/// Decode a single marker whose outline is `corners` (clockwise on screen).
pub fn decode_marker_in_quad(
    image: &GrayImageView<'_>,
    corners: &[Point2<f32>; 4],
    cfg: &ScanDecodeConfig,
    matcher: &Matcher,
) -> Option<MarkerDecode> {
    let grid = SampleGrid::new(cfg, matcher.dictionary().marker_size)?;
    let s = cfg.px_per_marker;
    let canonical = [
        Point2::new(0.0, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ];
    let h = homography_from_4pt_f32(&canonical, corners).ok()?;
    let obs = grid.sample(image, &h, cfg)?;

    let m = matcher.match_code(obs.code)?;
    let bits = matcher.dictionary().bit_count().max(1) as f32;
    let score = (obs.border_score * (1.0 - m.hamming as f32 / bits)).clamp(0.0, 1.0);
    Some(MarkerDecode {
        id: m.id,
        rotation: m.rotation,
        hamming: m.hamming,
        score,
        border_score: obs.border_score,
        code: obs.code,
        inverted: obs.inverted,
    })
}

#[derive(Clone, Copy, Debug)]
struct BitObservation {
    code: u64,
    border_score: f32,
    inverted: bool,
}

struct SampleGrid {
    cells: usize,
    bits: usize,
    points: Vec<Point2<f32>>, // row-major: cy * cells + cx
    threshold_points: Vec<Point2<f32>>,
}

impl SampleGrid {
    fn new(cfg: &ScanDecodeConfig, bits: usize) -> Option<Self> {
        let cells = bits + 2 * cfg.border_bits;
        if bits * bits > 64 || cells == 0 {
            return None;
        }

        let s = cfg.px_per_marker;
        let marker_side = cfg.marker_size_rel.clamp(0.01, 1.0) * s;
        let inset = (cfg.inset_frac * marker_side).max(0.0);
        let side = marker_side - 2.0 * inset;
        if side < MIN_SIDE_PX {
            return None;
        }
        let start = 0.5 * (s - marker_side) + inset;

        Some(Self {
            cells,
            bits,
            points: grid_points(start, side, cells),
            threshold_points: grid_points(start, side, cells * THRESH_SUBDIV),
        })
    }

    fn sample(
        &self,
        img: &GrayImageView<'_>,
        h: &Homography,
        cfg: &ScanDecodeConfig,
    ) -> Option<BitObservation> {
        let samples = self
            .points
            .iter()
            .map(|p| {
                let q = h.apply_f32(*p);
                sample_mean_3x3(img, q.x, q.y)
            })
            .collect::<Option<Vec<u8>>>()?;
        let thr_samples: Vec<u8> = self
            .threshold_points
            .iter()
            .filter_map(|p| {
                let q = h.apply_f32(*p);
                sample_mean_3x3(img, q.x, q.y)
            })
            .collect();

        let lo = samples.iter().copied().min()?;
        let hi = samples.iter().copied().max()?;
        if hi - lo < cfg.min_contrast {
            return None;
        }

        decode_samples(
            &samples,
            &thr_samples,
            self.cells,
            self.bits,
            cfg.border_bits,
            cfg.min_border_score,
        )
    }
}

fn decode_samples(
    samples: &[u8],
    thr_samples: &[u8],
    cells: usize,
    bits: usize,
    border: usize,
    min_border_score: f32,
) -> Option<BitObservation> {
    if samples.len() != cells * cells {
        return None;
    }
    let thr = if thr_samples.is_empty() {
        otsu_threshold_from_samples(samples)
    } else {
        otsu_threshold_from_samples(thr_samples)
    };

    let mut best: Option<BitObservation> = None;
    for inverted in [false, true] {
        let mut border_ok = 0u32;
        let mut border_total = 0u32;
        let mut code = 0u64;

        for cy in 0..cells {
            for cx in 0..cells {
                let is_black = (samples[cy * cells + cx] <= thr) != inverted;
                let is_border = cx < border
                    || cy < border
                    || cx >= cells - border
                    || cy >= cells - border;
                if is_border {
                    border_total += 1;
                    border_ok += is_black as u32;
                } else if is_black {
                    code |= 1u64 << ((cy - border) * bits + (cx - border));
                }
            }
        }

        let border_score = if border_total > 0 {
            border_ok as f32 / border_total as f32
        } else {
            1.0
        };
        if border_score < min_border_score {
            continue;
        }
        if best.is_none_or(|b| border_score > b.border_score) {
            best = Some(BitObservation {
                code,
                border_score,
                inverted,
            });
        }
    }

    best
}

fn grid_points(start: f32, side: f32, n: usize) -> Vec<Point2<f32>> {
    let step = side / n as f32;
    (0..n)
        .flat_map(|y| {
            (0..n).map(move |x| {
                Point2::new(
                    start + (x as f32 + 0.5) * step,
                    start + (y as f32 + 0.5) * step,
                )
            })
        })
        .collect()
}

fn sample_mean_3x3(img: &GrayImageView<'_>, x: f32, y: f32) -> Option<u8> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    if ix < 1 || iy < 1 || ix + 1 >= img.width as i32 || iy + 1 >= img.height as i32 {
        return None;
    }
    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += get_gray(img, ix + dx, iy + dy) as u32;
        }
    }
    Some((sum / 9) as u8)
}
