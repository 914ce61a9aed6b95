//! Marker rendering for printing and synthetic test frames.

use crate::Dictionary;
use paper_anchor_core::GrayImage;

/// Whether grid cell `(cx, cy)` of marker `id` is black, counting the
/// `border_bits` wide black frame. `None` for unknown ids or cells outside
/// the marker.
pub fn marker_cell_is_black(
    dict: &Dictionary,
    id: u32,
    border_bits: usize,
    cx: usize,
    cy: usize,
) -> Option<bool> {
    let cells = dict.marker_size + 2 * border_bits;
    if cx >= cells || cy >= cells {
        return None;
    }
    let inner = |c: usize| c >= border_bits && c < border_bits + dict.marker_size;
    if inner(cx) && inner(cy) {
        dict.bit_is_black(id, cx - border_bits, cy - border_bits)
    } else {
        dict.code(id).map(|_| true)
    }
}

/// Render marker `id` upright with `cell_px` pixels per cell, black = 0,
/// white = 255. The image has no quiet zone.
pub fn draw_marker(
    dict: &Dictionary,
    id: u32,
    cell_px: usize,
    border_bits: usize,
) -> Option<GrayImage> {
    if cell_px == 0 {
        return None;
    }
    dict.code(id)?;
    let cells = dict.marker_size + 2 * border_bits;
    let side = cells * cell_px;
    let mut data = vec![255u8; side * side];

    for y in 0..side {
        for x in 0..side {
            if marker_cell_is_black(dict, id, border_bits, x / cell_px, y / cell_px)? {
                data[y * side + x] = 0;
            }
        }
    }

    Some(GrayImage {
        width: side,
        height: side,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::DICT_4X4_50;

    #[test]
    fn drawn_marker_has_black_border_and_code_bits() {
        let img = draw_marker(&DICT_4X4_50, 0, 5, 1).expect("draw");
        assert_eq!((img.width, img.height), (30, 30));
        for i in 0..30 {
            assert_eq!(img.data[i], 0);
            assert_eq!(img.data[29 * 30 + i], 0);
            assert_eq!(img.data[i * 30], 0);
        }
        for by in 0..4 {
            for bx in 0..4 {
                let px = img.data[((by + 1) * 5 + 2) * 30 + (bx + 1) * 5 + 2];
                let black = DICT_4X4_50.bit_is_black(0, bx, by).expect("bit");
                assert_eq!(px == 0, black, "bit ({bx}, {by})");
            }
        }
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(draw_marker(&DICT_4X4_50, 999, 5, 1).is_none());
        assert!(marker_cell_is_black(&DICT_4X4_50, 0, 1, 6, 0).is_none());
    }
}
