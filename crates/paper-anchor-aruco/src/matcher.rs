//! Dictionary matching and code rotation.

use crate::Dictionary;

/// Best dictionary entry for an observed code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub id: u32,
    /// Rotation `0..=3` with `observed == rotate_code_u64(dict_code, rotation)`.
    pub rotation: u8,
    /// Bit errors after rotation.
    pub hamming: u8,
}

/// Brute-force matcher over every id and rotation of one dictionary.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// `max_hamming` is clamped to the dictionary's correction capacity.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        debug_assert!(dict.bit_count() <= 64, "codes wider than 64 bits");
        let rotated = dict
            .codes
            .iter()
            .map(|&code| [0u8, 1, 2, 3].map(|rot| rotate_code_u64(code, dict.marker_size, rot)))
            .collect();
        Self {
            dict,
            max_hamming: max_hamming.min(dict.max_correction_bits),
            rotated,
        }
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Closest entry within `max_hamming`. A tie between two different ids
    /// is treated as no match.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;
        let mut tied = false;

        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let hamming = (observed ^ cand).count_ones() as u8;
                if hamming > self.max_hamming {
                    continue;
                }
                let m = Match {
                    id: id as u32,
                    rotation: rot as u8,
                    hamming,
                };
                match best {
                    Some(prev) if hamming > prev.hamming => {}
                    Some(prev) if hamming == prev.hamming => tied |= prev.id != m.id,
                    _ => {
                        best = Some(m);
                        tied = false;
                    }
                }
            }
        }

        if tied {
            None
        } else {
            best
        }
    }
}

/// Rotate a row-major code (`idx = y * n + x`) by `rot` quarter turns
/// clockwise.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}
