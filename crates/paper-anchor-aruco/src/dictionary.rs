//! Dictionary metadata and packed marker codes.

/// A fixed ArUco-style marker dictionary.
#[derive(Clone, Copy, Debug)]
pub struct Dictionary {
    /// Human-readable name (for logging and configuration).
    pub name: &'static str,
    /// Number of inner bits per marker side.
    pub marker_size: usize,
    /// Largest Hamming distance the dictionary can correct unambiguously.
    pub max_correction_bits: u8,
    /// One `u64` per marker id holding the inner `marker_size x marker_size` bits.
    ///
    /// Bits are row-major (`idx = y * marker_size + x`) with **black = 1**.
    pub codes: &'static [u64],
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Number of marker ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Code for `id`, if the dictionary has one.
    #[inline]
    pub fn code(&self, id: u32) -> Option<u64> {
        self.codes.get(id as usize).copied()
    }

    /// Whether inner bit `(x, y)` of marker `id` is black.
    pub fn bit_is_black(&self, id: u32, x: usize, y: usize) -> Option<bool> {
        if x >= self.marker_size || y >= self.marker_size {
            return None;
        }
        let code = self.code(id)?;
        Some((code >> (y * self.marker_size + x)) & 1 == 1)
    }
}
