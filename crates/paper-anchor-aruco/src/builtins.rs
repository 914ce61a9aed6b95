//! Built-in dictionaries compiled into the binary.
//!
//! Codes are stored in OpenCV's byte layout (MSB-first, row-major,
//! white = 1) and converted at compile time to the crate convention
//! (LSB-first, row-major, black = 1).

#![allow(clippy::unreadable_literal)]

use crate::Dictionary;

/// Convert an OpenCV 4x4 byte pair into the crate's packed code.
const fn opencv_4x4(hi: u8, lo: u8) -> u64 {
    let word = ((hi as u16) << 8) | lo as u16;
    let mut code = 0u64;
    let mut i = 0;
    while i < 16 {
        let white = ((word >> (15 - i)) & 1) as u64;
        code |= (1 - white) << i;
        i += 1;
    }
    code
}

/// Leading ids of OpenCV's `DICT_4X4_50` (rotation 0 of each marker).
const DICT_4X4_50_CODES: [u64; 7] = [
    opencv_4x4(181, 50),
    opencv_4x4(15, 154),
    opencv_4x4(51, 45),
    opencv_4x4(153, 70),
    opencv_4x4(84, 158),
    opencv_4x4(121, 205),
    opencv_4x4(158, 46),
];

/// 4x4 dictionary used by the paper board (ids 0..=3 are the corner markers).
pub const DICT_4X4_50: Dictionary = Dictionary {
    name: "DICT_4X4_50",
    marker_size: 4,
    max_correction_bits: 1,
    codes: &DICT_4X4_50_CODES,
};

/// Names accepted by [`builtin_dictionary`].
pub const BUILTIN_DICTIONARY_NAMES: &[&str] = &["DICT_4X4_50"];

/// Look up a built-in dictionary by name.
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    match name {
        "DICT_4X4_50" => Some(DICT_4X4_50),
        _ => None,
    }
}
