//! Otsu thresholding. A value `v` is dark when `v <= threshold`.

use paper_anchor_core::GrayImageView;

/// Otsu threshold of a 256-bin histogram.
pub fn otsu_threshold_from_histogram(hist: &[u32; 256]) -> u8 {
    let total: u64 = hist.iter().map(|&h| h as u64).sum();
    if total == 0 {
        return 127;
    }

    let min_v = hist.iter().position(|&h| h > 0).unwrap_or(0);
    let max_v = hist.iter().rposition(|&h| h > 0).unwrap_or(255);
    if min_v == max_v {
        return min_v as u8;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((min_v + max_v) / 2) as u8;
    }

    let total = total as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// Otsu threshold of a set of sample intensities.
pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    otsu_threshold_from_histogram(&hist)
}

/// Global Otsu threshold over every pixel of `img`.
pub fn otsu_threshold(img: &GrayImageView<'_>) -> u8 {
    otsu_threshold_from_samples(img.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bimodal_samples_split_between_modes() {
        let mut samples = vec![20u8; 100];
        samples.extend(std::iter::repeat_n(30u8, 50));
        samples.extend(std::iter::repeat_n(200u8, 100));
        samples.extend(std::iter::repeat_n(220u8, 50));
        let t = otsu_threshold_from_samples(&samples);
        assert!((30..200).contains(&t), "threshold {t}");
    }

    #[test]
    fn two_level_input_uses_midpoint() {
        assert_eq!(otsu_threshold_from_samples(&[0, 0, 255, 255]), 127);
    }

    #[test]
    fn uniform_and_empty_inputs() {
        assert_eq!(otsu_threshold_from_samples(&[90; 8]), 90);
        assert_eq!(otsu_threshold_from_samples(&[]), 127);
    }
}
