//! Sliding-window Shannon entropy
//!
//! Streams one entropy estimate per input byte position over a 128-byte
//! window. The 256-bucket frequency count is maintained incrementally
//! (one decrement, one increment per slide); the entropy sum itself is
//! recomputed in full each step since the log terms are nonlinear.

/// Window size in bytes
pub const ENTROPY_WINDOW: usize = 128;

/// Upper end of the output scale
pub const ENTROPY_SCALE: f64 = 100.0;

/// Streaming entropy estimator.
///
/// The value at position `i` reflects the window ending at `i`; the first
/// 127 values derive from a not-yet-full window. Scaled 0-100 against the
/// maximum entropy achievable for the current window fill, so a window of
/// identical bytes scores 0 and a full window of 128 distinct values
/// scores 100. Restartable only by constructing a fresh instance.
pub struct EntropyScan<'a> {
    data: &'a [u8],
    pos: usize,
    counts: [u32; 256],
}

impl<'a> EntropyScan<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            counts: [0; 256],
        }
    }
}

impl<'a> Iterator for EntropyScan<'a> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.pos >= self.data.len() {
            return None;
        }

        self.counts[self.data[self.pos] as usize] += 1;
        if self.pos >= ENTROPY_WINDOW {
            self.counts[self.data[self.pos - ENTROPY_WINDOW] as usize] -= 1;
        }
        let window_len = (self.pos + 1).min(ENTROPY_WINDOW);
        self.pos += 1;

        Some(scaled_entropy(&self.counts, window_len))
    }
}

/// Full entropy sum over the counts, scaled to [0, 100] for the window.
fn scaled_entropy(counts: &[u32; 256], window_len: usize) -> f64 {
    if window_len <= 1 {
        return 0.0;
    }

    let total = window_len as f64;
    let mut sum = 0.0;
    for &count in counts.iter() {
        if count > 0 {
            let p = count as f64 / total;
            sum -= p * p.log2();
        }
    }

    let max = (window_len.min(256) as f64).log2();
    (sum / max * ENTROPY_SCALE).clamp(0.0, ENTROPY_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_bytes_score_zero() {
        let data = vec![0x41u8; ENTROPY_WINDOW];
        let values: Vec<f64> = EntropyScan::new(&data).collect();
        assert_eq!(values.len(), ENTROPY_WINDOW);
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_distinct_bytes_score_max() {
        let data: Vec<u8> = (0..ENTROPY_WINDOW as u8).collect();
        let values: Vec<f64> = EntropyScan::new(&data).collect();
        // Every prefix is also all-distinct, so every position saturates
        for &v in &values[1..] {
            assert!((v - ENTROPY_SCALE).abs() < 1e-9, "got {}", v);
        }
    }

    #[test]
    fn test_one_value_per_position() {
        let data = b"some arbitrary content, longer than a few bytes";
        assert_eq!(EntropyScan::new(data).count(), data.len());
    }

    #[test]
    fn test_window_slides_past_prefix() {
        // 128 zeros then 128 copies of a two-byte pattern: once the window
        // has slid fully onto the pattern its entropy settles at the
        // two-symbol value
        let mut data = vec![0u8; ENTROPY_WINDOW];
        for i in 0..ENTROPY_WINDOW {
            data.push(if i % 2 == 0 { 0xAA } else { 0x55 });
        }
        let values: Vec<f64> = EntropyScan::new(&data).collect();

        let last = values[values.len() - 1];
        let expected = ENTROPY_SCALE / (ENTROPY_WINDOW as f64).log2();
        assert!((last - expected).abs() < 1e-9, "got {}", last);
    }

    #[test]
    fn test_intermediate_between_bounds() {
        let data: Vec<u8> = (0..ENTROPY_WINDOW).map(|i| (i % 7) as u8).collect();
        let values: Vec<f64> = EntropyScan::new(&data).collect();
        let last = values[values.len() - 1];
        assert!(last > 0.0 && last < ENTROPY_SCALE);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(EntropyScan::new(&[]).count(), 0);
    }
}
