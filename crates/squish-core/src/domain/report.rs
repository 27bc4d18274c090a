//! Size report - 変換前後のサイズと削減率

use serde::Serialize;

/// Byte sizes observed before and after one transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

impl SizeReport {
    pub fn new(original_bytes: u64, compressed_bytes: u64) -> Self {
        Self {
            original_bytes,
            compressed_bytes,
        }
    }

    pub fn original_kb(&self) -> f64 {
        to_kb(self.original_bytes)
    }

    pub fn compressed_kb(&self) -> f64 {
        to_kb(self.compressed_bytes)
    }

    /// `(original - compressed) / original * 100`, rounded to two decimals.
    ///
    /// Negative when the artifact grew. An empty source reports 0.
    pub fn reduction_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        let original = self.original_bytes as f64;
        let compressed = self.compressed_bytes as f64;
        round2((original - compressed) / original * 100.0)
    }
}

fn to_kb(bytes: u64) -> f64 {
    round2(bytes as f64 / 1024.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::sixty_percent(1000, 400, 60.0)]
    #[case::no_change(2048, 2048, 0.0)]
    #[case::one_third(3, 2, 33.33)]
    #[case::grew(100, 150, -50.0)]
    #[case::empty_source(0, 10, 0.0)]
    fn reduction_percent(#[case] original: u64, #[case] compressed: u64, #[case] expected: f64) {
        let report = SizeReport::new(original, compressed);
        assert_eq!(report.reduction_percent(), expected);
    }

    #[test]
    fn sizes_are_reported_in_kb() {
        let report = SizeReport::new(2560, 1000);
        assert_eq!(report.original_kb(), 2.5);
        assert_eq!(report.compressed_kb(), 0.98);
    }
}
