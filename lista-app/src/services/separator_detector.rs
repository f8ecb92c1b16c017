//! Separator frame detection
//!
//! A separator is a deliberately photographed black card placed between two
//! items' photo sets. Such frames are dark, flat, low in entropy and free of
//! edges; real photos, even dark ones, keep structure in at least one of
//! those signals. All four checks must pass, so a real photo is rarely
//! mistaken for a separator (which would silently merge two items).

use image::imageops::{self, FilterType};
use image::GrayImage;
use lista_common::config::SeparatorConfig;
use std::path::Path;
use thiserror::Error;

/// Canny hysteresis thresholds applied after blurring
const CANNY_LOW: f32 = 20.0;
const CANNY_HIGH: f32 = 60.0;

/// Gaussian sigma matching a 5x5 kernel
const BLUR_SIGMA: f32 = 1.1;

/// Separator detection errors
#[derive(Debug, Error)]
pub enum DetectError {
    /// Image could not be opened or decoded
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Signals measured on a normalized grayscale frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// 95th percentile brightness (linear interpolation between ranks)
    pub p95: f64,
    /// Population standard deviation of intensities
    pub std: f64,
    /// Shannon entropy of the 256-bin histogram, in bits
    pub entropy: f64,
    /// Fraction of pixels flagged by the edge detector
    pub edge_ratio: f64,
}

/// Verdict source for the inbox segmenter
pub trait SeparatorClassifier: Send + Sync {
    /// Whether the image at `path` is a separator frame
    fn is_separator(&self, path: &Path) -> Result<bool, DetectError>;
}

/// Threshold-based separator detector
#[derive(Debug, Clone)]
pub struct SeparatorDetector {
    config: SeparatorConfig,
}

impl SeparatorDetector {
    /// Create detector with default thresholds
    pub fn new() -> Self {
        Self {
            config: SeparatorConfig::default(),
        }
    }

    /// Create detector with configured thresholds
    pub fn with_config(config: SeparatorConfig) -> Self {
        Self { config }
    }

    /// Active thresholds
    pub fn config(&self) -> &SeparatorConfig {
        &self.config
    }

    /// Decode, grayscale and resize an image file, then measure it
    pub fn analyze_file(&self, path: &Path) -> Result<FrameStats, DetectError> {
        let gray = image::open(path)?.to_luma8();
        Ok(self.analyze(&gray))
    }

    /// Measure an already decoded grayscale frame
    ///
    /// **Algorithm:**
    /// 1. Resize to a `resize_to` square (normalizes cost, smooths noise)
    /// 2. p95 and standard deviation of intensities
    /// 3. Entropy of the normalized histogram
    /// 4. Gaussian blur, Canny, fraction of edge pixels
    pub fn analyze(&self, gray: &GrayImage) -> FrameStats {
        let side = self.config.resize_to;
        let resized = imageops::resize(gray, side, side, FilterType::CatmullRom);
        let pixels = resized.as_raw();

        let mut histogram = [0u64; 256];
        for &p in pixels {
            histogram[p as usize] += 1;
        }

        let blurred = imageproc::filter::gaussian_blur_f32(&resized, BLUR_SIGMA);
        let edges = imageproc::edges::canny(&blurred, CANNY_LOW, CANNY_HIGH);
        let edge_count = edges.as_raw().iter().filter(|&&v| v > 0).count();

        FrameStats {
            p95: percentile(&histogram, 95.0),
            std: std_dev(pixels),
            entropy: entropy_bits(&histogram),
            edge_ratio: edge_count as f64 / pixels.len().max(1) as f64,
        }
    }

    /// Apply the four-way threshold test
    pub fn is_separator_stats(&self, stats: &FrameStats) -> bool {
        stats.p95 <= self.config.p95_max
            && stats.std <= self.config.std_max
            && stats.entropy <= self.config.entropy_max
            && stats.edge_ratio <= self.config.edge_ratio_max
    }
}

impl Default for SeparatorDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SeparatorClassifier for SeparatorDetector {
    fn is_separator(&self, path: &Path) -> Result<bool, DetectError> {
        let stats = self.analyze_file(path)?;
        let verdict = self.is_separator_stats(&stats);
        tracing::debug!(
            path = %path.display(),
            p95 = stats.p95,
            std = stats.std,
            entropy = stats.entropy,
            edge_ratio = stats.edge_ratio,
            separator = verdict,
            "Classified frame"
        );
        Ok(verdict)
    }
}

/// Percentile of the intensities described by `histogram`
///
/// Uses linear interpolation between the two closest ranks.
fn percentile(histogram: &[u64; 256], q: f64) -> f64 {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0.0;
    }

    let rank = q / 100.0 * (total - 1) as f64;
    let lower_rank = rank.floor() as u64;
    let upper_rank = rank.ceil() as u64;
    let lower = value_at_rank(histogram, lower_rank);
    let upper = value_at_rank(histogram, upper_rank);
    lower + (upper - lower) * (rank - lower_rank as f64)
}

/// Intensity of the `rank`-th smallest pixel (0-based)
fn value_at_rank(histogram: &[u64; 256], rank: u64) -> f64 {
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > rank {
            return value as f64;
        }
    }
    255.0
}

fn std_dev(pixels: &[u8]) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }
    let n = pixels.len() as f64;
    let mean = pixels.iter().map(|&p| p as f64).sum::<f64>() / n;
    let variance = pixels
        .iter()
        .map(|&p| {
            let d = p as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}

fn entropy_bits(histogram: &[u64; 256]) -> f64 {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0.0;
    }
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise_image(side: u32, seed: u64) -> GrayImage {
        let mut rng = StdRng::seed_from_u64(seed);
        GrayImage::from_fn(side, side, |_, _| Luma([rng.gen::<u8>()]))
    }

    #[test]
    fn test_detector_creation() {
        let detector = SeparatorDetector::new();
        assert_eq!(detector.config().resize_to, 256);
        assert_eq!(detector.config().p95_max, 20.0);
    }

    #[test]
    fn test_uniform_black_is_separator() {
        let detector = SeparatorDetector::new();
        let black = GrayImage::from_pixel(256, 256, Luma([0]));
        let stats = detector.analyze(&black);

        assert_eq!(stats.p95, 0.0);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.entropy, 0.0);
        assert_eq!(stats.edge_ratio, 0.0);
        assert!(detector.is_separator_stats(&stats));
    }

    #[test]
    fn test_random_noise_is_not_separator() {
        let detector = SeparatorDetector::new();
        let stats = detector.analyze(&noise_image(256, 7));

        assert!(stats.entropy > 7.0, "entropy {}", stats.entropy);
        assert!(stats.std > 8.0);
        assert!(!detector.is_separator_stats(&stats));
    }

    #[test]
    fn test_dark_scene_with_structure_is_not_separator() {
        // Dark frame with a dim bright square: p95 stays low but edges appear
        let detector = SeparatorDetector::new();
        let img = GrayImage::from_fn(256, 256, |x, y| {
            if (96..160).contains(&x) && (96..160).contains(&y) {
                Luma([120])
            } else {
                Luma([5])
            }
        });
        let stats = detector.analyze(&img);
        assert!(stats.edge_ratio > 0.001, "edge ratio {}", stats.edge_ratio);
        assert!(!detector.is_separator_stats(&stats));
    }

    #[test]
    fn test_bright_uniform_is_not_separator() {
        let detector = SeparatorDetector::new();
        let grey = GrayImage::from_pixel(64, 64, Luma([200]));
        let stats = detector.analyze(&grey);
        assert_eq!(stats.p95, 200.0);
        assert!(!detector.is_separator_stats(&stats));
    }

    #[test]
    fn test_percentile_interpolates() {
        // Values 0..=99, one of each: p95 = 94.05
        let mut histogram = [0u64; 256];
        for v in 0..100 {
            histogram[v] = 1;
        }
        let p = percentile(&histogram, 95.0);
        assert!((p - 94.05).abs() < 1e-9, "p95 {}", p);
    }

    #[test]
    fn test_entropy_two_equal_bins() {
        let mut histogram = [0u64; 256];
        histogram[0] = 50;
        histogram[255] = 50;
        assert!((entropy_bits(&histogram) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let detector = SeparatorDetector::new();
        let result = detector.is_separator(Path::new("/nonexistent/frame.jpg"));
        assert!(matches!(result, Err(DetectError::Decode(_))));
    }
}
