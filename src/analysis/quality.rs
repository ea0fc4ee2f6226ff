//! Luminance-variance quality heuristic.
//!
//! A very flat luminance distribution usually means a covered lens, a wall,
//! or a badly underexposed shot. The variance of per-pixel luminance is a
//! cheap proxy for that: a brightness/contrast measure, not a focus
//! or sharpness measurement, and is documented as such.

use crate::capture::CapturedFrame;
use thiserror::Error;
use tracing::debug;

/// Variance above which a frame is graded Excellent (strict).
pub const EXCELLENT_VARIANCE: f64 = 1000.0;

/// Variance below which a frame is graded Poor (strict).
pub const POOR_VARIANCE: f64 = 200.0;

/// Errors that can occur during quality evaluation.
#[derive(Debug, Clone, Error)]
pub enum QualityError {
    /// The preview encoding could not be decoded.
    #[error("failed to decode preview frame: {0}")]
    Decode(String),
}

/// Quality grade derived from luminance variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityGrade {
    /// High luminance spread; plenty of contrast.
    Excellent,
    /// Acceptable spread. Boundary variances classify here.
    Good,
    /// Very flat luminance; likely unusable.
    Poor,
}

impl QualityGrade {
    /// Classifies a variance value. Both thresholds are strict: the
    /// boundary values 1000 and 200 grade Good.
    pub fn from_variance(variance: f64) -> Self {
        if variance > EXCELLENT_VARIANCE {
            QualityGrade::Excellent
        } else if variance < POOR_VARIANCE {
            QualityGrade::Poor
        } else {
            QualityGrade::Good
        }
    }

    /// Lower-case label for logs and presentation.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityGrade::Excellent => "excellent",
            QualityGrade::Good => "good",
            QualityGrade::Poor => "poor",
        }
    }
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frame's quality grade together with the raw variance it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScore {
    /// The classification.
    pub grade: QualityGrade,
    /// Population variance of per-pixel luminance.
    pub variance: f64,
}

/// Evaluates a captured frame's quality from its preview encoding.
pub fn evaluate_quality(frame: &CapturedFrame) -> Result<QualityScore, QualityError> {
    let decoded = image::load_from_memory(frame.preview_bytes())
        .map_err(|e| QualityError::Decode(e.to_string()))?;
    let rgb = decoded.to_rgb8();
    let variance = luminance_variance(rgb.as_raw());
    let grade = QualityGrade::from_variance(variance);
    debug!(variance, grade = %grade, "frame quality evaluated");
    Ok(QualityScore { grade, variance })
}

/// Population variance of per-pixel luminance over an RGB8 buffer.
///
/// Luminance is the unweighted mean of the three channels. Two passes: mean
/// first, then squared deviations. Empty input yields zero.
pub fn luminance_variance(rgb_pixels: &[u8]) -> f64 {
    let pixels = rgb_pixels.chunks_exact(3);
    let count = pixels.len();
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;

    let mean: f64 = rgb_pixels
        .chunks_exact(3)
        .map(|p| (p[0] as f64 + p[1] as f64 + p[2] as f64) / 3.0)
        .sum::<f64>()
        / n;

    rgb_pixels
        .chunks_exact(3)
        .map(|p| {
            let luminance = (p[0] as f64 + p[1] as f64 + p[2] as f64) / 3.0;
            (luminance - mean).powi(2)
        })
        .sum::<f64>()
        / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Raster;

    fn frame_from_pixels(pixels: Vec<u8>, width: u32, height: u32) -> CapturedFrame {
        let raster = Raster::new(pixels, width, height);
        let preview = crate::capture::encode_jpeg(&raster, 0.8).unwrap();
        let delivery = crate::capture::encode_jpeg(&raster, 0.6).unwrap();
        CapturedFrame::new(raster, preview, delivery)
    }

    #[test]
    fn test_boundaries_grade_good() {
        assert_eq!(QualityGrade::from_variance(1000.0), QualityGrade::Good);
        assert_eq!(QualityGrade::from_variance(200.0), QualityGrade::Good);
        assert_eq!(QualityGrade::from_variance(1000.1), QualityGrade::Excellent);
        assert_eq!(QualityGrade::from_variance(199.9), QualityGrade::Poor);
    }

    #[test]
    fn test_flat_buffer_has_zero_variance() {
        let pixels = vec![128u8; 64 * 64 * 3];
        assert_eq!(luminance_variance(&pixels), 0.0);
        assert_eq!(luminance_variance(&[]), 0.0);
    }

    #[test]
    fn test_two_level_variance_is_exact() {
        // Half the pixels at 0, half at 200: mean 100, variance 10000.
        let mut pixels = vec![0u8; 50 * 3];
        pixels.extend(vec![200u8; 50 * 3]);
        let variance = luminance_variance(&pixels);
        assert!((variance - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_frame_evaluates_poor() {
        let frame = frame_from_pixels(vec![128u8; 64 * 64 * 3], 64, 64);
        let score = evaluate_quality(&frame).unwrap();
        assert_eq!(score.grade, QualityGrade::Poor);
    }

    #[test]
    fn test_gradient_frame_evaluates_excellent() {
        let mut pixels = Vec::with_capacity(256 * 16 * 3);
        for _row in 0..16 {
            for x in 0..256u32 {
                let v = x as u8;
                pixels.extend_from_slice(&[v, v, v]);
            }
        }
        let frame = frame_from_pixels(pixels, 256, 16);
        let score = evaluate_quality(&frame).unwrap();
        assert_eq!(score.grade, QualityGrade::Excellent);
        assert!(score.variance > EXCELLENT_VARIANCE);
    }

    #[test]
    fn test_garbage_preview_fails_decode() {
        let raster = Raster::new(vec![0u8; 4 * 4 * 3], 4, 4);
        let frame = CapturedFrame::new(raster, b"not a jpeg".to_vec(), Vec::new());
        assert!(matches!(
            evaluate_quality(&frame),
            Err(QualityError::Decode(_))
        ));
    }
}
