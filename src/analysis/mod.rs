//! Frame quality analysis.
//!
//! Classifies captured frames by a luminance-variance heuristic so the
//! presentation layer can prompt for a retake. These are sanity checks on
//! brightness spread, not a focus measurement.

mod quality;

pub use quality::{
    evaluate_quality, luminance_variance, QualityError, QualityGrade, QualityScore,
    EXCELLENT_VARIANCE, POOR_VARIANCE,
};
