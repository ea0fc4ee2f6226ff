//! Size-tiered, bounded-iteration image re-encoding.
//!
//! Larger inputs get a more aggressive initial quality factor; a result that
//! is still over the delivery limit gets exactly one more pass at a fixed
//! quality and is then returned whatever its size. The two-pass bound is
//! deliberate, not a convergence loop.
//!
//! The pipeline is fail-open: input it cannot recognise or decode passes
//! through unchanged with a warning, never blocking delivery.

use crate::capture::{encode_jpeg, fit_dimensions};
use crate::host::Raster;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const MIB: usize = 1024 * 1024;

/// Settings for the compression pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Maximum output dimension on either axis.
    pub max_dimension: u32,
    /// Size above which a second encoding pass fires.
    pub oversize_limit_bytes: usize,
    /// Fixed quality factor of the second pass.
    pub second_pass_quality: f32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            oversize_limit_bytes: 2 * MIB,
            second_pass_quality: 0.4,
        }
    }
}

/// Outcome of one compression run.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// The delivery bytes: re-encoded JPEG, or the untouched input on the
    /// fail-open path.
    pub bytes: Vec<u8>,
    /// Output width; 0 when the input was passed through unencoded.
    pub width: u32,
    /// Output height; 0 when the input was passed through unencoded.
    pub height: u32,
    /// Encoding passes performed: 1 or 2, or 0 on the fail-open path.
    pub pass_count: u8,
    /// Size of the input in bytes.
    pub original_size: usize,
    /// Size of `bytes`.
    pub final_size: usize,
}

impl CompressionResult {
    /// Size reduction achieved, as a percentage of the original.
    pub fn reduction_percent(&self) -> i64 {
        if self.original_size == 0 {
            return 0;
        }
        (100.0 * (1.0 - self.final_size as f64 / self.original_size as f64)).round() as i64
    }

    fn pass_through(input: &[u8]) -> Self {
        Self {
            bytes: input.to_vec(),
            width: 0,
            height: 0,
            pass_count: 0,
            original_size: input.len(),
            final_size: input.len(),
        }
    }
}

/// Stateless compressor; one instance may serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    config: CompressionConfig,
}

impl Compressor {
    /// Creates a compressor with the given settings.
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Initial quality factor for an input of `original_size` bytes.
    ///
    /// The tier table is part of the delivery contract: `>10MiB → 0.3`,
    /// `>5MiB → 0.4`, `>2MiB → 0.5`, otherwise `0.6`.
    pub fn initial_quality(original_size: usize) -> f32 {
        if original_size > 10 * MIB {
            0.3
        } else if original_size > 5 * MIB {
            0.4
        } else if original_size > 2 * MIB {
            0.5
        } else {
            0.6
        }
    }

    /// Compresses an image for delivery.
    ///
    /// Decodes, downscales to the configured bound (never upscaling),
    /// encodes at the size-tiered quality, and re-encodes once at the fixed
    /// second-pass quality when still over the limit. Unrecognised or
    /// undecodable input is returned unchanged.
    pub fn compress(&self, input: &[u8]) -> CompressionResult {
        let original_size = input.len();

        if image::guess_format(input).is_err() {
            warn!("input is not a recognised image format; passing through unchanged");
            return CompressionResult::pass_through(input);
        }
        let decoded = match image::load_from_memory(input) {
            Ok(img) => img,
            Err(e) => {
                warn!(error = %e, "image decode failed; passing original bytes through");
                return CompressionResult::pass_through(input);
            }
        };

        let rgb = decoded.to_rgb8();
        let (width, height) = fit_dimensions(rgb.width(), rgb.height(), self.config.max_dimension);
        let scaled = if (width, height) == (rgb.width(), rgb.height()) {
            rgb
        } else {
            image::imageops::resize(&rgb, width, height, image::imageops::FilterType::Triangle)
        };
        let raster = Raster::new(scaled.into_raw(), width, height);

        let quality = Self::initial_quality(original_size);
        debug!(
            original_size,
            quality, width, height, "compressing image for delivery"
        );
        let first = match encode_jpeg(&raster, quality) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "compression encode failed; passing original bytes through");
                return CompressionResult::pass_through(input);
            }
        };

        let mut result = CompressionResult {
            final_size: first.len(),
            bytes: first,
            width,
            height,
            pass_count: 1,
            original_size,
        };
        info!(
            original_mib = original_size as f64 / MIB as f64,
            final_mib = result.final_size as f64 / MIB as f64,
            reduction_percent = result.reduction_percent(),
            "image optimised"
        );

        if result.final_size > self.config.oversize_limit_bytes {
            warn!(
                final_mib = result.final_size as f64 / MIB as f64,
                "compressed image still over the delivery limit; applying one fixed-quality pass"
            );
            match encode_jpeg(&raster, self.config.second_pass_quality) {
                Ok(second) => {
                    result.final_size = second.len();
                    result.bytes = second;
                    result.pass_count = 2;
                }
                Err(e) => {
                    warn!(error = %e, "second compression pass failed; keeping first pass");
                }
            }
            // Returned as-is even when still over the limit: no third pass.
        }

        result
    }
}
