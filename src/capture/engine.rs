//! Single-frame capture: grab, downscale, dual encode.

use super::frame::{fit_dimensions, CapturedFrame, FALLBACK_NATIVE_SIZE};
use crate::config::CaptureConfig;
use crate::host::{CaptureSurface, MediaHost, Raster, SurfaceError, SurfaceReadiness};
use crate::session::{SessionController, SessionStatus};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while capturing a frame.
///
/// All of these are retryable in place; none of them tears down the session.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// The session or surface is not ready yet.
    #[error("capture is not ready: {0}")]
    NotReady(String),
    /// The capture surface is missing or detached.
    #[error("capture surface is unavailable")]
    Unavailable,
    /// An encode produced no usable data.
    #[error("frame encoding failed: {0}")]
    EncodeFailed(String),
}

/// Grabs a still frame from the capture surface and encodes it twice.
#[derive(Debug, Clone, Default)]
pub struct CaptureEngine {
    config: CaptureConfig,
}

impl CaptureEngine {
    /// Creates an engine with the given settings.
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    /// Captures one frame.
    ///
    /// Requires the session to be Ready and the surface to have reached at
    /// least metadata-loaded readiness. The native frame is downscaled
    /// (never upscaled) to fit the configured maximum dimension, rasterized
    /// once, and encoded at preview and delivery quality.
    pub fn capture<H, S>(
        &self,
        session: &SessionController<H>,
        surface: &S,
    ) -> Result<CapturedFrame, CaptureError>
    where
        H: MediaHost,
        S: CaptureSurface + ?Sized,
    {
        let status = session.status();
        if status != SessionStatus::Ready {
            return Err(CaptureError::NotReady(format!(
                "session status is {status:?}"
            )));
        }
        if surface.readiness() < SurfaceReadiness::MetadataLoaded {
            return Err(CaptureError::NotReady(
                "surface has not loaded frame metadata".into(),
            ));
        }

        let (native_w, native_h) = surface.native_size().unwrap_or_else(|| {
            warn!(
                width = FALLBACK_NATIVE_SIZE.0,
                height = FALLBACK_NATIVE_SIZE.1,
                "native frame dimensions unavailable; using defaults"
            );
            FALLBACK_NATIVE_SIZE
        });
        let (width, height) = fit_dimensions(native_w, native_h, self.config.max_dimension);

        let raster = surface.rasterize(width, height).map_err(|e| match e {
            SurfaceError::Detached => CaptureError::Unavailable,
            SurfaceError::NotReady => CaptureError::NotReady("surface has no frame".into()),
        })?;

        let preview_bytes = encode_jpeg(&raster, self.config.preview_quality)?;
        let delivery_bytes = encode_jpeg(&raster, self.config.delivery_quality)?;
        debug!(
            width,
            height,
            native_width = native_w,
            native_height = native_h,
            preview_bytes = preview_bytes.len(),
            delivery_bytes = delivery_bytes.len(),
            "frame captured"
        );

        Ok(CapturedFrame::new(raster, preview_bytes, delivery_bytes))
    }
}

/// Encodes an RGB raster as JPEG at the given quality factor in `(0, 1]`.
pub(crate) fn encode_jpeg(raster: &Raster, quality: f32) -> Result<Vec<u8>, CaptureError> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality_percent(quality));
    encoder
        .write_image(
            raster.pixels(),
            raster.width(),
            raster.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| CaptureError::EncodeFailed(e.to_string()))?;
    if out.is_empty() {
        return Err(CaptureError::EncodeFailed(
            "encoder produced zero bytes".into(),
        ));
    }
    Ok(out)
}

/// Converts a `(0, 1]` quality factor to the encoder's percent scale.
pub(crate) fn quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}
