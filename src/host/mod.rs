//! Host environment abstraction.
//!
//! The capture core does not talk to camera hardware directly. Everything it
//! needs from the surrounding platform (stream acquisition, device
//! enumeration, track control, a renderable surface to grab frames from) is
//! expressed as a trait here, allowing both real platform bindings and mock
//! implementations for testing.

mod mock;

pub use mock::{MockHost, MockSurface, MockTrack, PixelPattern};

use crate::probe::{DeviceDescriptor, Facing};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the host when acquiring or controlling a stream.
///
/// These are raw platform failures. The session layer classifies them into
/// the closed [`ErrorClassification`](crate::session::ErrorClassification)
/// taxonomy before they reach callers.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// The user or platform denied access to the camera.
    #[error("camera access denied: {0}")]
    AccessDenied(String),
    /// No capture device is present.
    #[error("no capture device found: {0}")]
    NoDevice(String),
    /// The host environment cannot capture at all.
    #[error("capture not supported: {0}")]
    Unsupported(String),
    /// The device exists but is held by another consumer.
    #[error("capture device busy: {0}")]
    Busy(String),
    /// No device satisfied the requested constraints.
    #[error("constraints not satisfiable: {0}")]
    Overconstrained(String),
    /// The constraint set itself was malformed.
    #[error("invalid capture configuration: {0}")]
    InvalidConfig(String),
    /// Anything the platform could not categorize.
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by a capture surface when grabbing a frame.
#[derive(Debug, Clone, Error)]
pub enum SurfaceError {
    /// The surface is no longer attached to a presentation target.
    #[error("capture surface is detached")]
    Detached,
    /// The surface exists but has not produced a frame yet.
    #[error("capture surface has no frame available")]
    NotReady,
}

/// Resolution preferences for an acquisition attempt.
///
/// `ideal_*` is what the negotiator asks for, `max_*` is the hard ceiling the
/// host may not exceed when honoring the hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionHint {
    /// Preferred frame width.
    pub ideal_width: u32,
    /// Preferred frame height.
    pub ideal_height: u32,
    /// Maximum acceptable width.
    pub max_width: u32,
    /// Maximum acceptable height.
    pub max_height: u32,
}

impl Default for ResolutionHint {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            max_width: 1920,
            max_height: 1080,
        }
    }
}

/// A single acquisition request handed to [`MediaHost::acquire_stream`].
///
/// Both fields are optional; an empty constraint set asks for any available
/// video source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamConstraints {
    /// Resolution preference, if any.
    pub resolution: Option<ResolutionHint>,
    /// Requested camera facing, if any.
    pub facing: Option<Facing>,
}

impl StreamConstraints {
    /// Any available video source, no hints.
    pub fn unconstrained() -> Self {
        Self::default()
    }

    /// Only the facing constraint, no resolution hints.
    pub fn facing_only(facing: Facing) -> Self {
        Self {
            resolution: None,
            facing: Some(facing),
        }
    }

    /// Full resolution hint plus facing.
    pub fn ideal(facing: Facing, resolution: ResolutionHint) -> Self {
        Self {
            resolution: Some(resolution),
            facing: Some(facing),
        }
    }
}

/// Hardware capabilities reported by a video track.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackCapabilities {
    /// Optical/digital zoom range, when the hardware supports it.
    pub zoom: Option<ZoomRange>,
}

/// Supported hardware zoom range of a track.
#[derive(Debug, Clone, Copy)]
pub struct ZoomRange {
    /// Minimum zoom factor.
    pub min: f32,
    /// Maximum zoom factor.
    pub max: f32,
}

/// Control interface of one hardware video track.
#[async_trait]
pub trait TrackControl: Send + Sync {
    /// Reports what the underlying hardware can do.
    fn capabilities(&self) -> TrackCapabilities;

    /// Applies a hardware zoom factor.
    ///
    /// Fails when the hardware rejects the constraint; callers fall back to
    /// presentation-layer scaling.
    async fn apply_zoom(&self, zoom: f32) -> Result<(), StreamError>;

    /// Stops the track and releases the hardware. Idempotent.
    fn stop(&self);

    /// True while the track still holds hardware.
    fn is_live(&self) -> bool;
}

/// Cloneable handle to one video track of an acquired stream.
#[derive(Clone)]
pub struct VideoTrack {
    inner: Arc<dyn TrackControl>,
}

impl VideoTrack {
    /// Wraps a track control implementation.
    pub fn new(inner: Arc<dyn TrackControl>) -> Self {
        Self { inner }
    }

    /// Reports the track's hardware capabilities.
    pub fn capabilities(&self) -> TrackCapabilities {
        self.inner.capabilities()
    }

    /// Applies a hardware zoom factor.
    pub async fn apply_zoom(&self, zoom: f32) -> Result<(), StreamError> {
        self.inner.apply_zoom(zoom).await
    }

    /// Stops the track. Idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// True while the track still holds hardware.
    pub fn is_live(&self) -> bool {
        self.inner.is_live()
    }
}

impl std::fmt::Debug for VideoTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoTrack")
            .field("live", &self.is_live())
            .finish()
    }
}

/// An acquired hardware stream, owning its tracks.
///
/// The handle is a single-owner resource: only the session controller holds
/// one, and every exit path stops the tracks. Dropping the handle stops any
/// track still live.
#[derive(Debug)]
pub struct StreamHandle {
    tracks: Vec<VideoTrack>,
}

impl StreamHandle {
    /// Builds a handle over the given tracks.
    pub fn new(tracks: Vec<VideoTrack>) -> Self {
        Self { tracks }
    }

    /// All tracks owned by this stream.
    pub fn tracks(&self) -> &[VideoTrack] {
        &self.tracks
    }

    /// The main video track, when the stream has one.
    pub fn primary_track(&self) -> Option<&VideoTrack> {
        self.tracks.first()
    }

    /// Stops every owned track. Idempotent.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// The media capabilities the surrounding platform provides.
///
/// Acquisition and enumeration are the genuine suspend points of the core;
/// everything else in the pipeline is synchronous CPU work.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// True when running in a secure context or on local loopback.
    fn is_secure_context(&self) -> bool;

    /// True when the platform can acquire capture streams at all.
    fn supports_stream_acquisition(&self) -> bool;

    /// True when the platform can enumerate media devices.
    fn supports_device_enumeration(&self) -> bool;

    /// Acquires a capture stream matching the constraints.
    ///
    /// One atomic attempt; fallback across constraint sets is the
    /// negotiator's job, not the host's.
    async fn acquire_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<StreamHandle, StreamError>;

    /// Lists the media devices currently visible to the platform.
    ///
    /// Labels may be empty until a stream has been granted.
    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>, StreamError>;
}

/// Readiness of a capture surface, ordered from least to most ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SurfaceReadiness {
    /// Nothing has loaded yet.
    Empty,
    /// Frame metadata (dimensions) is known.
    MetadataLoaded,
    /// A current frame is available for grabbing.
    CurrentFrame,
}

/// A renderable surface the engine grabs frames from.
///
/// Mirrors a preview element fed by the active stream: it knows its readiness
/// level and native frame size, and can rasterize the current frame at a
/// requested size.
pub trait CaptureSurface: Send + Sync {
    /// Current readiness level.
    fn readiness(&self) -> SurfaceReadiness;

    /// Native frame dimensions, when the surface has learned them.
    fn native_size(&self) -> Option<(u32, u32)>;

    /// Rasterizes the current frame scaled to `width` x `height` RGB8.
    fn rasterize(&self, width: u32, height: u32) -> Result<Raster, SurfaceError>;
}

/// An RGB8 raster buffer with its dimensions.
#[derive(Clone)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// Builds a raster from raw RGB8 bytes.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Raster width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB8 bytes, row-major, 3 bytes per pixel.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Total pixel count (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the buffer length matches the dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * 3
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
