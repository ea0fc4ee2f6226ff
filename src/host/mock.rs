//! Mock host environment for tests and the demo CLI.
//!
//! `MockHost` hands out synthetic streams and devices with configurable
//! failure modes, and keeps a registry of every track it ever granted so
//! tests can assert that disposal released all hardware.

use super::{
    CaptureSurface, MediaHost, Raster, StreamConstraints, StreamError, StreamHandle, SurfaceError,
    SurfaceReadiness, TrackCapabilities, TrackControl, VideoTrack, ZoomRange,
};
use crate::probe::{DeviceDescriptor, DeviceKind};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// A synthetic video track backed by atomic state.
#[derive(Debug)]
pub struct MockTrack {
    live: AtomicBool,
    zoom_capable: bool,
    zoom: Mutex<Option<f32>>,
}

impl MockTrack {
    fn new(zoom_capable: bool) -> Self {
        Self {
            live: AtomicBool::new(true),
            zoom_capable,
            zoom: Mutex::new(None),
        }
    }

    /// The last hardware zoom factor applied, if any.
    pub fn applied_zoom(&self) -> Option<f32> {
        *self.zoom.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TrackControl for MockTrack {
    fn capabilities(&self) -> TrackCapabilities {
        TrackCapabilities {
            zoom: self
                .zoom_capable
                .then_some(ZoomRange { min: 1.0, max: 8.0 }),
        }
    }

    async fn apply_zoom(&self, zoom: f32) -> Result<(), StreamError> {
        if !self.zoom_capable {
            return Err(StreamError::Unsupported(
                "track does not support zoom".into(),
            ));
        }
        *self.zoom.lock().unwrap_or_else(|e| e.into_inner()) = Some(zoom);
        Ok(())
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Configurable mock implementation of [`MediaHost`].
pub struct MockHost {
    secure_context: bool,
    can_acquire: bool,
    can_enumerate: bool,
    devices: Vec<DeviceDescriptor>,
    reject_resolution: bool,
    reject_facing: bool,
    deny_all: Option<StreamError>,
    fail_enumeration: bool,
    hardware_zoom: bool,
    gate: Option<Arc<Semaphore>>,
    labels_unlocked: AtomicBool,
    granted: Mutex<Vec<Arc<MockTrack>>>,
}

impl MockHost {
    /// A compatible host reporting `cameras` video input devices.
    pub fn with_cameras(cameras: usize) -> Self {
        let devices = (0..cameras)
            .map(|i| {
                let label = if i == 0 { "Back Camera" } else { "Front Camera" };
                DeviceDescriptor::new(format!("cam-{i}"), label, DeviceKind::VideoInput)
            })
            .collect();
        Self {
            secure_context: true,
            can_acquire: true,
            can_enumerate: true,
            devices,
            reject_resolution: false,
            reject_facing: false,
            deny_all: None,
            fail_enumeration: false,
            hardware_zoom: true,
            gate: None,
            labels_unlocked: AtomicBool::new(false),
            granted: Mutex::new(Vec::new()),
        }
    }

    /// Reports an insecure context.
    pub fn insecure(mut self) -> Self {
        self.secure_context = false;
        self
    }

    /// Removes the stream-acquisition capability entirely.
    pub fn without_acquisition(mut self) -> Self {
        self.can_acquire = false;
        self
    }

    /// Removes the device-enumeration capability entirely.
    pub fn without_enumeration(mut self) -> Self {
        self.can_enumerate = false;
        self
    }

    /// Fails any acquisition attempt that carries resolution hints.
    pub fn rejecting_resolution_hints(mut self) -> Self {
        self.reject_resolution = true;
        self
    }

    /// Fails any acquisition attempt that carries a facing constraint.
    pub fn rejecting_facing_constraints(mut self) -> Self {
        self.reject_facing = true;
        self
    }

    /// Fails every acquisition attempt with the given error.
    pub fn denying(mut self, error: StreamError) -> Self {
        self.deny_all = Some(error);
        self
    }

    /// Makes `enumerate_devices` itself fail.
    pub fn failing_enumeration(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    /// Hands out tracks without hardware zoom capability.
    pub fn without_hardware_zoom(mut self) -> Self {
        self.hardware_zoom = false;
        self
    }

    /// Holds every acquisition until [`MockHost::release_acquisitions`].
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Lets `count` gated acquisitions proceed.
    pub fn release_acquisitions(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Every track this host ever granted.
    pub fn granted_tracks(&self) -> Vec<Arc<MockTrack>> {
        self.granted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of granted tracks that are still live.
    pub fn live_track_count(&self) -> usize {
        self.granted_tracks().iter().filter(|t| t.is_live()).count()
    }
}

#[async_trait]
impl MediaHost for MockHost {
    fn is_secure_context(&self) -> bool {
        self.secure_context
    }

    fn supports_stream_acquisition(&self) -> bool {
        self.can_acquire
    }

    fn supports_device_enumeration(&self) -> bool {
        self.can_enumerate
    }

    async fn acquire_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<StreamHandle, StreamError> {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if !self.can_acquire {
            return Err(StreamError::Unsupported(
                "stream acquisition is not available".into(),
            ));
        }
        if let Some(error) = &self.deny_all {
            return Err(error.clone());
        }
        if self.devices.is_empty() {
            return Err(StreamError::NoDevice("no video input present".into()));
        }
        if constraints.resolution.is_some() && self.reject_resolution {
            return Err(StreamError::Overconstrained(
                "resolution hints not satisfiable".into(),
            ));
        }
        if constraints.facing.is_some() && self.reject_facing {
            return Err(StreamError::Overconstrained(
                "facing constraint not satisfiable".into(),
            ));
        }

        let track = Arc::new(MockTrack::new(self.hardware_zoom));
        self.granted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(track.clone());
        self.labels_unlocked.store(true, Ordering::SeqCst);
        Ok(StreamHandle::new(vec![VideoTrack::new(track)]))
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>, StreamError> {
        if !self.can_enumerate || self.fail_enumeration {
            return Err(StreamError::Unsupported(
                "device enumeration is not available".into(),
            ));
        }
        let unlocked = self.labels_unlocked.load(Ordering::SeqCst);
        Ok(self
            .devices
            .iter()
            .map(|d| {
                if unlocked {
                    d.clone()
                } else {
                    DeviceDescriptor::new(d.id.clone(), "", d.kind)
                }
            })
            .collect())
    }
}

/// Synthetic pixel content generated by [`MockSurface`].
#[derive(Debug, Clone, Copy)]
pub enum PixelPattern {
    /// Horizontal luminance ramp, high variance.
    Gradient,
    /// Constant gray value, zero variance.
    Flat(u8),
}

impl PixelPattern {
    fn fill(&self, width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize) * 3);
        for _y in 0..height {
            for x in 0..width {
                let value = match self {
                    PixelPattern::Gradient => {
                        ((x as u64 * 255) / (width.max(2) as u64 - 1)) as u8
                    }
                    PixelPattern::Flat(v) => *v,
                };
                pixels.extend_from_slice(&[value, value, value]);
            }
        }
        pixels
    }
}

/// Mock capture surface with configurable readiness and native size.
pub struct MockSurface {
    readiness: SurfaceReadiness,
    native_size: Option<(u32, u32)>,
    pattern: PixelPattern,
    detached: bool,
}

impl MockSurface {
    /// A ready surface producing a high-variance gradient frame.
    pub fn gradient(width: u32, height: u32) -> Self {
        Self {
            readiness: SurfaceReadiness::CurrentFrame,
            native_size: Some((width, height)),
            pattern: PixelPattern::Gradient,
            detached: false,
        }
    }

    /// A ready surface producing a flat (zero-variance) frame.
    pub fn flat(width: u32, height: u32, value: u8) -> Self {
        Self {
            readiness: SurfaceReadiness::CurrentFrame,
            native_size: Some((width, height)),
            pattern: PixelPattern::Flat(value),
            detached: false,
        }
    }

    /// Overrides the reported readiness level.
    pub fn with_readiness(mut self, readiness: SurfaceReadiness) -> Self {
        self.readiness = readiness;
        self
    }

    /// Makes the surface report no native dimensions.
    pub fn without_native_size(mut self) -> Self {
        self.native_size = None;
        self
    }

    /// Detaches the surface; rasterization will fail.
    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }
}

impl CaptureSurface for MockSurface {
    fn readiness(&self) -> SurfaceReadiness {
        self.readiness
    }

    fn native_size(&self) -> Option<(u32, u32)> {
        self.native_size
    }

    fn rasterize(&self, width: u32, height: u32) -> Result<Raster, SurfaceError> {
        if self.detached {
            return Err(SurfaceError::Detached);
        }
        if self.readiness < SurfaceReadiness::MetadataLoaded {
            return Err(SurfaceError::NotReady);
        }
        Ok(Raster::new(self.pattern.fill(width, height), width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ResolutionHint;
    use crate::probe::Facing;

    #[tokio::test]
    async fn test_acquire_registers_track() {
        let host = MockHost::with_cameras(1);
        let stream = host
            .acquire_stream(&StreamConstraints::unconstrained())
            .await
            .unwrap();
        assert_eq!(host.live_track_count(), 1);
        stream.stop_all();
        assert_eq!(host.live_track_count(), 0);
    }

    #[tokio::test]
    async fn test_labels_locked_until_grant() {
        let host = MockHost::with_cameras(1);
        let before = host.enumerate_devices().await.unwrap();
        assert!(before[0].label.is_empty());

        host.acquire_stream(&StreamConstraints::unconstrained())
            .await
            .unwrap();
        let after = host.enumerate_devices().await.unwrap();
        assert_eq!(after[0].label, "Back Camera");
    }

    #[tokio::test]
    async fn test_constraint_rejection_modes() {
        let host = MockHost::with_cameras(1)
            .rejecting_resolution_hints()
            .rejecting_facing_constraints();

        let ideal = StreamConstraints::ideal(Facing::Environment, ResolutionHint::default());
        assert!(host.acquire_stream(&ideal).await.is_err());

        let facing = StreamConstraints::facing_only(Facing::Environment);
        assert!(host.acquire_stream(&facing).await.is_err());

        assert!(host
            .acquire_stream(&StreamConstraints::unconstrained())
            .await
            .is_ok());
    }

    #[test]
    fn test_gradient_pattern_varies() {
        let pixels = PixelPattern::Gradient.fill(64, 4);
        assert_eq!(pixels.len(), 64 * 4 * 3);
        assert_ne!(pixels[0], pixels[pixels.len() - 1]);
    }
}
