//! Capability probing and camera detection.
//!
//! The probe gates everything else: a session never starts on a host that
//! lacks a secure context or the acquisition/enumeration capabilities.
//! Detection degrades rather than fails; on total failure it reports an
//! empty device list.

mod descriptor;

pub use descriptor::{DeviceDescriptor, DeviceKind, Facing};

use crate::host::{MediaHost, StreamConstraints};
use tracing::{debug, info, warn};

/// Snapshot of the host's capture-related capabilities.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityReport {
    /// Secure context (or local loopback).
    pub secure_context: bool,
    /// Stream acquisition available.
    pub can_acquire: bool,
    /// Device enumeration available.
    pub can_enumerate: bool,
}

impl CapabilityReport {
    /// Probes the host's capabilities.
    pub fn probe<H: MediaHost + ?Sized>(host: &H) -> Self {
        Self {
            secure_context: host.is_secure_context(),
            can_acquire: host.supports_stream_acquisition(),
            can_enumerate: host.supports_device_enumeration(),
        }
    }

    /// True only when every prong is satisfied.
    pub fn is_compatible(&self) -> bool {
        self.secure_context && self.can_acquire && self.can_enumerate
    }
}

/// Checks whether the host can run a capture session at all.
///
/// Logs each prong for diagnosis; has no other side effects. Callers must
/// abort session start when this returns false.
pub fn check_compatibility<H: MediaHost + ?Sized>(host: &H) -> bool {
    let report = CapabilityReport::probe(host);
    debug!(
        secure_context = report.secure_context,
        can_acquire = report.can_acquire,
        can_enumerate = report.can_enumerate,
        "host capability probe"
    );
    if !report.secure_context {
        warn!("camera capture requires a secure context or local loopback");
    }
    if !report.can_acquire {
        warn!("host cannot acquire capture streams");
    }
    if !report.can_enumerate {
        warn!("host cannot enumerate media devices");
    }
    report.is_compatible()
}

/// Detects the cameras visible to the host.
///
/// Acquires and immediately releases a throwaway stream first so the platform
/// unlocks device labels, then enumerates and keeps the video inputs. Falls
/// back to unlabeled enumeration when the throwaway acquisition is refused,
/// and degrades to an empty list on total failure. Never errors.
pub async fn detect_available_cameras<H: MediaHost + ?Sized>(host: &H) -> Vec<DeviceDescriptor> {
    match host.acquire_stream(&StreamConstraints::unconstrained()).await {
        Ok(stream) => stream.stop_all(),
        Err(e) => debug!(error = %e, "label-unlock acquisition refused; enumerating unlabeled"),
    }

    match host.enumerate_devices().await {
        Ok(devices) => {
            let cameras: Vec<_> = devices
                .into_iter()
                .filter(|d| d.kind == DeviceKind::VideoInput)
                .collect();
            info!(count = cameras.len(), "cameras detected");
            cameras
        }
        Err(e) => {
            warn!(error = %e, "device enumeration failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockHost;

    #[test]
    fn test_compatible_host_passes() {
        assert!(check_compatibility(&MockHost::with_cameras(1)));
    }

    #[test]
    fn test_each_missing_prong_fails() {
        assert!(!check_compatibility(&MockHost::with_cameras(1).insecure()));
        assert!(!check_compatibility(
            &MockHost::with_cameras(1).without_acquisition()
        ));
        assert!(!check_compatibility(
            &MockHost::with_cameras(1).without_enumeration()
        ));
    }

    #[tokio::test]
    async fn test_detection_unlocks_labels() {
        let host = MockHost::with_cameras(2);
        let cameras = detect_available_cameras(&host).await;
        assert_eq!(cameras.len(), 2);
        assert!(cameras.iter().all(|c| !c.label.is_empty()));
        // The throwaway stream must not stay live.
        assert_eq!(host.live_track_count(), 0);
    }

    #[tokio::test]
    async fn test_detection_degrades_to_unlabeled() {
        let host = MockHost::with_cameras(1)
            .denying(crate::host::StreamError::AccessDenied("denied".into()));
        let cameras = detect_available_cameras(&host).await;
        assert_eq!(cameras.len(), 1);
        assert!(cameras[0].label.is_empty());
    }

    #[tokio::test]
    async fn test_detection_degrades_to_empty() {
        let host = MockHost::with_cameras(1)
            .denying(crate::host::StreamError::AccessDenied("denied".into()))
            .failing_enumeration();
        assert!(detect_available_cameras(&host).await.is_empty());
    }
}
