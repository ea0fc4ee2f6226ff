//! Camera session lifecycle.
//!
//! One controller owns at most one hardware stream for its lifetime. The
//! status moves `Idle → Starting → {Ready | Error}`, back to `Starting` on a
//! facing switch, and to `Idle` on disposal. Consolidating the stream handle,
//! status and zoom into one tagged state eliminates the impossible
//! combinations (a "ready" session without a stream, a stream surviving an
//! error) that ad-hoc flags would allow.
//!
//! The internal mutex is held only across state transitions, never across an
//! await; host acquisition calls run unlocked and their results are committed
//! only when the session still expects them (attempt sequence), so a
//! `dispose()` issued mid-negotiation safely discards the late stream.

use super::classify::ErrorClassification;
use super::negotiator::ConstraintNegotiator;
use crate::config::SessionConfig;
use crate::host::{MediaHost, StreamHandle};
use crate::probe::{self, DeviceDescriptor, Facing};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Public session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session in progress.
    Idle,
    /// Negotiation in flight.
    Starting,
    /// Stream acquired; capture is possible.
    Ready,
    /// Negotiation exhausted; classification available.
    Error,
}

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The host failed the capability probe. Fatal: retrying without
    /// changing the environment cannot succeed.
    #[error("host environment does not support camera capture")]
    Incompatible,
    /// A negotiation is already in flight; requests are rejected, not queued.
    #[error("a stream negotiation is already in flight")]
    NegotiationInFlight,
    /// The operation is not allowed from the current state.
    #[error("operation `{op}` is not valid from the {from:?} state")]
    InvalidTransition {
        /// The rejected operation.
        op: &'static str,
        /// The state it was attempted from.
        from: SessionStatus,
    },
    /// The session was disposed while its negotiation was in flight.
    #[error("session was disposed during negotiation")]
    Cancelled,
    /// Every acquisition strategy failed.
    #[error("stream acquisition failed: {0}")]
    Acquisition(ErrorClassification),
}

enum Phase {
    Idle,
    Starting,
    Ready {
        stream: StreamHandle,
        generation: u64,
    },
    Error(ErrorClassification),
}

impl Phase {
    fn status(&self) -> SessionStatus {
        match self {
            Phase::Idle => SessionStatus::Idle,
            Phase::Starting => SessionStatus::Starting,
            Phase::Ready { .. } => SessionStatus::Ready,
            Phase::Error(_) => SessionStatus::Error,
        }
    }
}

struct SessionInner {
    phase: Phase,
    facing: Facing,
    zoom: f32,
    software_scale: Option<f32>,
    devices: Vec<DeviceDescriptor>,
    /// Bumped on every transition into Starting and on dispose. An async
    /// step commits its result only when the sequence still matches.
    attempt_seq: u64,
    /// Generation source for Ready streams; lets a zoom request detect that
    /// the handle it targeted has been replaced.
    stream_seq: u64,
}

/// Owns and drives one camera session.
pub struct SessionController<H: MediaHost> {
    host: Arc<H>,
    config: SessionConfig,
    state: Mutex<SessionInner>,
}

/// Clamps a zoom adjustment to the allowed range.
pub(crate) fn step_zoom(current: f32, delta: f32, max_zoom: f32) -> f32 {
    (current + delta).clamp(1.0, max_zoom)
}

impl<H: MediaHost> SessionController<H> {
    /// Creates an idle controller over the given host.
    pub fn new(host: Arc<H>, config: SessionConfig) -> Self {
        Self {
            host,
            config,
            state: Mutex::new(SessionInner {
                phase: Phase::Idle,
                facing: Facing::default(),
                zoom: 1.0,
                software_scale: None,
                devices: Vec::new(),
                attempt_seq: 0,
                stream_seq: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current public status.
    pub fn status(&self) -> SessionStatus {
        self.lock().phase.status()
    }

    /// Current camera facing.
    pub fn facing(&self) -> Facing {
        self.lock().facing
    }

    /// Current zoom factor, within `[1.0, max_zoom]`.
    pub fn zoom(&self) -> f32 {
        self.lock().zoom
    }

    /// The fixed per-session zoom ceiling.
    pub fn max_zoom(&self) -> f32 {
        self.config.max_zoom
    }

    /// Scale factor the presentation layer should apply when hardware zoom
    /// was unavailable. `None` means no software zoom is active.
    pub fn preview_scale(&self) -> Option<f32> {
        self.lock().software_scale
    }

    /// Classification of the last failed negotiation, while in Error.
    pub fn last_error(&self) -> Option<ErrorClassification> {
        match &self.lock().phase {
            Phase::Error(class) => Some(class.clone()),
            _ => None,
        }
    }

    /// The cached camera list from the last detection.
    pub fn available_cameras(&self) -> Vec<DeviceDescriptor> {
        self.lock().devices.clone()
    }

    /// True when more than one camera was detected.
    pub fn can_switch_facing(&self) -> bool {
        self.lock().devices.len() > 1
    }

    /// Seeds the device cache, skipping enumeration on the next start.
    pub fn prime_devices(&self, devices: Vec<DeviceDescriptor>) {
        self.lock().devices = devices;
    }

    /// Starts the session: probe, enumerate (when the cache is empty), then
    /// the constraint cascade. Valid only from Idle.
    ///
    /// On success the session is Ready and owns the stream; on exhaustion it
    /// is Error with a classification. A disposal racing the negotiation
    /// wins: the late stream is stopped and `Cancelled` is returned.
    pub async fn start(&self) -> Result<(), SessionError> {
        let attempt = {
            let mut inner = self.lock();
            match inner.phase {
                Phase::Starting => return Err(SessionError::NegotiationInFlight),
                Phase::Idle => {}
                _ => {
                    return Err(SessionError::InvalidTransition {
                        op: "start",
                        from: inner.phase.status(),
                    })
                }
            }
            if !probe::check_compatibility(self.host.as_ref()) {
                return Err(SessionError::Incompatible);
            }
            inner.attempt_seq += 1;
            inner.phase = Phase::Starting;
            inner.zoom = 1.0;
            inner.software_scale = None;
            info!(facing = %inner.facing, "starting camera session");
            inner.attempt_seq
        };

        if self.lock().devices.is_empty() {
            let found = probe::detect_available_cameras(self.host.as_ref()).await;
            let mut inner = self.lock();
            if inner.attempt_seq != attempt || !matches!(inner.phase, Phase::Starting) {
                return Err(SessionError::Cancelled);
            }
            inner.devices = found;
        }

        let facing = self.lock().facing;
        let negotiator = ConstraintNegotiator::for_facing(facing, self.config.resolution);
        match negotiator.negotiate(self.host.as_ref()).await {
            Ok(stream) => {
                let mut inner = self.lock();
                if inner.attempt_seq != attempt || !matches!(inner.phase, Phase::Starting) {
                    // Disposed mid-negotiation; the stream must not outlive it.
                    stream.stop_all();
                    return Err(SessionError::Cancelled);
                }
                inner.stream_seq += 1;
                let generation = inner.stream_seq;
                inner.phase = Phase::Ready { stream, generation };
                info!("camera session ready");
                Ok(())
            }
            Err(e) => {
                let class = ErrorClassification::classify(&e);
                warn!(%class, "camera session failed to start");
                let mut inner = self.lock();
                if inner.attempt_seq == attempt && matches!(inner.phase, Phase::Starting) {
                    inner.phase = Phase::Error(class.clone());
                }
                Err(SessionError::Acquisition(class))
            }
        }
    }

    /// Disposes the current stream, flips the facing and renegotiates.
    /// Valid from Ready or Error.
    pub async fn switch_facing(&self) -> Result<(), SessionError> {
        {
            let mut inner = self.lock();
            match inner.phase {
                Phase::Ready { .. } | Phase::Error(_) => {}
                _ => {
                    return Err(SessionError::InvalidTransition {
                        op: "switch_facing",
                        from: inner.phase.status(),
                    })
                }
            }
            Self::dispose_locked(&mut inner);
            inner.facing = inner.facing.flipped();
            info!(facing = %inner.facing, "switching camera facing");
        }
        self.start().await
    }

    /// Adjusts the zoom by `delta`, clamped to `[1.0, max_zoom]`, and
    /// returns the effective zoom.
    ///
    /// Hardware zoom is attempted first; when the track lacks the capability
    /// or rejects the constraint, the zoom falls back to a presentation-layer
    /// scale factor without error and without touching the session status.
    /// Outside Ready, or against a handle that a facing switch has replaced
    /// while the request was in flight, the call is a no-op.
    pub async fn adjust_zoom(&self, delta: f32) -> f32 {
        let (track, generation, target) = {
            let inner = self.lock();
            let Phase::Ready { stream, generation } = &inner.phase else {
                return inner.zoom;
            };
            let target = step_zoom(inner.zoom, delta, self.config.max_zoom);
            if (target - inner.zoom).abs() < f32::EPSILON {
                return inner.zoom;
            }
            (stream.primary_track().cloned(), *generation, target)
        };

        let hardware = match &track {
            Some(track) if track.capabilities().zoom.is_some() => {
                match track.apply_zoom(target).await {
                    Ok(()) => true,
                    Err(e) => {
                        debug!(error = %e, "hardware zoom rejected; falling back to preview scaling");
                        false
                    }
                }
            }
            _ => false,
        };

        let mut inner = self.lock();
        let Phase::Ready {
            generation: current,
            ..
        } = &inner.phase
        else {
            return inner.zoom;
        };
        if *current != generation {
            // The stream was replaced while this request was in flight.
            return inner.zoom;
        }
        inner.zoom = target;
        inner.software_scale = (!hardware && target > 1.0).then_some(target);
        target
    }

    /// Zooms in by one configured step.
    pub async fn zoom_in(&self) -> f32 {
        self.adjust_zoom(self.config.zoom_step).await
    }

    /// Zooms out by one configured step.
    pub async fn zoom_out(&self) -> f32 {
        self.adjust_zoom(-self.config.zoom_step).await
    }

    /// Releases the stream, resets zoom and software scaling, and returns to
    /// Idle. Idempotent; safe to call from any state, including while a
    /// negotiation is in flight.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        Self::dispose_locked(&mut inner);
    }

    fn dispose_locked(inner: &mut SessionInner) {
        inner.attempt_seq += 1;
        let previous = std::mem::replace(&mut inner.phase, Phase::Idle);
        if let Phase::Ready { stream, .. } = previous {
            stream.stop_all();
            info!("camera session disposed");
        }
        inner.zoom = 1.0;
        inner.software_scale = None;
    }
}

impl<H: MediaHost> Drop for SessionController<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MockHost, StreamError};
    use crate::probe::DeviceKind;
    use crate::session::ErrorKind;
    use proptest::prelude::*;
    use std::time::Duration;

    fn two_devices() -> Vec<DeviceDescriptor> {
        vec![
            DeviceDescriptor::new("cam-0", "Back Camera", DeviceKind::VideoInput),
            DeviceDescriptor::new("cam-1", "Front Camera", DeviceKind::VideoInput),
        ]
    }

    async fn ready_session(host: Arc<MockHost>) -> SessionController<MockHost> {
        let session = SessionController::new(host, SessionConfig::default());
        session.start().await.unwrap();
        session
    }

    async fn wait_for_status(session: &SessionController<MockHost>, status: SessionStatus) {
        for _ in 0..500 {
            if session.status() == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("session never reached {:?}", status);
    }

    #[tokio::test]
    async fn test_start_reaches_ready() {
        let host = Arc::new(MockHost::with_cameras(2));
        let session = ready_session(host.clone()).await;

        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.facing(), Facing::Environment);
        assert!(session.can_switch_facing());
        // One live negotiated track; the detection throwaway was stopped.
        assert_eq!(host.live_track_count(), 1);
    }

    #[tokio::test]
    async fn test_start_rejected_outside_idle() {
        let host = Arc::new(MockHost::with_cameras(1));
        let session = ready_session(host).await;

        assert!(matches!(
            session.start().await,
            Err(SessionError::InvalidTransition { op: "start", .. })
        ));
    }

    #[tokio::test]
    async fn test_overlapping_negotiation_rejected() {
        let host = Arc::new(MockHost::with_cameras(1).gated());
        let session = Arc::new(SessionController::new(host.clone(), SessionConfig::default()));
        session.prime_devices(two_devices());

        let background = {
            let session = session.clone();
            tokio::spawn(async move { session.start().await })
        };
        wait_for_status(&session, SessionStatus::Starting).await;

        assert!(matches!(
            session.start().await,
            Err(SessionError::NegotiationInFlight)
        ));

        host.release_acquisitions(1);
        background.await.unwrap().unwrap();
        assert_eq!(session.status(), SessionStatus::Ready);
    }

    #[tokio::test]
    async fn test_incompatible_host_never_starts() {
        let session = SessionController::new(
            Arc::new(MockHost::with_cameras(1).insecure()),
            SessionConfig::default(),
        );
        assert!(matches!(
            session.start().await,
            Err(SessionError::Incompatible)
        ));
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_exhaustion_classifies_and_enters_error() {
        let host = Arc::new(
            MockHost::with_cameras(1)
                .denying(StreamError::AccessDenied("prompt dismissed".into())),
        );
        let session = SessionController::new(host.clone(), SessionConfig::default());

        let result = session.start().await;
        match result {
            Err(SessionError::Acquisition(class)) => {
                assert_eq!(class.kind, ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(session.status(), SessionStatus::Error);
        assert_eq!(
            session.last_error().map(|c| c.kind),
            Some(ErrorKind::PermissionDenied)
        );

        session.dispose();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(host.live_track_count(), 0);
    }

    #[tokio::test]
    async fn test_unconstrained_fallback_reaches_ready() {
        // Ideal and facing-only both fail; the cascade must still succeed.
        let host = Arc::new(
            MockHost::with_cameras(1)
                .rejecting_resolution_hints()
                .rejecting_facing_constraints(),
        );
        let session = SessionController::new(host, SessionConfig::default());
        session.start().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Ready);
    }

    #[tokio::test]
    async fn test_switch_facing_flips_and_resets_zoom() {
        let host = Arc::new(MockHost::with_cameras(2));
        let session = ready_session(host.clone()).await;

        session.zoom_in().await;
        assert_eq!(session.zoom(), 1.5);

        session.switch_facing().await.unwrap();
        assert_eq!(session.facing(), Facing::User);
        assert_eq!(session.zoom(), 1.0);
        assert_eq!(session.status(), SessionStatus::Ready);
        // Only the renegotiated stream is live.
        assert_eq!(host.live_track_count(), 1);
    }

    #[tokio::test]
    async fn test_switch_facing_rejected_from_idle() {
        let session = SessionController::new(
            Arc::new(MockHost::with_cameras(2)),
            SessionConfig::default(),
        );
        assert!(matches!(
            session.switch_facing().await,
            Err(SessionError::InvalidTransition {
                op: "switch_facing",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_single_camera_cannot_switch() {
        let session = ready_session(Arc::new(MockHost::with_cameras(1))).await;
        assert!(!session.can_switch_facing());
    }

    #[tokio::test]
    async fn test_zoom_saturates_at_bounds() {
        let session = ready_session(Arc::new(MockHost::with_cameras(1))).await;

        for _ in 0..10 {
            session.zoom_in().await;
        }
        assert_eq!(session.zoom(), session.max_zoom());

        for _ in 0..20 {
            session.zoom_out().await;
        }
        assert_eq!(session.zoom(), 1.0);
    }

    #[tokio::test]
    async fn test_hardware_zoom_applied_when_supported() {
        let host = Arc::new(MockHost::with_cameras(1));
        let session = ready_session(host.clone()).await;

        assert_eq!(session.zoom_in().await, 1.5);
        assert_eq!(session.preview_scale(), None);

        let tracks = host.granted_tracks();
        let negotiated = tracks.last().unwrap();
        assert_eq!(negotiated.applied_zoom(), Some(1.5));
    }

    #[tokio::test]
    async fn test_software_zoom_fallback_keeps_status() {
        let host = Arc::new(MockHost::with_cameras(1).without_hardware_zoom());
        let session = ready_session(host).await;

        assert_eq!(session.zoom_in().await, 1.5);
        assert_eq!(session.preview_scale(), Some(1.5));
        assert_eq!(session.status(), SessionStatus::Ready);

        // Back to 1.0 clears the scale transform.
        assert_eq!(session.zoom_out().await, 1.0);
        assert_eq!(session.preview_scale(), None);
    }

    #[tokio::test]
    async fn test_zoom_is_noop_outside_ready() {
        let session = SessionController::new(
            Arc::new(MockHost::with_cameras(1)),
            SessionConfig::default(),
        );
        assert_eq!(session.adjust_zoom(0.5).await, 1.0);
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_zoom_racing_facing_switch_is_noop() {
        let host = Arc::new(MockHost::with_cameras(2).gated());
        let session = Arc::new(SessionController::new(host.clone(), SessionConfig::default()));
        session.prime_devices(two_devices());

        host.release_acquisitions(1);
        session.start().await.unwrap();

        let switching = {
            let session = session.clone();
            tokio::spawn(async move { session.switch_facing().await })
        };
        wait_for_status(&session, SessionStatus::Starting).await;

        // The old handle is gone; the zoom request must not touch it.
        assert_eq!(session.adjust_zoom(0.5).await, 1.0);

        host.release_acquisitions(1);
        switching.await.unwrap().unwrap();
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.zoom(), 1.0);
    }

    #[tokio::test]
    async fn test_dispose_interrupts_negotiation() {
        let host = Arc::new(MockHost::with_cameras(1).gated());
        let session = Arc::new(SessionController::new(host.clone(), SessionConfig::default()));
        session.prime_devices(two_devices());

        let background = {
            let session = session.clone();
            tokio::spawn(async move { session.start().await })
        };
        wait_for_status(&session, SessionStatus::Starting).await;

        session.dispose();
        assert_eq!(session.status(), SessionStatus::Idle);

        // Let the in-flight acquisition complete; its stream must be dropped.
        host.release_acquisitions(1);
        assert!(matches!(
            background.await.unwrap(),
            Err(SessionError::Cancelled)
        ));
        assert_eq!(host.live_track_count(), 0);
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let host = Arc::new(MockHost::with_cameras(1));
        let session = ready_session(host.clone()).await;

        session.dispose();
        session.dispose();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.zoom(), 1.0);
        assert_eq!(host.live_track_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_tracks() {
        let host = Arc::new(MockHost::with_cameras(1));
        {
            let _session = ready_session(host.clone()).await;
            assert_eq!(host.live_track_count(), 1);
        }
        assert_eq!(host.live_track_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_zoom_stays_in_range(
            deltas in prop::collection::vec(-3.0f32..3.0, 0..64),
            max_zoom in 1.0f32..10.0,
        ) {
            let mut zoom = 1.0f32;
            for delta in deltas {
                zoom = step_zoom(zoom, delta, max_zoom);
                prop_assert!(zoom >= 1.0);
                prop_assert!(zoom <= max_zoom);
            }
        }
    }
}
