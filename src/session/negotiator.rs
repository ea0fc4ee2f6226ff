//! Ordered constraint-fallback cascade for stream acquisition.
//!
//! Device capability is uncertain: the ideal resolution may be refused, the
//! requested facing may not exist. Instead of nested error handling, the
//! cascade is an ordered list of acquisition strategies evaluated through one
//! uniform attempt loop until the first success.

use crate::host::{MediaHost, ResolutionHint, StreamConstraints, StreamError, StreamHandle};
use crate::probe::Facing;
use tracing::{debug, info, warn};

/// One named acquisition strategy.
#[derive(Debug, Clone)]
struct Attempt {
    strategy: &'static str,
    constraints: StreamConstraints,
}

/// Evaluates the fallback cascade against a host.
///
/// The order is fixed and non-skippable: ideal resolution with facing, facing
/// only, then unconstrained. Exhaustion surfaces the last underlying error;
/// no partial state is retained.
#[derive(Debug, Clone)]
pub struct ConstraintNegotiator {
    attempts: Vec<Attempt>,
}

impl ConstraintNegotiator {
    /// Builds the cascade for a facing and resolution policy.
    pub fn for_facing(facing: Facing, resolution: ResolutionHint) -> Self {
        Self {
            attempts: vec![
                Attempt {
                    strategy: "ideal",
                    constraints: StreamConstraints::ideal(facing, resolution),
                },
                Attempt {
                    strategy: "facing-only",
                    constraints: StreamConstraints::facing_only(facing),
                },
                Attempt {
                    strategy: "unconstrained",
                    constraints: StreamConstraints::unconstrained(),
                },
            ],
        }
    }

    /// Runs the cascade until the first success or exhaustion.
    pub async fn negotiate<H: MediaHost + ?Sized>(
        &self,
        host: &H,
    ) -> Result<StreamHandle, StreamError> {
        let mut last_error = None;
        for attempt in &self.attempts {
            debug!(strategy = attempt.strategy, "attempting stream acquisition");
            match host.acquire_stream(&attempt.constraints).await {
                Ok(stream) => {
                    info!(strategy = attempt.strategy, "stream acquired");
                    return Ok(stream);
                }
                Err(e) => {
                    warn!(strategy = attempt.strategy, error = %e, "acquisition attempt failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| StreamError::Other("no acquisition strategies configured".into())))
    }
}
