//! Evidence Capture Library
//!
//! Camera session management and adaptive image compression for field-audit
//! evidence photos. The library owns the risky part of the capture flow:
//! negotiating a hardware stream under uncertain device capability and
//! bounding artifact size. It hands its outputs (a compressed artifact, a
//! quality grade, an error classification) to storage and presentation
//! collaborators it does not implement.
//!
//! # Architecture
//!
//! The flow is linear, gated by the capability probe:
//!
//! ```text
//! probe → negotiate → session (zoom / facing / dispose)
//!                        ↓
//!                     capture → quality analysis
//!                        ↓
//!                     compression → delivery artifact
//! ```
//!
//! # Design Principles
//!
//! - **Single-owner stream**: the session controller exclusively owns the
//!   hardware stream; every exit path, including drop, releases its tracks
//! - **Ordered fallback**: acquisition strategies form an explicit cascade,
//!   not nested error handling
//! - **Fail-open compression**: a compression failure returns the original
//!   bytes rather than blocking delivery
//! - **Bounded work**: compression performs at most two encoding passes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use evidence_capture::{
//!     analysis::evaluate_quality,
//!     capture::CaptureEngine,
//!     compress::Compressor,
//!     config::SessionConfig,
//!     host::{MockHost, MockSurface},
//!     session::SessionController,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let host = Arc::new(MockHost::with_cameras(2));
//! let session = SessionController::new(host, SessionConfig::default());
//! session.start().await?;
//!
//! let surface = MockSurface::gradient(1280, 720);
//! let frame = CaptureEngine::default().capture(&session, &surface)?;
//! let score = evaluate_quality(&frame)?;
//! let artifact = Compressor::default().compress(frame.delivery_bytes());
//! println!("{} ({} bytes)", score.grade, artifact.final_size);
//!
//! session.dispose();
//! # Ok(()) }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod capture;
pub mod compress;
pub mod config;
pub mod host;
pub mod probe;
pub mod session;

// Re-export commonly used types at crate root
pub use analysis::{evaluate_quality, QualityGrade, QualityScore};
pub use capture::{CaptureEngine, CaptureError, CapturedFrame};
pub use compress::{CompressionResult, Compressor};
pub use config::FileConfig;
pub use probe::{DeviceDescriptor, Facing};
pub use session::{ErrorClassification, SessionController, SessionError, SessionStatus};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
