//! Frame capture and encoding.
//!
//! The engine grabs one still frame from the capture surface, downscales it
//! to the delivery bound, and encodes it twice: once at preview quality for
//! the quality evaluator, once at delivery quality for the compression
//! pipeline.

mod engine;
mod frame;

pub use engine::{CaptureEngine, CaptureError};
pub use frame::{fit_dimensions, CapturedFrame, FALLBACK_NATIVE_SIZE};

pub(crate) use engine::encode_jpeg;
