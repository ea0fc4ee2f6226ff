//! Delivery compression.
//!
//! Turns a captured or imported image into a bounded-size delivery artifact.
//! See [`Compressor`] for the tier table and the two-pass bound.

mod pipeline;

pub use pipeline::{CompressionConfig, CompressionResult, Compressor};
