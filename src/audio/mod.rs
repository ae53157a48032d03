//! # Audio Buffering
//!
//! Connection-scoped audio accumulation for the streaming relay.

pub mod buffer;

pub use buffer::AudioBuffer;
