//! # AI Provider Integration
//!
//! Everything that talks to the external OpenAI-compatible provider:
//! - `client`: HTTP client for transcription and chat-completion calls
//! - `wav`: in-memory WAV wrapping so raw PCM becomes a self-describing payload

pub mod client;
pub mod wav;

pub use client::ProviderClient;
