//! # WAV Container Wrapping
//!
//! The transcription API expects a self-describing audio file (wav, mp3, …),
//! not raw PCM. This module wraps a buffered run of raw samples in a minimal
//! WAV container entirely in memory.

use crate::config::AudioConfig;
use anyhow::{Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Wrap raw little-endian 16-bit PCM bytes in a WAV container.
///
/// The header fields come straight from the audio configuration (mono,
/// 16-bit, 16000 Hz by default) so the payload is self-describing to the
/// downstream API.
pub fn wrap_pcm(pcm: &[u8], audio: &AudioConfig) -> Result<Vec<u8>> {
    if pcm.is_empty() {
        anyhow::bail!("no PCM data to wrap");
    }
    if pcm.len() % 2 != 0 {
        anyhow::bail!("PCM byte length must be even for 16-bit samples");
    }

    // Re-read the raw bytes as i16 samples for the wav writer.
    let mut cursor = Cursor::new(pcm);
    let mut samples = Vec::with_capacity(pcm.len() / 2);
    while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
        samples.push(sample);
    }

    let header = wav::Header::new(
        wav::WAV_FORMAT_PCM,
        audio.channels,
        audio.sample_rate,
        audio.bit_depth,
    );

    let mut out = Cursor::new(Vec::new());
    wav::write(header, &wav::BitDepth::Sixteen(samples), &mut out)
        .context("failed to write WAV container")?;

    Ok(out.into_inner())
}
