//! # Audio Buffer Management
//!
//! Per-connection accumulation buffer for the streaming relay. Inbound PCM
//! frames append here until the byte length crosses a fixed threshold, at
//! which point the whole run is taken for one transcription call and the
//! buffer starts over empty.
//!
//! Each WebSocket connection owns exactly one buffer, so no locking is
//! needed; the buffer lives and dies with the connection.

/// Append-only byte buffer with a fixed flush threshold.
///
/// The threshold is expressed in bytes of raw PCM. At the app's fixed format
/// (16 kHz, 16-bit, mono) the default of 64,000 bytes is roughly two seconds
/// of audio per flush.
#[derive(Debug)]
pub struct AudioBuffer {
    data: Vec<u8>,
    flush_threshold: usize,
}

impl AudioBuffer {
    /// Create an empty buffer that flushes once `flush_threshold` bytes are exceeded.
    pub fn new(flush_threshold: usize) -> Self {
        Self {
            data: Vec::with_capacity(flush_threshold),
            flush_threshold,
        }
    }

    /// Append one inbound frame's bytes.
    pub fn append(&mut self, frame: &[u8]) {
        self.data.extend_from_slice(frame);
    }

    /// Whether the buffer has crossed the flush threshold.
    ///
    /// Strictly greater-than: a buffer sitting exactly at the threshold does
    /// not flush yet.
    pub fn should_flush(&self) -> bool {
        self.data.len() > self.flush_threshold
    }

    /// Take the buffered bytes for a flush, leaving the buffer empty.
    ///
    /// The reset happens here, at dispatch time, so the outcome of the
    /// transcription call cannot affect it.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.data, Vec::with_capacity(self.flush_threshold))
    }

    /// Current buffered byte length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: usize = 64_000;

    #[test]
    fn test_below_threshold_never_flushes() {
        let mut buffer = AudioBuffer::new(THRESHOLD);

        // Many small frames that together stay at or below the threshold.
        for _ in 0..20 {
            buffer.append(&[0u8; 3200]);
        }
        assert_eq!(buffer.len(), THRESHOLD);
        assert!(!buffer.should_flush(), "exactly at threshold must not flush");
    }

    #[test]
    fn test_crossing_threshold_once_flushes_once_and_resets() {
        let mut buffer = AudioBuffer::new(THRESHOLD);
        let mut flushes = 0;

        for _ in 0..21 {
            buffer.append(&[1u8; 3200]);
            if buffer.should_flush() {
                let taken = buffer.take();
                assert_eq!(taken.len(), 21 * 3200);
                flushes += 1;
            }
        }

        assert_eq!(flushes, 1);
        assert!(buffer.is_empty(), "buffer must be empty after a flush");
        assert!(!buffer.should_flush());
    }

    #[test]
    fn test_take_preserves_byte_order() {
        let mut buffer = AudioBuffer::new(4);
        buffer.append(&[1, 2, 3]);
        buffer.append(&[4, 5]);
        assert!(buffer.should_flush());
        assert_eq!(buffer.take(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_buffer_refills_after_flush() {
        let mut buffer = AudioBuffer::new(10);
        buffer.append(&[0u8; 11]);
        let _ = buffer.take();

        buffer.append(&[0u8; 6]);
        assert_eq!(buffer.len(), 6);
        assert!(!buffer.should_flush());
        buffer.append(&[0u8; 5]);
        assert!(buffer.should_flush());
    }
}
