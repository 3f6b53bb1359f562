use num_complex::Complex32;
use thiserror::Error;

use crate::{bytes, BYTES_PER_FRAME, HEADER_WORDS, NUM_ANTENNAS, RANGE_BINS, WORDS_PER_ANTENNA};

/// Errors raised while decoding an assembled frame.
#[derive(Error, Debug)]
pub enum FrameError {
    /// The assembled frame does not match the configured geometry. The frame
    /// is discarded whole; nothing is partially decoded.
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },
}

/// One decoded CIR time-step: a complex range profile per antenna,
/// in antenna order 0,1,2.
#[derive(Debug, Clone)]
pub struct CirFrame {
    pub antennas: [Vec<Complex32>; NUM_ANTENNAS],
}

/// Decode an assembled raw frame into per-antenna complex channels.
///
/// The buffer is reinterpreted as little-endian int16 (the sensor's byte
/// order), partitioned into contiguous antenna blocks, and the first
/// [`HEADER_WORDS`] guard words of each block are dropped before pairing the
/// rest as (real, imag).
pub fn decode(raw: &[u8]) -> Result<CirFrame, FrameError> {
    if raw.len() != BYTES_PER_FRAME {
        return Err(FrameError::MalformedFrame {
            expected: BYTES_PER_FRAME,
            actual: raw.len(),
        });
    }

    let words = bytes::le_words(raw);
    let mut antennas: [Vec<Complex32>; NUM_ANTENNAS] = Default::default();
    for (slot, block) in words.chunks_exact(WORDS_PER_ANTENNA).enumerate() {
        let channel = bytes::words_to_complex(&block[HEADER_WORDS..]);
        debug_assert_eq!(channel.len(), RANGE_BINS);
        antennas[slot] = channel;
    }

    Ok(CirFrame { antennas })
}
