pub mod assembler;
pub mod bytes;
pub mod decoder;
pub mod ranging;
pub mod wire;

pub use decoder::FrameError;

/// Receive antennas on the sensor.
pub const NUM_ANTENNAS: usize = 3;

/// Raw sample slots per antenna in the sensor's acquisition window.
pub const TAPS_PER_ANTENNA: usize = 128;

/// int16 words per antenna block (interleaved real/imag).
pub const WORDS_PER_ANTENNA: usize = 2 * TAPS_PER_ANTENNA;

/// Bytes per antenna block before header trimming.
pub const BYTES_PER_ANTENNA: usize = WORDS_PER_ANTENNA * 2;

/// Total bytes of one assembled CIR frame. The acquisition path derives
/// this as taps * 4 * antennas; the bridge path checks the same 1536.
pub const BYTES_PER_FRAME: usize = NUM_ANTENNAS * BYTES_PER_ANTENNA;

/// Guard/header words dropped from the front of each antenna block.
pub const HEADER_WORDS: usize = 16;

/// Complex range bins per antenna after trimming and pairing.
pub const RANGE_BINS: usize = (WORDS_PER_ANTENNA - HEADER_WORDS) / 2;
