pub mod port;

pub use port::{probe, PortLink};

use std::io;

/// Radar-side line rate.
pub const RADAR_BAUD: u32 = 1_500_000;
/// Model/microcontroller-side line rate.
pub const MODEL_BAUD: u32 = 115_200;

/// Common trait for polled serial endpoints.
///
/// All driving loops poll with short sleeps rather than blocking on
/// callbacks, so the primitives here mirror that: a cheap pending-byte
/// check, a line read bounded by the port timeout, and a drain of whatever
/// is immediately available.
pub trait SerialLink: Send {
    /// Bytes readable without blocking (internal buffer plus driver queue).
    fn bytes_pending(&mut self) -> io::Result<usize>;

    /// Read one line up to and including `\n`. On timeout the partial line
    /// read so far is returned, possibly empty.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Drain all immediately available bytes.
    fn read_available(&mut self) -> io::Result<Vec<u8>>;

    /// Write the whole buffer and flush.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
}
