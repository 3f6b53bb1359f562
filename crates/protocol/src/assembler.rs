use crate::wire::{BEGIN_LINE, END_LINE};

/// Reassembles sentinel-framed byte streams.
///
/// Lines between a `BEGIN\n` and an `END\n` marker are accumulated verbatim
/// into one frame buffer. The device appends a single terminator byte after
/// the payload; it is trimmed on `END` before the frame is handed out, so
/// callers validate the useful payload length only.
pub struct FrameAssembler {
    buf: Vec<u8>,
    accumulating: bool,
    frames: u64,
    anomalies: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            accumulating: false,
            frames: 0,
            anomalies: 0,
        }
    }

    /// Feed one line (read up to and including a newline, or any raw byte
    /// chunk). Returns `Some(frame)` when an `END` marker completes a frame;
    /// ownership of the buffer transfers to the caller and the assembler
    /// starts the next frame empty.
    ///
    /// Lines arriving while idle are ignored here; the caller is free to
    /// inspect them for out-of-band diagnostics such as ranging reports.
    pub fn push_line(&mut self, line: &[u8]) -> Option<Vec<u8>> {
        if !self.accumulating {
            if line == BEGIN_LINE {
                self.buf.clear();
                self.accumulating = true;
            }
            None
        } else if line == END_LINE {
            self.accumulating = false;
            // drop the terminator byte riding after the payload
            self.buf.pop();
            self.frames += 1;
            Some(std::mem::take(&mut self.buf))
        } else {
            if line == BEGIN_LINE {
                // the protocol does not define a nested BEGIN; count it and
                // keep accumulating rather than silently resetting
                self.anomalies += 1;
                log::warn!(
                    "BEGIN marker inside a frame after {} bytes",
                    self.buf.len()
                );
            }
            self.buf.extend_from_slice(line);
            None
        }
    }

    /// True while a frame is being accumulated (between BEGIN and END).
    pub fn is_accumulating(&self) -> bool {
        self.accumulating
    }

    /// Frames emitted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// BEGIN-inside-frame anomalies observed so far.
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
