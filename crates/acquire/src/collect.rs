use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::Sender;
use ndarray::{Array1, Array3};
use num_complex::Complex32;

use cir_protocol::assembler::FrameAssembler;
use cir_protocol::{decoder, ranging, wire, NUM_ANTENNAS, RANGE_BINS};
use cir_serial::SerialLink;

/// Live notifications emitted while collecting.
#[derive(Debug, Clone, Copy)]
pub enum AcqEvent {
    /// A CIR frame was decoded into the given time-step row.
    Frame(usize),
    /// A calibrated ranging distance arrived.
    Ranging(u16),
}

/// Acquisition session parameters.
pub struct AcqConfig {
    /// Number of windows requested.
    pub samples_number: usize,
    /// Window duration in seconds.
    pub window_duration: usize,
    /// Radar frame rate in Hz.
    pub fps: usize,
    /// Also scan idle lines for ranging diagnostics.
    pub ranging: bool,
}

impl AcqConfig {
    /// Total time-step rows collected per session. One extra second of
    /// frames is added so decluttering has warm-up data.
    pub fn total_samples_required(&self) -> usize {
        self.samples_number * self.fps * self.window_duration + self.fps
    }
}

/// A filled acquisition session.
pub struct SampleMatrix {
    /// `[time_step][antenna][range_bin]`, pre-sized at session start.
    pub frames: Array3<Complex32>,
    /// Calibrated ranging distance per time-step, parallel to `frames`.
    pub twr: Array1<u16>,
    /// Rows actually filled. Equals the required total on normal
    /// completion; less when the session was cancelled.
    pub collected: usize,
    /// Malformed frames dropped along the way.
    pub discarded: u64,
}

/// Drive bounded collection from `link` into a fresh [`SampleMatrix`].
///
/// Sends `START`, then reads lines through the frame assembler, decoding
/// each completed frame into the next unfilled row. Malformed frames are
/// logged and dropped; the loop never aborts over a single bad frame.
/// Returns when the required row count is reached (then sends `STOP`) or
/// when `stop` is observed between reads, within one poll interval.
pub fn collect<L: SerialLink>(
    link: &mut L,
    cfg: &AcqConfig,
    stop: &AtomicBool,
    events: &Sender<AcqEvent>,
) -> Result<SampleMatrix, String> {
    let total = cfg.total_samples_required();
    let mut frames = Array3::zeros((total, NUM_ANTENNAS, RANGE_BINS));
    let mut twr = Array1::zeros(total);
    let mut collected = 0usize;
    let mut discarded = 0u64;
    let mut asm = FrameAssembler::new();

    link.write_all(wire::CMD_START)
        .map_err(|e| format!("failed to send START: {}", e))?;
    log::info!("acquisition started, {} samples required", total);

    while !stop.load(Ordering::Relaxed) && collected < total {
        let line = link
            .read_line()
            .map_err(|e| format!("serial read error: {}", e))?;
        if line.is_empty() {
            // read timeout, nothing arrived this poll
            continue;
        }

        match asm.push_line(&line) {
            Some(frame) => match decoder::decode(&frame) {
                Ok(cir) => {
                    for (ant, channel) in cir.antennas.iter().enumerate() {
                        for (bin, &c) in channel.iter().enumerate() {
                            frames[(collected, ant, bin)] = c;
                        }
                    }
                    let _ = events.try_send(AcqEvent::Frame(collected));
                    collected += 1;
                }
                Err(e) => {
                    discarded += 1;
                    log::warn!("{}, frame discarded", e);
                }
            },
            None => {
                if cfg.ranging && !asm.is_accumulating() {
                    let text = String::from_utf8_lossy(&line);
                    if let Some(distance) = ranging::parse_distance(&text) {
                        twr[collected] = distance;
                        let _ = events.try_send(AcqEvent::Ranging(distance));
                    }
                }
            }
        }
    }

    // best-effort on the cancellation path; the device may already be gone
    if let Err(e) = link.write_all(wire::CMD_STOP) {
        log::warn!("failed to send STOP: {}", e);
    }

    if collected == total {
        log::info!("acquisition finished: {} rows, {} discarded", collected, discarded);
    } else {
        log::info!("acquisition cancelled after {} rows", collected);
    }

    Ok(SampleMatrix {
        frames,
        twr,
        collected,
        discarded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel;
    use std::collections::VecDeque;
    use std::io;

    use cir_protocol::BYTES_PER_FRAME;

    /// Scripted endpoint: hands out queued lines, records writes.
    struct ScriptLink {
        lines: VecDeque<Vec<u8>>,
        written: Vec<Vec<u8>>,
    }

    impl ScriptLink {
        fn new(lines: Vec<Vec<u8>>) -> Self {
            Self {
                lines: lines.into(),
                written: Vec::new(),
            }
        }
    }

    impl SerialLink for ScriptLink {
        fn bytes_pending(&mut self) -> io::Result<usize> {
            Ok(self.lines.front().map_or(0, |l| l.len()))
        }

        fn read_line(&mut self) -> io::Result<Vec<u8>> {
            Ok(self.lines.pop_front().unwrap_or_default())
        }

        fn read_available(&mut self) -> io::Result<Vec<u8>> {
            Ok(self.lines.pop_front().unwrap_or_default())
        }

        fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            self.written.push(data.to_vec());
            Ok(())
        }
    }

    fn frame_lines(payload: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = vec![b"BEGIN\n".to_vec()];
        let mut wire_bytes = payload.to_vec();
        wire_bytes.push(b'\n'); // terminator trimmed by the assembler
        for chunk in wire_bytes.chunks(256) {
            lines.push(chunk.to_vec());
        }
        lines.push(b"END\n".to_vec());
        lines
    }

    fn one_sample_config(ranging: bool) -> AcqConfig {
        // total = 0*fps*window + fps = 1
        AcqConfig {
            samples_number: 0,
            window_duration: 1,
            fps: 1,
            ranging,
        }
    }

    #[test]
    fn test_collects_required_rows_and_stops() {
        let payload: Vec<u8> = (0..BYTES_PER_FRAME).map(|i| (i % 250) as u8).collect();
        let mut link = ScriptLink::new(frame_lines(&payload));
        let (tx, rx) = channel::unbounded();
        let stop = AtomicBool::new(false);

        let result = collect(&mut link, &one_sample_config(false), &stop, &tx).unwrap();
        assert_eq!(result.collected, 1);
        assert_eq!(result.discarded, 0);
        assert_eq!(link.written.first().map(Vec::as_slice), Some(&b"START"[..]));
        assert_eq!(link.written.last().map(Vec::as_slice), Some(&b"STOP"[..]));
        assert!(matches!(rx.try_recv(), Ok(AcqEvent::Frame(0))));

        // spot-check the decoded row against the raw words
        let words = cir_protocol::bytes::le_words(&payload);
        let expected = Complex32::new(words[16] as f32, words[17] as f32);
        assert_eq!(result.frames[(0, 0, 0)], expected);
    }

    #[test]
    fn test_malformed_frame_discarded_loop_continues() {
        let good: Vec<u8> = vec![7u8; BYTES_PER_FRAME];
        let mut lines = frame_lines(&[1, 2, 3]); // far too short
        lines.extend(frame_lines(&good));
        let mut link = ScriptLink::new(lines);
        let (tx, _rx) = channel::unbounded();
        let stop = AtomicBool::new(false);

        let result = collect(&mut link, &one_sample_config(false), &stop, &tx).unwrap();
        assert_eq!(result.discarded, 1);
        assert_eq!(result.collected, 1);
    }

    #[test]
    fn test_ranging_line_between_frames() {
        let payload: Vec<u8> = vec![0u8; BYTES_PER_FRAME];
        let mut lines = vec![b"TWR[0].distance: 5000\n".to_vec()];
        lines.extend(frame_lines(&payload));
        let mut link = ScriptLink::new(lines);
        let (tx, rx) = channel::unbounded();
        let stop = AtomicBool::new(false);

        let result = collect(&mut link, &one_sample_config(true), &stop, &tx).unwrap();
        assert_eq!(result.twr[0], 370);
        assert!(matches!(rx.try_recv(), Ok(AcqEvent::Ranging(370))));
    }

    #[test]
    fn test_cancellation_observed_before_first_read() {
        let mut link = ScriptLink::new(frame_lines(&vec![0u8; BYTES_PER_FRAME]));
        let (tx, _rx) = channel::unbounded();
        let stop = AtomicBool::new(true);

        let result = collect(&mut link, &one_sample_config(false), &stop, &tx).unwrap();
        assert_eq!(result.collected, 0);
        // START then best-effort STOP, no reads in between
        assert_eq!(link.written.len(), 2);
    }

    #[test]
    fn test_total_samples_formula() {
        let cfg = AcqConfig {
            samples_number: 10,
            window_duration: 2,
            fps: 15,
            ranging: false,
        };
        assert_eq!(cfg.total_samples_required(), 10 * 15 * 2 + 15);
    }
}
