use num_complex::Complex32;

use crate::decoder::FrameError;
use crate::{bytes, BYTES_PER_ANTENNA, BYTES_PER_FRAME, NUM_ANTENNAS};

/// Frame sentinels exchanged on every serial path.
pub const BEGIN_LINE: &[u8] = b"BEGIN\n";
pub const END_LINE: &[u8] = b"END\n";

/// Device command lines.
pub const CMD_START: &[u8] = b"START";
pub const CMD_STOP: &[u8] = b"STOP";
pub const CMD_INFO: &str = "INFO";

/// Acknowledgement sent in response to `INFO`.
pub const ACK_SAMPLE_RATE: &[u8] = b"SR250\n";

/// Offset of the forwarded window inside each antenna block.
pub const RELAY_WINDOW_OFFSET: usize = 32;
/// Bytes forwarded per antenna on the relay path.
pub const RELAY_WINDOW_LEN: usize = 80;
/// Relay payload: three windows, antenna order 0,1,2.
pub const RELAY_PAYLOAD_LEN: usize = NUM_ANTENNAS * RELAY_WINDOW_LEN;

/// Complex samples forwarded per antenna on the replay path.
pub const REPLAY_SAMPLES_PER_ANTENNA: usize = 20;
/// Replay payload: 3 antennas x 20 samples x 4 wire bytes.
pub const REPLAY_PAYLOAD_LEN: usize = NUM_ANTENNAS * REPLAY_SAMPLES_PER_ANTENNA * 4;

/// Extract the reduced per-antenna byte windows the model consumes from a
/// full assembled frame. The relay forwards raw bytes, not decoded samples:
/// one 80-byte window at offset 32 into each 512-byte antenna block,
/// concatenated in antenna order.
pub fn relay_payload(frame: &[u8]) -> Result<Vec<u8>, FrameError> {
    if frame.len() != BYTES_PER_FRAME {
        return Err(FrameError::MalformedFrame {
            expected: BYTES_PER_FRAME,
            actual: frame.len(),
        });
    }
    let mut payload = Vec::with_capacity(RELAY_PAYLOAD_LEN + 1);
    for ant in 0..NUM_ANTENNAS {
        let start = ant * BYTES_PER_ANTENNA + RELAY_WINDOW_OFFSET;
        payload.extend_from_slice(&frame[start..start + RELAY_WINDOW_LEN]);
    }
    Ok(payload)
}

/// Serialize one replay time-step: the first 20 complex samples of each
/// antenna row, big-endian int16 pairs. A row shorter than the sample
/// budget (a ragged capture) contributes zero samples for the remainder,
/// so the payload is always exactly [`REPLAY_PAYLOAD_LEN`] bytes.
pub fn replay_payload(rows: [&[Complex32]; NUM_ANTENNAS]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(REPLAY_PAYLOAD_LEN);
    for row in rows {
        for i in 0..REPLAY_SAMPLES_PER_ANTENNA {
            let c = row.get(i).copied().unwrap_or(Complex32::new(0.0, 0.0));
            payload.extend_from_slice(&bytes::complex_to_wire(c));
        }
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_window_extraction() {
        let frame: Vec<u8> = (0..BYTES_PER_FRAME).map(|i| (i / 7) as u8).collect();
        let payload = relay_payload(&frame).unwrap();
        assert_eq!(payload.len(), 240);
        assert_eq!(&payload[..80], &frame[32..112]);
        assert_eq!(&payload[80..160], &frame[544..624]);
        assert_eq!(&payload[160..], &frame[1056..1136]);
    }

    #[test]
    fn test_relay_rejects_short_frame() {
        assert!(relay_payload(&vec![0u8; 100]).is_err());
        assert!(relay_payload(&vec![0u8; BYTES_PER_FRAME + 1]).is_err());
    }

    #[test]
    fn test_replay_payload_size() {
        let row: Vec<Complex32> = (0..120)
            .map(|i| Complex32::new(i as f32, -(i as f32)))
            .collect();
        let payload = replay_payload([&row, &row, &row]);
        assert_eq!(payload.len(), 240);
        // first sample of antenna 1 starts at byte 80
        assert_eq!(&payload[80..84], &bytes::complex_to_wire(row[0]));
    }

    #[test]
    fn test_replay_ragged_rows_pad_with_zeros() {
        let full: Vec<Complex32> = vec![Complex32::new(1.0, 1.0); 20];
        let short: Vec<Complex32> = vec![Complex32::new(1.0, 1.0); 5];
        let payload = replay_payload([&full, &short, &[]]);
        assert_eq!(payload.len(), 240);
        // antenna 1: samples 5..20 are zero
        assert!(payload[80..100].iter().any(|&b| b != 0));
        assert!(payload[100..160].iter().all(|&b| b == 0));
        // antenna 2: all zero
        assert!(payload[160..].iter().all(|&b| b == 0));
    }
}
