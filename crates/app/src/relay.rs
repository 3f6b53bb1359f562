use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use cir_protocol::assembler::FrameAssembler;
use cir_protocol::wire::{self, BEGIN_LINE, END_LINE};
use cir_serial::{PortLink, SerialLink, MODEL_BAUD, RADAR_BAUD};

/// Yield between poll cycles.
const POLL_INTERVAL: Duration = Duration::from_micros(500);
/// Settle time for the downstream device's receive buffer.
const WRITE_DELAY: Duration = Duration::from_millis(10);
/// Read timeout on both ports; bytes_pending gates every read so this only
/// bounds a line that stalls mid-transfer.
const READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Live relay: pump bytes between the radar and the model device until the
/// running flag clears. Both ports are closed on every exit path.
pub fn run(radar_port: &str, model_port: &str, running: &AtomicBool) -> Result<(), String> {
    let mut radar = PortLink::open(radar_port, RADAR_BAUD, READ_TIMEOUT)?;
    let mut model = PortLink::open(model_port, MODEL_BAUD, READ_TIMEOUT)?;
    log::info!("bridge started: radar={} model={}", radar_port, model_port);

    let result = pump(&mut radar, &mut model, running);
    log::info!("serial connections closed");
    result
}

enum ForwardError {
    BadLength(usize),
    Io(std::io::Error),
}

/// The poll cycle. Radar lines are mirrored verbatim to the model and fed
/// through the frame assembler; assembled frames are forwarded reduced.
/// Model bytes are mirrored verbatim back to the radar.
fn pump<R: SerialLink, M: SerialLink>(
    radar: &mut R,
    model: &mut M,
    running: &AtomicBool,
) -> Result<(), String> {
    let mut asm = FrameAssembler::new();
    let mut forwarded: u64 = 0;
    let mut discarded: u64 = 0;

    while running.load(Ordering::Relaxed) {
        if radar.bytes_pending().map_err(|e| format!("radar poll: {}", e))? > 0 {
            let line = radar
                .read_line()
                .map_err(|e| format!("radar read: {}", e))?;
            model
                .write_all(&line)
                .map_err(|e| format!("model write: {}", e))?;

            if let Some(frame) = asm.push_line(&line) {
                match forward_frame(model, &frame) {
                    Ok(()) => forwarded += 1,
                    Err(ForwardError::BadLength(len)) => {
                        discarded += 1;
                        log::warn!("frame of {} bytes discarded", len);
                    }
                    Err(ForwardError::Io(e)) => return Err(format!("model write: {}", e)),
                }
            }
        }

        if model.bytes_pending().map_err(|e| format!("model poll: {}", e))? > 0 {
            let data = model
                .read_available()
                .map_err(|e| format!("model read: {}", e))?;
            radar
                .write_all(&data)
                .map_err(|e| format!("radar write: {}", e))?;
        }

        thread::sleep(POLL_INTERVAL);
    }

    log::info!(
        "bridge stopped: {} frames forwarded, {} discarded",
        forwarded,
        discarded
    );
    Ok(())
}

/// Forward the reduced windows of one assembled frame, sentinel-wrapped,
/// pausing after each write for the model's buffering.
fn forward_frame<M: SerialLink>(model: &mut M, frame: &[u8]) -> Result<(), ForwardError> {
    let mut payload = match wire::relay_payload(frame) {
        Ok(p) => p,
        Err(_) => return Err(ForwardError::BadLength(frame.len())),
    };
    payload.push(b'\n');

    model.write_all(BEGIN_LINE).map_err(ForwardError::Io)?;
    thread::sleep(WRITE_DELAY);
    model.write_all(&payload).map_err(ForwardError::Io)?;
    thread::sleep(WRITE_DELAY);
    model.write_all(END_LINE).map_err(ForwardError::Io)?;
    thread::sleep(WRITE_DELAY);
    Ok(())
}
