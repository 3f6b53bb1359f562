use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use ndarray::Array2;
use num_complex::Complex32;

use cir_acquire::SessionManager;
use cir_protocol::wire::{self, BEGIN_LINE, END_LINE};
use cir_protocol::NUM_ANTENNAS;
use cir_serial::{PortLink, SerialLink, MODEL_BAUD};
use cir_storage::{discover_groups, LogGroup};

/// Poll interval of the command loop.
const COMMAND_POLL: Duration = Duration::from_millis(50);
const READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Stored-log replay: answer the model's command handshake and, on START,
/// publish every complete capture group at the requested frequency.
pub fn run(
    folder: &Path,
    frequency: f64,
    model_port: &str,
    running: &Arc<AtomicBool>,
) -> Result<(), String> {
    if frequency <= 0.0 {
        return Err(format!("invalid playback frequency: {}", frequency));
    }

    let groups = discover_groups(folder).map_err(|e| e.to_string())?;
    if groups.is_empty() {
        log::warn!("no complete captures found in {}", folder.display());
    } else {
        log::info!(
            "{} complete captures found in {}",
            groups.len(),
            folder.display()
        );
    }

    let model = PortLink::open(model_port, MODEL_BAUD, READ_TIMEOUT)?;
    let model = Arc::new(Mutex::new(model));
    let sessions = SessionManager::new();
    let mut publisher: Option<thread::JoinHandle<()>> = None;

    log::info!("bridge started, press CTRL+C to exit");

    while running.load(Ordering::Relaxed) {
        let line = {
            let mut port = model.lock().unwrap();
            if port
                .bytes_pending()
                .map_err(|e| format!("model poll: {}", e))?
                == 0
            {
                drop(port);
                thread::sleep(COMMAND_POLL);
                continue;
            }
            port.read_line().map_err(|e| format!("model read: {}", e))?
        };

        let msg = String::from_utf8_lossy(&line);
        let msg = msg.trim();
        if msg.is_empty() {
            continue;
        }
        log::info!("[model]: {}", msg);

        match msg {
            wire::CMD_INFO => {
                model
                    .lock()
                    .unwrap()
                    .write_all(wire::ACK_SAMPLE_RATE)
                    .map_err(|e| format!("model write: {}", e))?;
            }
            "START" => {
                let token = match sessions.begin() {
                    Ok(t) => t,
                    Err(e) => {
                        log::warn!("{}, START ignored", e);
                        continue;
                    }
                };
                model
                    .lock()
                    .unwrap()
                    .write_all(b"START\n")
                    .map_err(|e| format!("model write: {}", e))?;

                let groups = groups.clone();
                let model = Arc::clone(&model);
                let running = Arc::clone(running);
                publisher = Some(thread::spawn(move || {
                    // token released when publishing ends, success or failure
                    let _token = token;
                    if let Err(e) = publish_groups(&groups, frequency, &model, &running) {
                        log::error!("publisher: {}", e);
                    }
                }));
            }
            other => log::debug!("unhandled model message: {}", other),
        }
    }

    if let Some(handle) = publisher {
        let _ = handle.join();
    }
    log::info!("serial connection closed");
    Ok(())
}

/// Publish every group in sorted order, run-to-completion, one sentinel-
/// wrapped 240-byte payload per time-step at `frequency` Hz.
fn publish_groups(
    groups: &[LogGroup],
    frequency: f64,
    model: &Arc<Mutex<PortLink>>,
    running: &AtomicBool,
) -> Result<(), String> {
    let delay = Duration::from_secs_f64(1.0 / frequency);

    for group in groups {
        let arrays = group.load().map_err(|e| e.to_string())?;
        let steps = arrays.iter().map(Array2::nrows).max().unwrap_or(0);
        log::info!("capture {} started publishing ({} steps)", group.base, steps);

        for t in 0..steps {
            if !running.load(Ordering::Relaxed) {
                log::info!("capture {} interrupted at step {}", group.base, t);
                return Ok(());
            }

            let rows = step_rows(&arrays, t);
            let payload = wire::replay_payload(rows);

            {
                let mut port = model.lock().unwrap();
                port.write_all(BEGIN_LINE)
                    .map_err(|e| format!("model write: {}", e))?;
                port.write_all(&payload)
                    .map_err(|e| format!("model write: {}", e))?;
                port.write_all(END_LINE)
                    .map_err(|e| format!("model write: {}", e))?;
            }

            thread::sleep(delay);
        }

        log::info!("capture {} finished publishing", group.base);
    }
    Ok(())
}

/// Row views for one time-step. An antenna whose array has run out (a
/// ragged capture) contributes an empty row, which the payload encoder
/// pads with zero samples.
fn step_rows(arrays: &[Array2<Complex32>; NUM_ANTENNAS], t: usize) -> [&[Complex32]; NUM_ANTENNAS] {
    [0, 1, 2].map(|i| {
        if t < arrays[i].nrows() {
            arrays[i].row(t).to_slice().unwrap_or(&[])
        } else {
            &[]
        }
    })
}
