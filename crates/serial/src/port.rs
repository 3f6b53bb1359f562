use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::{SerialLink, MODEL_BAUD};

/// Serial endpoint backed by a system port.
///
/// The port handle is owned by the link and released when it is dropped,
/// which covers every exit path of a loop that owns one.
pub struct PortLink {
    port: Box<dyn SerialPort>,
    rdbuf: Vec<u8>,
}

impl PortLink {
    /// Open `path` at `baud` with the given read timeout. Failure to open
    /// is fatal to the session being started; nothing is retried.
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self, String> {
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(|e| format!("failed to open serial port {}: {}", path, e))?;
        Ok(Self {
            port,
            rdbuf: Vec::new(),
        })
    }

    /// Pull more bytes into the line buffer. Returns 0 on read timeout.
    fn fill(&mut self) -> io::Result<usize> {
        let pending = self.port.bytes_to_read().map_err(to_io)? as usize;
        let mut chunk = vec![0u8; pending.clamp(1, 4096)];
        match self.port.read(&mut chunk) {
            Ok(n) => {
                self.rdbuf.extend_from_slice(&chunk[..n]);
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

fn to_io(e: serialport::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

impl SerialLink for PortLink {
    fn bytes_pending(&mut self) -> io::Result<usize> {
        let queued = self.port.bytes_to_read().map_err(to_io)? as usize;
        Ok(self.rdbuf.len() + queued)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        loop {
            if let Some(pos) = self.rdbuf.iter().position(|&b| b == b'\n') {
                let rest = self.rdbuf.split_off(pos + 1);
                return Ok(std::mem::replace(&mut self.rdbuf, rest));
            }
            if self.fill()? == 0 {
                // timed out: hand back the partial line
                return Ok(std::mem::take(&mut self.rdbuf));
            }
        }
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let queued = self.port.bytes_to_read().map_err(to_io)? as usize;
        if queued > 0 {
            let mut chunk = vec![0u8; queued];
            self.port.read_exact(&mut chunk)?;
            self.rdbuf.extend_from_slice(&chunk);
        }
        Ok(std::mem::take(&mut self.rdbuf))
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }
}

/// Scan the system's serial ports for a device whose `INFO` response
/// contains `info` (e.g. "SR250" or "Ranging"). Returns the first matching
/// port name. Ports that cannot be opened or stay silent are skipped.
pub fn probe(info: &str, timeout: Duration) -> Option<String> {
    let ports = match serialport::available_ports() {
        Ok(p) => p,
        Err(e) => {
            log::warn!("could not enumerate serial ports: {}", e);
            return None;
        }
    };

    for p in ports {
        let mut link = match PortLink::open(&p.port_name, MODEL_BAUD, timeout) {
            Ok(l) => l,
            Err(e) => {
                log::debug!("{}", e);
                continue;
            }
        };
        if link.write_all(b"INFO\r\n").is_err() {
            continue;
        }
        let mut resp = [0u8; 100];
        let n = match link.port.read(&mut resp) {
            Ok(n) => n,
            Err(_) => continue,
        };
        let text = String::from_utf8_lossy(&resp[..n]);
        log::debug!("{} responded: {}", p.port_name, text.trim());
        if text.contains(info) {
            log::info!("found {} device on {}", info, p.port_name);
            return Some(p.port_name);
        }
    }
    None
}
