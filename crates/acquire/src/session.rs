use std::sync::{Arc, Mutex};

use thiserror::Error;

/// A session is already holding the serial endpoint.
#[derive(Error, Debug)]
#[error("a session is already active")]
pub struct SessionBusy;

/// Hands out exclusive session tokens so two concurrent sessions can never
/// share a serial endpoint. Starting while busy is rejected with
/// [`SessionBusy`], not silently ignored.
#[derive(Clone, Default)]
pub struct SessionManager {
    busy: Arc<Mutex<bool>>,
}

/// Proof of session ownership. Dropping the token releases the session on
/// every exit path, success or failure.
pub struct SessionToken {
    busy: Arc<Mutex<bool>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check-and-set the busy flag.
    pub fn begin(&self) -> Result<SessionToken, SessionBusy> {
        let mut busy = self.busy.lock().unwrap();
        if *busy {
            return Err(SessionBusy);
        }
        *busy = true;
        Ok(SessionToken {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.lock().unwrap()
    }
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        *self.busy.lock().unwrap() = false;
    }
}
