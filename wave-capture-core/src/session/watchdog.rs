use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::models::error::CaptureError;

/// Timer thread that runs a callback once a deadline passes.
///
/// The thread waits on a disarm channel with a timeout equal to the time
/// still remaining and re-checks the clock after every wakeup, so an early
/// return from the timed wait never fires the callback ahead of the deadline.
/// Disarming (or dropping) the watchdog closes the channel and joins the
/// thread; the callback does not run after that.
pub struct Watchdog {
    disarm_tx: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Watchdog {
    pub fn arm<F>(limit: Duration, on_expire: F) -> Result<Self, CaptureError>
    where
        F: FnOnce() + Send + 'static,
    {
        let (disarm_tx, disarm_rx) = bounded::<()>(1);
        let deadline = Instant::now() + limit;

        let handle = thread::Builder::new()
            .name("capture-watchdog".into())
            .spawn(move || loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    on_expire();
                    return;
                }
                match disarm_rx.recv_timeout(remaining) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                }
            })
            .map_err(|e| CaptureError::CaptureFailed(format!("failed to spawn watchdog thread: {}", e)))?;

        log::debug!("Watchdog armed for {:.3}s", limit.as_secs_f64());
        Ok(Self {
            disarm_tx: Some(disarm_tx),
            handle: Some(handle),
        })
    }

    /// Cancel the timer and wait for its thread to exit.
    pub fn disarm(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.disarm_tx.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.shutdown();
    }
}
