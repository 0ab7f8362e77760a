//! Listener loop owning a scan handler
//!
//! [`ScanListener::attach`] moves a handler and a keystroke source onto a
//! background thread that feeds every key into the handler, in arrival
//! order, and drives the handler's deadline. Scan delivery is whatever the
//! caller baked into the handler's scan callback, typically a channel
//! sender. Detaching (or dropping) stops and joins the thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use wedge_core::ScanHandler;

use crate::source::KeySource;

/// Poll granularity while no handler deadline is pending.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Handle to a running listener thread.
pub struct ScanListener {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ScanListener {
    /// Spawn the listener thread and start dispatching keystrokes from
    /// `source` into `handler`.
    ///
    /// All handler calls happen on the spawned thread, strictly serialized:
    /// one `handle_key` per keystroke, a `tick` after every poll. The poll
    /// timeout is bounded by the handler's next deadline so timeout-based
    /// scans are reported promptly even when the keyboard goes quiet.
    pub fn attach(mut source: impl KeySource + 'static, mut handler: Box<dyn ScanHandler>) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();

        let thread = thread::spawn(move || {
            tracing::debug!("scan listener attached");
            while !flag.load(Ordering::Relaxed) {
                let timeout = match handler.next_deadline() {
                    Some(deadline) => deadline
                        .saturating_duration_since(Instant::now())
                        .min(IDLE_POLL),
                    None => IDLE_POLL,
                };

                match source.next_key(timeout) {
                    Ok(Some(mut event)) => handler.handle_key(&mut event, Instant::now()),
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(%err, "keystroke source failed, detaching");
                        break;
                    }
                }

                handler.tick(Instant::now());
            }
            tracing::debug!("scan listener detached");
        });

        Self {
            shutdown,
            thread: Some(thread),
        }
    }

    /// Stop dispatching and join the listener thread.
    pub fn detach(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ScanListener {
    fn drop(&mut self) {
        self.stop();
    }
}
