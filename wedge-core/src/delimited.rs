//! Sentinel-delimited scan capture
//!
//! Buffers every keystroke between a designated start key and end key and
//! reports the assembled barcode when the end key arrives. Suited to
//! scanners programmed to emit distinct sentinel keys around each scan;
//! because the window is unambiguous, captured keys can be suppressed
//! synchronously so scan characters never reach a focused input.

use std::time::Instant;

use crate::event::{default_key_filter, KeyFilter, KeyStroke, OnScan};
use crate::ScanHandler;

/// Default start-of-scan sentinel key.
pub const DEFAULT_CAPTURE_PREFIX: &str = "F18";

/// Default end-of-scan sentinel key.
pub const DEFAULT_CAPTURE_SUFFIX: &str = "F19";

/// Side effect applied to every keystroke observed inside a capture window,
/// sentinels included.
pub enum CapturedInput {
    /// Mark the event suppressed so the dispatcher swallows it. The default:
    /// keeps scan characters out of whatever has focus.
    SuppressDefault,
    /// No side effect.
    Ignore,
    /// Caller-supplied action, invoked with each captured event.
    Custom(Box<dyn FnMut(&mut KeyStroke) + Send>),
}

impl CapturedInput {
    fn apply(&mut self, event: &mut KeyStroke) {
        match self {
            CapturedInput::SuppressDefault => event.suppress(),
            CapturedInput::Ignore => {}
            CapturedInput::Custom(action) => action(event),
        }
    }
}

/// Configuration for [`DelimitedScanner`].
pub struct DelimitedConfig {
    /// Key that opens a capture window. Never buffered. Defaults to F18.
    pub capture_prefix: String,
    /// Key that closes a capture window and triggers the scan callback.
    /// Never buffered. Defaults to F19.
    pub capture_suffix: String,
    /// Consulted for each keystroke inside a capture window; only keys it
    /// accepts are buffered. Defaults to excluding modifier keys.
    pub filter: KeyFilter,
    /// Applied to every captured keystroke, sentinels included.
    pub on_captured_input: CapturedInput,
}

impl Default for DelimitedConfig {
    fn default() -> Self {
        Self {
            capture_prefix: DEFAULT_CAPTURE_PREFIX.into(),
            capture_suffix: DEFAULT_CAPTURE_SUFFIX.into(),
            filter: default_key_filter(),
            on_captured_input: CapturedInput::SuppressDefault,
        }
    }
}

/// Handler that captures barcodes between configurable start and end
/// sentinel keys.
///
/// The scan callback fires synchronously on the suffix key. There is no
/// timeout escape: a prefix without a matching suffix leaves the handler
/// capturing indefinitely (documented limitation of this strategy).
pub struct DelimitedScanner {
    capture_prefix: String,
    capture_suffix: String,
    filter: KeyFilter,
    on_captured_input: CapturedInput,
    buffer: String,
    capturing: bool,
    on_scan: OnScan,
}

impl DelimitedScanner {
    pub fn new(config: DelimitedConfig, on_scan: impl FnMut(String) + Send + 'static) -> Self {
        Self {
            capture_prefix: config.capture_prefix,
            capture_suffix: config.capture_suffix,
            filter: config.filter,
            on_captured_input: config.on_captured_input,
            buffer: String::new(),
            capturing: false,
            on_scan: Box::new(on_scan),
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.capturing = false;
    }

    /// Process one keystroke.
    ///
    /// A prefix key always opens a fresh window, discarding anything
    /// buffered since a previous unclosed prefix. Keys outside a window are
    /// ignored entirely: no side effect, no filter call.
    pub fn handle_key(&mut self, event: &mut KeyStroke) {
        if event.key() == self.capture_prefix {
            self.on_captured_input.apply(event);
            self.capturing = true;
            self.buffer.clear();
            tracing::debug!(prefix = %self.capture_prefix, "capture window opened");
            return;
        }

        if event.key() == self.capture_suffix {
            self.on_captured_input.apply(event);
            let barcode = std::mem::take(&mut self.buffer);
            tracing::debug!(len = barcode.len(), "scan complete");
            (self.on_scan)(barcode);
            self.reset();
            return;
        }

        if self.capturing {
            self.on_captured_input.apply(event);
            if (self.filter)(event) {
                self.buffer.push_str(event.key());
            }
            return;
        }

        // Normal user input, ignore it
    }
}

impl ScanHandler for DelimitedScanner {
    fn handle_key(&mut self, event: &mut KeyStroke, _now: Instant) {
        DelimitedScanner::handle_key(self, event);
    }
}
