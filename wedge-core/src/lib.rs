//! Input-handler state machines for keyboard-wedge barcode scanners
//!
//! Barcode scanners in keyboard-wedge mode inject their scans into the
//! ordinary keystroke stream. This crate segments that stream: each handler
//! consumes keystrokes one at a time, recognizes the burst belonging to a
//! scan, and reports the assembled barcode through a callback.
//!
//! Two strategies are provided:
//!
//! - [`DelimitedScanner`]: the scanner is programmed to wrap each scan in
//!   start/end sentinel keys (F18/F19 by default). Synchronous, no timers,
//!   can suppress captured keys so they never reach the focused input.
//! - [`PrefixedScanner`]: the scanner emits a fixed prefix sequence and the
//!   scan ends on an inactivity deadline or an early-completion predicate.
//!
//! Handlers own their state and are driven entirely by their caller; see
//! `wedge-term` for a ready-made listener loop.

mod delimited;
mod error;
mod event;
mod prefixed;

pub use delimited::{
    CapturedInput, DelimitedConfig, DelimitedScanner, DEFAULT_CAPTURE_PREFIX,
    DEFAULT_CAPTURE_SUFFIX,
};
pub use error::ConfigError;
pub use event::{default_key_filter, is_modifier_key, KeyFilter, KeyStroke, OnScan, MODIFIER_KEYS};
pub use prefixed::{PrefixedConfig, PrefixedScanner, DEFAULT_SCAN_TIMEOUT};

use std::time::Instant;

/// Object-safe seam between a keystroke dispatcher and a scan handler.
///
/// The dispatcher must serialize all calls on one instance: keystrokes in
/// arrival order, with `tick` interleaved from the same loop. Handlers with
/// no time-based behavior use the defaults.
pub trait ScanHandler: Send {
    /// Process one keystroke observed at `now`.
    fn handle_key(&mut self, event: &mut KeyStroke, now: Instant);

    /// Advance time-based state and deliver any pending scans.
    fn tick(&mut self, _now: Instant) {}

    /// The next instant at which [`ScanHandler::tick`] has work to do, if
    /// any; lets the dispatcher bound its poll timeout.
    fn next_deadline(&self) -> Option<Instant> {
        None
    }
}
