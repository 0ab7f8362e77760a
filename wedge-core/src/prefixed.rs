//! Prefix-sequence scan capture with an inactivity deadline
//!
//! Many scanners emit no distinguishable end key; they are just much faster
//! than a human and go quiet when the scan is done. This handler starts
//! buffering once a fixed key sequence has matched (or immediately, when no
//! prefix is configured) and reports the barcode when an inactivity deadline
//! passes or an early-completion predicate accepts the buffer.
//!
//! Time is injected: callers pass `now` into [`PrefixedScanner::handle_key`]
//! and drive [`PrefixedScanner::tick`] from their event loop. Completed
//! barcodes are queued and only delivered from `tick`, so the scan callback
//! never runs inside the call stack of the keystroke that finished the scan.

use std::time::{Duration, Instant};

use crate::error::ConfigError;
use crate::event::{default_key_filter, KeyFilter, KeyStroke, OnScan};
use crate::ScanHandler;

/// Default inactivity deadline.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_millis(200);

/// Configuration for [`PrefixedScanner`].
pub struct PrefixedConfig {
    /// Ordered key sequence that opens a capture window. `None` starts
    /// capturing immediately; an explicitly empty sequence is rejected at
    /// construction.
    pub prefix: Option<Vec<String>>,
    /// Prepend the matched prefix keys to the reported barcode.
    pub include_prefix_in_output: bool,
    /// Consulted for every keystroke; rejected keys are ignored entirely
    /// (not buffered, no prefix-matcher effect, no deadline armed).
    /// Defaults to excluding modifier keys.
    pub filter: KeyFilter,
    /// Optional early-completion test on the buffer so far. Not a
    /// validator: a buffer failing the test is still reported once the
    /// deadline passes.
    pub scan_is_complete: Option<Box<dyn FnMut(&str) -> bool + Send>>,
    /// Inactivity period after which the buffered scan is reported.
    pub scan_timeout: Duration,
}

impl Default for PrefixedConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            include_prefix_in_output: false,
            filter: default_key_filter(),
            scan_is_complete: None,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

/// Handler that captures a barcode after a prefix key sequence and reports
/// it on inactivity or early completion.
///
/// The deadline is armed by the first accepted keystroke of a window and is
/// deliberately not extended by later keystrokes: a scan whose total
/// duration exceeds the timeout is cut off mid-scan unless
/// `scan_is_complete` ends it first. See the module tests for the exact
/// contract.
pub struct PrefixedScanner {
    prefix: Option<Vec<String>>,
    include_prefix_in_output: bool,
    filter: KeyFilter,
    scan_is_complete: Option<Box<dyn FnMut(&str) -> bool + Send>>,
    scan_timeout: Duration,
    buffer: String,
    prefix_buffer: Vec<String>,
    capturing: bool,
    deadline: Option<Instant>,
    completed: Vec<String>,
    on_scan: OnScan,
}

impl PrefixedScanner {
    /// Build a scanner, rejecting an explicitly empty prefix sequence.
    pub fn new(
        config: PrefixedConfig,
        on_scan: impl FnMut(String) + Send + 'static,
    ) -> Result<Self, ConfigError> {
        if config.prefix.as_ref().is_some_and(Vec::is_empty) {
            return Err(ConfigError::EmptyPrefix);
        }

        Ok(Self {
            prefix: config.prefix,
            include_prefix_in_output: config.include_prefix_in_output,
            filter: config.filter,
            scan_is_complete: config.scan_is_complete,
            scan_timeout: config.scan_timeout,
            buffer: String::new(),
            prefix_buffer: Vec::new(),
            capturing: false,
            deadline: None,
            completed: Vec::new(),
            on_scan: Box::new(on_scan),
        })
    }

    /// Process one keystroke observed at `now`.
    pub fn handle_key(&mut self, event: &KeyStroke, now: Instant) {
        if !(self.filter)(event) {
            return;
        }

        // One deadline per window; later keystrokes never extend it.
        if self.deadline.is_none() {
            let deadline = now + self.scan_timeout;
            self.deadline = Some(deadline);
            tracing::trace!(timeout_ms = self.scan_timeout.as_millis() as u64, "deadline armed");
        }

        if self.capturing || self.prefix.is_none() {
            self.buffer.push_str(event.key());
            let done = match &mut self.scan_is_complete {
                Some(test) => test(&self.buffer),
                None => false,
            };
            if done {
                self.complete_scan();
            }
            return;
        }

        // Prefix configured and not yet matched: advance or restart the matcher.
        if let Some(prefix) = &self.prefix {
            if prefix.get(self.prefix_buffer.len()).map(String::as_str) == Some(event.key()) {
                self.prefix_buffer.push(event.key().to_string());
                if self.prefix_buffer.len() == prefix.len() {
                    self.capturing = true;
                    tracing::debug!("prefix matched, capture window opened");
                }
            } else {
                // The mismatching key is not retried as a fresh first element.
                self.prefix_buffer.clear();
            }
        }
    }

    /// Fire the deadline if it has passed and deliver any completed scans.
    ///
    /// Call this from the owning event loop; it is the only place the scan
    /// callback runs.
    pub fn tick(&mut self, now: Instant) {
        if self.deadline.is_some_and(|deadline| now >= deadline) {
            self.deadline = None;
            if self.buffer.is_empty() {
                tracing::trace!("deadline expired with nothing buffered");
            } else {
                self.complete_scan();
            }
        }

        for barcode in std::mem::take(&mut self.completed) {
            (self.on_scan)(barcode);
        }
    }

    /// The pending inactivity deadline, for bounding an event-loop poll.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn complete_scan(&mut self) {
        let mut barcode = if self.include_prefix_in_output {
            self.prefix_buffer.concat()
        } else {
            String::new()
        };
        barcode.push_str(&self.buffer);
        tracing::debug!(len = barcode.len(), "scan complete");

        self.buffer.clear();
        self.prefix_buffer.clear();
        self.capturing = false;
        self.deadline = None;
        self.completed.push(barcode);
    }
}

impl ScanHandler for PrefixedScanner {
    fn handle_key(&mut self, event: &mut KeyStroke, now: Instant) {
        PrefixedScanner::handle_key(self, event, now);
    }

    fn tick(&mut self, now: Instant) {
        PrefixedScanner::tick(self, now);
    }

    fn next_deadline(&self) -> Option<Instant> {
        PrefixedScanner::next_deadline(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn scan_sink() -> (Arc<Mutex<Vec<String>>>, impl FnMut(String) + Send + 'static) {
        let scans = Arc::new(Mutex::new(Vec::new()));
        let sink = scans.clone();
        (scans, move |barcode| sink.lock().unwrap().push(barcode))
    }

    fn prefix(keys: &[&str]) -> Option<Vec<String>> {
        Some(keys.iter().map(|k| k.to_string()).collect())
    }

    fn feed(scanner: &mut PrefixedScanner, keys: &str, now: Instant) {
        for key in keys.chars() {
            scanner.handle_key(&KeyStroke::new(key.to_string()), now);
        }
    }

    #[test]
    fn test_empty_prefix_rejected_at_construction() {
        let result = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&[]),
                ..Default::default()
            },
            |_| {},
        );
        assert_eq!(result.err(), Some(ConfigError::EmptyPrefix));
    }

    #[test]
    fn test_no_prefix_captures_everything_after_timeout() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(PrefixedConfig::default(), sink).unwrap();
        let start = Instant::now();

        feed(&mut scanner, "L%123abc", start);
        assert!(scans.lock().unwrap().is_empty());

        scanner.tick(start + DEFAULT_SCAN_TIMEOUT);
        assert_eq!(*scans.lock().unwrap(), vec!["L%123abc".to_string()]);
    }

    #[test]
    fn test_prefix_excluded_from_output_by_default() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        feed(&mut scanner, "L%123abc", start);
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT);

        assert_eq!(*scans.lock().unwrap(), vec!["123abc".to_string()]);
    }

    #[test]
    fn test_include_prefix_in_output() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                include_prefix_in_output: true,
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        feed(&mut scanner, "L%123abc", start);
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT);

        assert_eq!(*scans.lock().unwrap(), vec!["L%123abc".to_string()]);
    }

    #[test]
    fn test_unmatched_prefix_never_reports() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        feed(&mut scanner, "l%123", start);
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT * 2);

        assert!(scans.lock().unwrap().is_empty());
    }

    #[test]
    fn test_prefix_alone_expires_silently() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        feed(&mut scanner, "L%", start);
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT * 2);

        assert!(scans.lock().unwrap().is_empty());
    }

    #[test]
    fn test_mismatch_restarts_matching_from_scratch() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        // "LL%" fails: the second L mismatches "%" and is not reused as a
        // fresh first element, so the "%4" that follows never matches either.
        feed(&mut scanner, "LL%4", start);
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT);
        assert!(scans.lock().unwrap().is_empty());

        // A clean attempt afterwards still works.
        let retry = start + Duration::from_secs(1);
        feed(&mut scanner, "L%4", retry);
        scanner.tick(retry + DEFAULT_SCAN_TIMEOUT);
        assert_eq!(*scans.lock().unwrap(), vec!["4".to_string()]);
    }

    #[test]
    fn test_scan_is_complete_bypasses_timeout() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                scan_is_complete: Some(Box::new(|barcode| barcode == "123abc")),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        feed(&mut scanner, "L%123abc", start);
        // Deferred: never delivered inside handle_key.
        assert!(scans.lock().unwrap().is_empty());

        // Delivered on the next tick, well before the deadline.
        scanner.tick(start);
        assert_eq!(*scans.lock().unwrap(), vec!["123abc".to_string()]);
    }

    #[test]
    fn test_deadline_runs_from_first_keystroke() {
        // Current contract: the deadline is armed once per window and not
        // extended by later keystrokes, so a slow scan is cut off relative
        // to its start rather than its last character.
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(PrefixedConfig::default(), sink).unwrap();
        let start = Instant::now();

        scanner.handle_key(&KeyStroke::new("1"), start);
        scanner.handle_key(&KeyStroke::new("2"), start + Duration::from_millis(150));
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT);

        assert_eq!(*scans.lock().unwrap(), vec!["12".to_string()]);
    }

    #[test]
    fn test_silent_expiry_frees_the_deadline_slot() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        // Arms a deadline while matching nothing, then expires empty.
        scanner.handle_key(&KeyStroke::new("x"), start);
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT);
        assert!(scanner.next_deadline().is_none());

        // A later window can still arm and complete.
        let retry = start + Duration::from_secs(1);
        feed(&mut scanner, "L%7", retry);
        scanner.tick(retry + DEFAULT_SCAN_TIMEOUT);
        assert_eq!(*scans.lock().unwrap(), vec!["7".to_string()]);
    }

    #[test]
    fn test_rejected_keys_are_ignored_completely() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                filter: Box::new(|event| event.key() != "a"),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        // A rejected key arms no deadline.
        scanner.handle_key(&KeyStroke::new("a"), start);
        assert!(scanner.next_deadline().is_none());

        feed(&mut scanner, "123abc", start);
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT);
        assert_eq!(*scans.lock().unwrap(), vec!["123bc".to_string()]);
    }

    #[test]
    fn test_filter_consulted_once_per_keystroke() {
        let calls = Arc::new(Mutex::new(0usize));
        let seen = calls.clone();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                filter: Box::new(move |_| {
                    *seen.lock().unwrap() += 1;
                    true
                }),
                ..Default::default()
            },
            |_| {},
        )
        .unwrap();

        feed(&mut scanner, "L%123abc", Instant::now());

        assert_eq!(*calls.lock().unwrap(), 8);
    }

    #[test]
    fn test_filtered_prefix_key_blocks_matching() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                filter: Box::new(|event| event.key() != "L"),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        feed(&mut scanner, "L%123abc", start);
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT);

        assert!(scans.lock().unwrap().is_empty());
    }

    #[test]
    fn test_default_filter_drops_modifiers() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        for key in ["L", "%", "1", "2", "3", "Shift", "a"] {
            scanner.handle_key(&KeyStroke::new(key), start);
        }
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT);

        assert_eq!(*scans.lock().unwrap(), vec!["123a".to_string()]);
    }

    #[test]
    fn test_window_closes_after_completion() {
        // Completion returns the handler to idle: a second barcode needs
        // the prefix again.
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                prefix: prefix(&["L", "%"]),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        feed(&mut scanner, "L%11", start);
        scanner.tick(start + DEFAULT_SCAN_TIMEOUT);

        let later = start + Duration::from_secs(1);
        feed(&mut scanner, "22", later);
        scanner.tick(later + DEFAULT_SCAN_TIMEOUT);
        feed(&mut scanner, "L%33", later + Duration::from_secs(1));
        scanner.tick(later + Duration::from_secs(1) + DEFAULT_SCAN_TIMEOUT);

        assert_eq!(
            *scans.lock().unwrap(),
            vec!["11".to_string(), "33".to_string()]
        );
    }

    #[test]
    fn test_custom_timeout_respected() {
        let (scans, sink) = scan_sink();
        let mut scanner = PrefixedScanner::new(
            PrefixedConfig {
                scan_timeout: Duration::from_millis(500),
                ..Default::default()
            },
            sink,
        )
        .unwrap();
        let start = Instant::now();

        feed(&mut scanner, "99", start);
        scanner.tick(start + Duration::from_millis(499));
        assert!(scans.lock().unwrap().is_empty());

        scanner.tick(start + Duration::from_millis(500));
        assert_eq!(*scans.lock().unwrap(), vec!["99".to_string()]);
    }
}
