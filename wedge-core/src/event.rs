//! Keystroke events and the default key filter
//!
//! Handlers only ever read a keystroke's identifier and, while a capture
//! window is open, may ask the dispatching layer to swallow the key so scan
//! characters don't leak into whatever has focus.

/// Key identifiers classified as modifiers by the default filter.
pub const MODIFIER_KEYS: [&str; 4] = ["Alt", "Control", "Meta", "Shift"];

/// A single keystroke delivered to a scan handler.
///
/// The identifier follows `KeyboardEvent.key` naming: printable keys are the
/// character itself (`"a"`, `"%"`), named keys spell out (`"Enter"`,
/// `"F18"`, `"Shift"`). Handlers never retain the event past the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStroke {
    key: String,
    suppressed: bool,
}

impl KeyStroke {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            suppressed: false,
        }
    }

    /// The key identifier.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Ask the dispatching layer to swallow this keystroke instead of
    /// forwarding it as ordinary input.
    pub fn suppress(&mut self) {
        self.suppressed = true;
    }

    /// Whether a handler asked for this keystroke to be swallowed.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }
}

/// Predicate deciding whether a keystroke belongs in the barcode buffer.
pub type KeyFilter = Box<dyn FnMut(&KeyStroke) -> bool + Send>;

/// Callback invoked once per completed scan with the assembled barcode.
pub type OnScan = Box<dyn FnMut(String) + Send>;

/// Check whether a keystroke is a modifier key (Alt|Control|Meta|Shift).
pub fn is_modifier_key(event: &KeyStroke) -> bool {
    MODIFIER_KEYS.contains(&event.key())
}

/// The default filter: everything except modifier keys.
pub fn default_key_filter() -> KeyFilter {
    Box::new(|event| !is_modifier_key(event))
}
