//! Terminal wiring for wedge scan handlers
//!
//! Bridges `wedge-core` handlers to a real keystroke stream: a [`KeySource`]
//! abstraction with a crossterm-backed [`TerminalKeys`] implementation, and
//! the threaded [`ScanListener`] that owns a handler and drives it.

mod listener;
mod source;

pub use listener::ScanListener;
pub use source::{key_name, KeySource, TerminalKeys};
