use thiserror::Error;

/// Errors raised while constructing a scan handler.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// An empty prefix sequence was supplied. Use `None` to capture without
    /// a prefix requirement.
    #[error("prefix sequence cannot be empty")]
    EmptyPrefix,
}
