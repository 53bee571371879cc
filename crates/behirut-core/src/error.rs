//! Error types for host tree operations and configuration checks.

use thiserror::Error;

/// Failures reported by a [`crate::TextTree`] host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TreeError {
    /// The node handle no longer refers to a live node.
    #[error("node not found: {0}")]
    MissingNode(String),

    /// A node expected to be a child of some parent was not.
    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: String, child: String },

    /// The document lacks a structural anchor (`head` or `body`).
    #[error("document has no {0} element")]
    MissingAnchor(&'static str),

    /// The host threw. Carries the host's own error text.
    #[error("host error: {0}")]
    Host(String),
}

/// Problems found when validating [`crate::Settings`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{field} must be between 100 and 300, got {value}")]
    OutOfRange { field: String, value: u32 },

    #[error("{0} must not be empty")]
    Empty(String),

    #[error("duplicate custom setting for {0}")]
    DuplicateSite(String),

    #[error("duplicate custom font {0}")]
    DuplicateFont(String),
}
