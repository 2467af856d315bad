//! Error types for ostack
//!
//! Library code returns [`Result<T>`] with [`OstackError`]. The binary converts
//! to `anyhow::Error` at the top level so context chains are kept.
//!
//! Usage errors (`UnknownKind`, `UnknownColumn`, `InvalidMatcher`, `InvalidTarget`)
//! and `Provider` errors abort the invocation. Unresolvable cross-references never
//! surface here: they become the `(unknown)` display value. Per-target delete
//! failures are collected in a `DeleteReport` instead.

use thiserror::Error;

/// Main error type for ostack
#[derive(Error, Debug)]
pub enum OstackError {
    #[error("Unknown resource kind '{kind}'. Valid kinds: {}", .valid.join(", "))]
    UnknownKind { kind: String, valid: Vec<String> },

    #[error("Unknown column '{column}'. Valid columns: {}", .valid.join(", "))]
    UnknownColumn { column: String, valid: Vec<String> },

    #[error("Resource {resource_id} has no field for column '{column}'")]
    MissingField { column: String, resource_id: String },

    #[error("Invalid matcher '{0}': expected FIELD=VALUE")]
    InvalidMatcher(String),

    #[error("Invalid delete target: {0}")]
    InvalidTarget(String),

    #[error("Missing {0}: set it in clouds.yaml or the environment")]
    MissingContext(&'static str),

    #[error("Failed to list {kind} resources")]
    Provider {
        kind: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, OstackError>;
