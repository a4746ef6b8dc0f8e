//! Typed error definitions for cloud_quicklink.
//! Provides a small set of well-known failure modes for better logs and tests.
//!
//! `LinkError` is what callers of the library see. Collaborator failures
//! (`StoreError` from the share store, `TransportError` from HTTP) are mapped
//! into it at the resolver boundary so every error carries the file path and
//! owner it concerns.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Failed to connect to {url} as {owner}: {reason}")]
    ConnectionFailure {
        url: String,
        owner: String,
        reason: String,
    },

    #[error("'{path}' not found for owner {owner}: {reason}")]
    ResourceNotFound {
        path: String,
        owner: String,
        reason: String,
    },

    #[error("Error in create public share for '{path}' (owner {owner}): {reason}")]
    ShareCreationFailed {
        path: String,
        owner: String,
        reason: String,
    },

    #[error("Call to API failed for '{path}' (owner {owner}): {code} - {message}")]
    RemoteApiFailure {
        path: String,
        owner: String,
        code: String,
        message: String,
    },

    #[error("Error adding log entry to {}: {reason}", path.display())]
    AuditWriteFailed { path: PathBuf, reason: String },
}

impl LinkError {
    /// Stable numeric code, used in structured logs.
    pub fn code(&self) -> i32 {
        match self {
            LinkError::InvalidParameter { .. } => 10,
            LinkError::InvalidState(_) => 11,
            LinkError::ConnectionFailure { .. } => 20,
            LinkError::ResourceNotFound { .. } => 21,
            LinkError::ShareCreationFailed { .. } => 22,
            LinkError::RemoteApiFailure { .. } => 23,
            LinkError::AuditWriteFailed { .. } => 30,
        }
    }

    /// Short snake_case tag for the `kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            LinkError::InvalidParameter { .. } => "invalid_parameter",
            LinkError::InvalidState(_) => "invalid_state",
            LinkError::ConnectionFailure { .. } => "connection_failure",
            LinkError::ResourceNotFound { .. } => "resource_not_found",
            LinkError::ShareCreationFailed { .. } => "share_creation_failed",
            LinkError::RemoteApiFailure { .. } => "remote_api_failure",
            LinkError::AuditWriteFailed { .. } => "audit_write_failed",
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        LinkError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Failure reported by a remote share store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Code reported in `LinkError::RemoteApiFailure`.
    pub fn code(&self) -> String {
        match self {
            StoreError::Transport(_) => "transport".into(),
            StoreError::NotFound(_) => "404".into(),
            StoreError::Status { status, .. } => status.to_string(),
            StoreError::Malformed(_) => "malformed".into(),
        }
    }
}

/// The request never produced an HTTP reply (DNS, TLS, timeout, ...).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);
