//! Error types for the Route controller
//!
//! "Not found" on a read is never an error here: the store seam turns it into
//! `Ok(None)` so the reconciler can branch on it. Everything else is wrapped with
//! the operation and key it happened on.

use std::fmt;

use thiserror::Error;

use crate::ObjectKey;

/// Resource-store call that produced an error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOperation {
    /// Read of the driver Service
    GetService,
    /// Read of the derived Route
    GetRoute,
    /// Creation of the derived Route
    CreateRoute,
    /// Deletion of the derived Route
    DeleteRoute,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetService => write!(f, "get Service"),
            Self::GetRoute => write!(f, "get Route"),
            Self::CreateRoute => write!(f, "create Route"),
            Self::DeleteRoute => write!(f, "delete Route"),
        }
    }
}

/// Main error type for Route reconciliation
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A resource-store call failed for a reason other than "not found"
    #[error("failed to {operation} {key}: {source}")]
    Store {
        /// The call that failed
        operation: StoreOperation,
        /// Key the call was made for
        key: ObjectKey,
        /// The underlying kube-rs error
        source: kube::Error,
    },

    /// A key that cannot identify a namespaced object
    #[error("invalid object key '{key}': {message}")]
    InvalidKey {
        /// The offending key
        key: ObjectKey,
        /// Description of what's invalid
        message: String,
    },

    /// Invalid controller configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap a kube-rs error with the operation and key it happened on
    pub fn store(operation: StoreOperation, key: &ObjectKey, source: kube::Error) -> Self {
        Self::Store {
            operation,
            key: key.clone(),
            source,
        }
    }

    /// Create an invalid-key error
    pub fn invalid_key(key: ObjectKey, message: impl Into<String>) -> Self {
        Self::InvalidKey {
            key,
            message: message.into(),
        }
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status code returned by the API server, if any
    pub fn api_code(&self) -> Option<u16> {
        match self {
            Self::Store {
                source: kube::Error::Api(ae),
                ..
            } => Some(ae.code),
            _ => None,
        }
    }

    /// The object did not exist (404)
    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(404)
    }

    /// The object already existed (409), i.e. a concurrent create won
    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }

    /// Whether retrying soon has a chance of succeeding.
    ///
    /// Connection failures, timeouts, cancelled calls, 5xx, 408, 409 and 429
    /// are transient. Other 4xx answers (forbidden, invalid object) are
    /// permanent until something outside the controller changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. } => match source {
                kube::Error::Api(ae) => {
                    !(400..500).contains(&ae.code) || matches!(ae.code, 408 | 409 | 429)
                }
                _ => true,
            },
            Self::InvalidKey { .. } => false,
            Self::Config(_) => false,
        }
    }

    /// The key this error is associated with, if any
    pub fn key(&self) -> Option<&ObjectKey> {
        match self {
            Self::Store { key, .. } => Some(key),
            Self::InvalidKey { key, .. } => Some(key),
            Self::Config(_) => None,
        }
    }
}
