//! Error types for the Switchyard library.
//!
//! This module provides the error handling system for role routing,
//! session timestamp storage, and wrapped database operations.

use thiserror::Error;

/// Primary error type encompassing all possible errors in the library.
#[derive(Error, Debug)]
pub enum Error {
    /// A write was attempted inside a write-preventing read scope
    #[error("Write attempted while writes are prevented on this connection")]
    ForbiddenWrite,

    /// Connection-level failures raised by a wrapped operation
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query-level failures raised by a wrapped operation
    #[error("Query error: {0}")]
    Query(String),

    /// Session timestamp storage errors
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration validation and parsing errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal library errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    /// Creates a new query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Error::Query(msg.into())
    }

    /// Creates a new session error with the given message.
    pub fn session(msg: impl Into<String>) -> Self {
        Error::Session(msg.into())
    }

    /// Creates a new internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}
