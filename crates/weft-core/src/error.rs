//! Core error types.

use thiserror::Error;

/// Core engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Proto(#[from] weft_proto::Error),

    /// A request referenced something in an inconsistent way; reportable to
    /// the caller as a 400-equivalent.
    #[error("validation error: {0}")]
    Validation(String),

    /// Update or delete targeted a primary key that does not exist.
    #[error("record not found")]
    NotFound,

    /// Model registration is inconsistent; raised at registry build time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transaction failure; the whole entity write is aborted.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
