//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Filter operator string not recognized.
    #[error("unknown filter operator: {0}")]
    UnknownOperator(String),

    /// `connect` and `set` are mutually exclusive within one operation set.
    #[error("`connect` and `set` cannot be combined in one operation set")]
    ConnectWithSet,

    /// A positional hint carried none or several of before/after/start/end.
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// A sort entry could not be parsed.
    #[error("invalid sort specification: {0}")]
    InvalidSort(String),
}
