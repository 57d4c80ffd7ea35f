//! Error types for MARC operations.
//!
//! This module provides the [`MarcError`] type for all MARC codec operations
//! and the [`Result`] convenience type. Query-language errors have their own
//! type, [`crate::query::QueryError`], because they are recoverable at the
//! CLI boundary while codec errors are fatal for the run.

use thiserror::Error;

/// Error type for all MARC codec operations.
///
/// Every variant represents a malformed record or a failed I/O operation.
/// A clean end of stream is *not* an error; the reader reports it as
/// `Ok(None)` instead.
#[derive(Error, Debug)]
pub enum MarcError {
    /// An invalid or malformed MARC record.
    #[error("Invalid MARC record: {0}")]
    InvalidRecord(String),

    /// An invalid leader (24-byte header).
    #[error("Invalid leader: {0}")]
    InvalidLeader(String),

    /// An invalid directory entry (12-byte field descriptor).
    #[error("Invalid directory entry: {0}")]
    InvalidDirectoryEntry(String),

    /// An invalid field or subfield structure.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// A truncated or incomplete record.
    #[error("Truncated record: {0}")]
    TruncatedRecord(String),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;
