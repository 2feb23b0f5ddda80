//! Error types shared by the hash table and the heap.
use thiserror::Error;

/// Recoverable failures returned by container operations.
///
/// Overlapping calls caught by the sanity guard are not represented here:
/// they are programming errors and panic in debug builds.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// Allocating or growing internal storage failed. The container is unchanged.
    #[error("out of memory")]
    OutOfMemory,

    /// A constructor or resize argument was rejected.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: &'static str },

    /// An entry with an equal key already lives in the target bucket.
    #[error("duplicate key")]
    DuplicateKey,

    /// No entry matched the requested key.
    #[error("key not found")]
    NotFound,
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}
