//! Reader error type.

/// Result type.
pub type Result<T> = std::result::Result<T, ReadError>;

/// Errors produced by the byte and bit readers.
///
/// Every failed read leaves the reader position unchanged, so a caller can
/// report the offset at which the stream ran dry.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// A read or seek would move past the end of the stream, or the
    /// requested amount overflows the offset arithmetic.
    #[error("read of {requested} bytes at offset {offset} exceeds stream size {size}")]
    OutOfBounds {
        /// Reader offset at the time of the failed read.
        offset: usize,
        /// Number of bytes the read required.
        requested: usize,
        /// Total stream size.
        size: usize,
    },
    /// A multi-byte value still had its continuation bit set in the final
    /// permitted byte.
    #[error("multi-byte value exceeds {0} bytes")]
    MultiByteTooLong(usize),
    /// The reader was initialized with no data.
    #[error("stream is empty")]
    EmptyStream,
}
