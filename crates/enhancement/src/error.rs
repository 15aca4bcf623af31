//! Decoder error type.

use std::collections::TryReserveError;

/// Result type.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors surfaced to the host.
///
/// Bitstream malformities are recoverable at the picture boundary: the
/// host discards this picture's outputs and resynchronises at the next
/// IDR. Resource exhaustion bubbles out unchanged, and argument errors
/// never touch shared state.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// A byte- or bit-level read ran past the end of its stream.
    #[error("bitstream read: {0}")]
    Read(#[from] lcevc_bytes_util::ReadError),
    /// The NAL unit failed start-code, header or stop-byte validation.
    #[error("malformed NAL unit: {0}")]
    MalformedNal(&'static str),
    /// A configuration block consumed a different number of bytes than
    /// its header signalled.
    #[error("stream desync in block {block}: signalled {signalled} bytes, consumed {consumed}")]
    StreamDesync {
        /// Raw block type value.
        block: u8,
        /// Size the block header signalled.
        signalled: usize,
        /// Bytes the block parser actually consumed.
        consumed: usize,
    },
    /// The stream requests a capability this decoder does not support.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),
    /// A serialized Huffman table was inconsistent, or a code was read
    /// that no table contains.
    #[error("invalid huffman data: {0}")]
    HuffmanInvalid(&'static str),
    /// An entropy-coded value exceeded its domain.
    #[error("entropy overflow: {0}")]
    EntropyOverflow(&'static str),
    /// A temporal run decoded to a non-positive length.
    #[error("temporal run is not positive: {0}")]
    NegativeTemporalRun(i64),
    /// A growable buffer could not be extended.
    #[error("allocation failed: {0}")]
    AllocationFailed(#[from] TryReserveError),
    /// The host passed an out-of-range plane, LOQ or tile, or misused the
    /// API.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
