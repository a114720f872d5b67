//! Error types for bit-vector serialization.

use thiserror::Error;

/// Error variants for stream encoding and decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// The stream did not begin with a START segment.
    #[error("missing start segment: found tag {0}")]
    MissingStart(u8),

    /// A segment tag that is unknown or not valid at its position.
    #[error("unexpected segment tag: {0}")]
    UnexpectedSegment(u8),

    /// A segment length does not fit the 32-bit length field.
    #[error("segment of {0} bytes exceeds the 32-bit length field")]
    SegmentTooLarge(usize),

    /// The codec already failed earlier and refuses further work.
    #[error("codec is in the failed state")]
    CodecFailed,

    /// An I/O error occurred during serialization or deserialization.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for bit-vector operations.
pub type Result<T> = std::result::Result<T, Error>;
