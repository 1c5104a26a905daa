//! Error types for unsign operations.
//!
//! A missing code signature is not an error; it is reported through
//! [`crate::Status::SignatureNotFound`].

use thiserror::Error;

/// Error type for unsign operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Opening, mapping or flushing the destination file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The first four bytes of the image are not a thin Mach-O magic.
    #[error("Unknown mach-o magic number: {0:#010x}")]
    UnsupportedMagic(u32),

    /// A record was decoded from a slice of the wrong length.
    #[error("{record}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An access would fall outside the image buffer.
    #[error("Out of bounds: {len} bytes at offset {offset:#x} in a {size:#x} byte buffer")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// The header or load-command table is internally inconsistent.
    #[error("Invalid Mach-O: {0}")]
    Malformed(String),
}
