//! Error types for Matroska parsing.
//!
//! Only structural violations are fatal; recoverable oddities (wrong float
//! width, irregular CFR frames, duplicate non-multiple children) are logged
//! as warnings and parsing continues.

use thiserror::Error;

/// Fatal parse errors.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Invalid element identifier (0x00 or reserved all-ones byte) at a
    /// position demanding an identifier.
    #[error("Invalid element identifier at offset {offset}")]
    InvalidId {
        /// Byte offset of the offending identifier.
        offset: u64,
    },

    /// A size VINT wider than 8 bytes.
    #[error("Element size wider than 8 bytes at offset {offset}")]
    OversizedVint {
        /// Byte offset of the offending size field.
        offset: u64,
    },

    /// A payload extending past the end of its enclosing container.
    #[error(
        "Element at offset {offset} overruns its container: payload ends at \
         {payload_end}, container ends at {container_end}"
    )]
    Overrun {
        /// Byte offset of the offending element.
        offset: u64,
        /// Where the element payload claims to end.
        payload_end: u64,
        /// Where the enclosing container actually ends.
        container_end: u64,
    },

    /// A leaf element declared with unknown size.
    #[error("Non-container element at offset {offset} has unknown size")]
    UnknownSizeLeaf {
        /// Byte offset of the offending element.
        offset: u64,
    },

    /// Expected a specific element, found another.
    #[error("Expected {expected} at offset {offset}, found 0x{found:X}")]
    UnexpectedElement {
        /// Byte offset where the mismatch occurred.
        offset: u64,
        /// Name of the element that was expected.
        expected: &'static str,
        /// Identifier that was actually read.
        found: u64,
    },

    /// No EBML or Segment root was located within the scan cap.
    #[error("Cannot find EBML or Segment structure")]
    MissingRoot,

    /// I/O error from the byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for parse operations.
pub type Result<T> = std::result::Result<T, ParseError>;
