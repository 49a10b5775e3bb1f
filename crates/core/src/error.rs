//! Error types for the SII codec.
//!
//! All operations return structured errors rather than panicking. Failures
//! raised while decoding or encoding a document are wrapped with the field
//! and category that were in progress, so a malformed device image can be
//! diagnosed from the message alone.

use thiserror::Error;

/// Top-level error type for all operations in the codec.
///
/// Each variant corresponds to a specific failure domain:
/// - Bit I/O: reading/writing bits and bytes against a source or sink
/// - Value: assignments and lookups on type nodes
/// - Category: framing and length accounting of the category stream
/// - Precondition: document-level operations invoked in the wrong state
/// - Context: `InField` / `InCategory` wrap an inner error with its location
#[derive(Debug, Error)]
pub enum Error {
    /// Bit I/O operation failed (e.g., source exhausted, misaligned access)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// A value assignment or lookup on a node was rejected
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A category payload could not be framed or did not match its length
    #[error("category error: {0}")]
    Category(#[from] CategoryError),

    /// The document is not in a state that allows the operation
    #[error("precondition failed: {0}")]
    Precondition(&'static str),

    /// An error raised while processing a named field or sequence element
    #[error("in field `{field}`: {source}")]
    InField {
        field: String,
        #[source]
        source: Box<Error>,
    },

    /// An error raised while processing a category payload
    #[error("in {category} category (tag {tag:#06x}): {source}")]
    InCategory {
        category: &'static str,
        tag: u16,
        #[source]
        source: Box<Error>,
    },

    /// Byte source or sink failure other than running out of data
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bit-level I/O errors.
#[derive(Debug, Error)]
pub enum BitIoError {
    /// The source ran out before the requested bits or bytes were available
    #[error("unexpected end of data")]
    OutOfData,

    /// A byte-level access was attempted while the stream is mid-byte
    #[error("byte access while not byte aligned ({pending} bits pending)")]
    Misaligned { pending: u8 },

    /// Bit count outside 1..=64
    #[error("invalid bit count: {0} (must be 1..=64)")]
    InvalidBitCount(usize),
}

/// Errors raised by node assignments and lookups.
#[derive(Debug, Error)]
pub enum ValueError {
    /// Integer assignment outside the declared bounds
    #[error("value {value} out of range {min}..={max}")]
    OutOfRange { value: u64, min: u64, max: u64 },

    /// Integer assignment that cannot be represented in the node's width
    #[error("value {value:#x} does not fit in {bits} bits")]
    TooWide { value: u64, bits: u8 },

    /// Enumeration assignment with a label outside its label set
    #[error("`{label}` is not a valid label (expected one of: {expected})")]
    InvalidLabel { label: String, expected: String },

    /// String content longer than one length-prefix byte can describe
    #[error("string of {len} bytes exceeds the 255 byte limit")]
    StringTooLong { len: usize },

    /// Self-describing sequence with more elements than its count byte holds
    #[error("sequence of {len} elements exceeds the 255 element limit")]
    TooManyElements { len: usize },

    /// Fixed-count sequence holding a different number of elements
    #[error("sequence holds {actual} elements, expected exactly {expected}")]
    CountMismatch { expected: usize, actual: usize },

    /// Lookup of a field or element that does not exist
    #[error("no field named `{0}`")]
    FieldNotFound(String),

    /// Record built with a name reserved for the decode/encode operations
    #[error("`{0}` is a reserved field name")]
    ReservedFieldName(String),

    /// Record built with the same field name twice
    #[error("duplicate field name `{0}`")]
    DuplicateField(String),

    /// Open-ended sequence whose element decoded without consuming input
    #[error("sequence element consumes no input")]
    EmptyElement,

    /// Operation applied to a node of the wrong kind
    #[error("expected {expected} node, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
}

/// Category framing errors.
#[derive(Debug, Error)]
pub enum CategoryError {
    /// The decoder left more bytes unconsumed than the category tolerates
    #[error("{category} payload malformed: {leftover} unconsumed bytes (at most {allowed} tolerated)")]
    Malformed {
        category: &'static str,
        leftover: usize,
        allowed: usize,
    },

    /// Encoded payload too large for the 16-bit word count
    #[error("payload of {len} bytes for tag {tag:#06x} exceeds the category length field")]
    PayloadTooLong { tag: u16, len: usize },
}

/// Coarse classification of an [`Error`], independent of context wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfData,
    Alignment,
    InvalidArgument,
    OutOfRange,
    MalformedCategory,
    PreconditionFailed,
    NotFound,
    Io,
}

impl Error {
    /// Wrap this error with the name of the field or element being processed.
    pub fn in_field(self, field: impl Into<String>) -> Self {
        Error::InField {
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// Wrap this error with the category being processed.
    pub fn in_category(self, category: &'static str, tag: u16) -> Self {
        Error::InCategory {
            category,
            tag,
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context wrappers removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::InField { source, .. } | Error::InCategory { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classify this error, looking through context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InField { source, .. } | Error::InCategory { source, .. } => source.kind(),
            Error::BitIo(BitIoError::OutOfData) => ErrorKind::OutOfData,
            Error::BitIo(BitIoError::Misaligned { .. }) => ErrorKind::Alignment,
            Error::BitIo(BitIoError::InvalidBitCount(_)) => ErrorKind::InvalidArgument,
            Error::Value(ValueError::OutOfRange { .. })
            | Error::Value(ValueError::TooWide { .. })
            | Error::Value(ValueError::StringTooLong { .. })
            | Error::Value(ValueError::TooManyElements { .. })
            | Error::Category(CategoryError::PayloadTooLong { .. }) => ErrorKind::OutOfRange,
            Error::Value(ValueError::FieldNotFound(_)) => ErrorKind::NotFound,
            Error::Value(_) => ErrorKind::InvalidArgument,
            Error::Category(CategoryError::Malformed { .. }) => ErrorKind::MalformedCategory,
            Error::Precondition(_) => ErrorKind::PreconditionFailed,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Shorthand for `self.kind() == ErrorKind::OutOfData`.
    pub fn is_out_of_data(&self) -> bool {
        self.kind() == ErrorKind::OutOfData
    }
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
