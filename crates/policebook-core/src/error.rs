//! Error types for the policebook-core library.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for the policebook library.
#[derive(Error, Debug)]
pub enum BookError {
    /// A receipt could not be turned into a record.
    #[error(transparent)]
    Document(#[from] DocumentDefect),

    /// Directory listing or file access failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Workbook generation failed.
    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Sequence numbers starting at `start` do not fit in a `u32`.
    #[error("sequence numbers starting at {start} overflow after {records} records")]
    SequenceOverflow { start: u32, records: usize },
}

impl BookError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while turning a document into text fragments.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Reading the document failed.
    #[error("failed to read document: {0}")]
    Io(#[from] io::Error),

    /// The PDF could not be parsed or decoded.
    #[error("failed to parse PDF: {0}")]
    Pdf(String),

    /// The PDF has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// The requested page does not exist.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// Extraction did not finish within the configured timeout.
    #[error("extraction timed out after {0:?}")]
    TimedOut(Duration),

    /// The blocking extraction task panicked or was cancelled.
    #[error("extraction task failed: {0}")]
    Join(String),
}

impl ExtractionError {
    /// Whether retrying the same document may succeed. A timed-out
    /// extraction still occupies its blocking thread and is not retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

impl From<lopdf::Error> for ExtractionError {
    fn from(err: lopdf::Error) -> Self {
        Self::Pdf(err.to_string())
    }
}

/// Errors raised by the receipt parser. Each names the rule that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A literal marker is missing from the fragment sequence.
    #[error("anchor not found: {anchor:?}")]
    AnchorNotFound { anchor: &'static str },

    /// The date/time line does not have the expected shape.
    #[error("malformed date/time line {line:?}: {reason}")]
    MalformedDateTime { line: String, reason: String },

    /// A field index is outside the trimmed fragment block.
    #[error("no fragment at index {index} for {field} ({available} fragments in block)")]
    InsufficientFragments {
        field: &'static str,
        index: usize,
        available: usize,
    },

    /// The SIREN/SIRET failed its checksum.
    #[error("invalid SIREN/SIRET {value:?}")]
    InvalidTaxId { value: String },
}

/// Failure of a single receipt, before the path is attached.
#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A receipt that could not be processed, with the document it came from.
#[derive(Error, Debug)]
#[error("{}: {error}", path.display())]
pub struct DocumentDefect {
    /// Offending document.
    pub path: PathBuf,
    /// What went wrong.
    #[source]
    pub error: ReceiptError,
}

impl DocumentDefect {
    pub fn new(path: impl Into<PathBuf>, error: impl Into<ReceiptError>) -> Self {
        Self {
            path: path.into(),
            error: error.into(),
        }
    }
}

/// Result type for the policebook library.
pub type Result<T> = std::result::Result<T, BookError>;
