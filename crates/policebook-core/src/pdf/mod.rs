//! PDF fragment extraction module.

mod extractor;

pub use extractor::PdfFragmentExtractor;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// How page text is split into fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentMode {
    /// One fragment per text-showing operator of the content stream.
    #[default]
    Operators,
    /// One fragment per line of the pdf-extract text layout.
    Lines,
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Source of the ordered page-1 text fragments of a document.
///
/// Implementations are called from the blocking pool and must release any
/// document resources before returning.
pub trait FragmentSource: Send + Sync {
    /// Text fragments of page 1, in reading order.
    fn fragments(&self, path: &Path) -> Result<Vec<String>>;
}
