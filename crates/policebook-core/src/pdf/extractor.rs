//! Page-1 text fragment extraction using lopdf and pdf-extract.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, Object};
use tracing::{debug, trace, warn};

use super::{FragmentMode, FragmentSource, Result};
use crate::error::ExtractionError;

/// Receipts are single-page documents.
const RECEIPT_PAGE: u32 = 1;

/// TJ displacement (thousandths of text space) treated as a word gap.
const WORD_GAP: f32 = -100.0;

/// Fragment extractor for receipt PDFs.
#[derive(Debug, Clone, Default)]
pub struct PdfFragmentExtractor {
    mode: FragmentMode,
}

impl PdfFragmentExtractor {
    /// Create an extractor reading content-stream operators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fragment mode.
    pub fn with_mode(mut self, mode: FragmentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Extract page-1 fragments from PDF bytes.
    pub fn fragments_from_mem(&self, data: &[u8]) -> Result<Vec<String>> {
        let (doc, raw) = load(data)?;

        let fragments = match self.mode {
            FragmentMode::Operators => operator_fragments(&doc, RECEIPT_PAGE)?,
            FragmentMode::Lines => {
                drop(doc);
                line_fragments(&raw)?
            }
        };

        debug!("Extracted {} fragments ({:?})", fragments.len(), self.mode);
        Ok(fragments)
    }
}

impl FragmentSource for PdfFragmentExtractor {
    fn fragments(&self, path: &Path) -> Result<Vec<String>> {
        let data = std::fs::read(path)?;
        self.fragments_from_mem(&data)
    }
}

/// Load a PDF, decrypting empty-password documents.
fn load(data: &[u8]) -> Result<(Document, Cow<'_, [u8]>)> {
    let mut doc = Document::load_mem(data)?;

    let raw = if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(ExtractionError::Pdf("PDF is encrypted".to_string()));
        }
        debug!("Decrypted PDF with empty password");

        // pdf-extract needs the decrypted bytes
        let mut decrypted = Vec::new();
        doc.save_to(&mut decrypted)
            .map_err(|e| ExtractionError::Pdf(format!("failed to save decrypted PDF: {}", e)))?;
        Cow::Owned(decrypted)
    } else {
        Cow::Borrowed(data)
    };

    if doc.get_pages().is_empty() {
        return Err(ExtractionError::NoPages);
    }

    Ok((doc, raw))
}

/// One fragment per `Tj`, `TJ`, `'` and `"` operation, in stream order.
fn operator_fragments(doc: &Document, page: u32) -> Result<Vec<String>> {
    let pages = doc.get_pages();
    let page_id = *pages.get(&page).ok_or(ExtractionError::InvalidPage(page))?;

    let encodings: BTreeMap<Vec<u8>, _> = doc
        .get_page_fonts(page_id)?
        .into_iter()
        .filter_map(|(name, font)| match font.get_font_encoding(doc) {
            Ok(encoding) => Some((name, encoding)),
            Err(e) => {
                warn!("No encoding for font {}: {}", String::from_utf8_lossy(&name), e);
                None
            }
        })
        .collect();

    let content = Content::decode(&doc.get_page_content(page_id)?)?;

    let mut fragments = Vec::new();
    let mut current_font: Option<Vec<u8>> = None;

    for operation in &content.operations {
        let shown = match operation.operator.as_str() {
            "Tf" => {
                current_font = operation
                    .operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .map(<[u8]>::to_vec);
                continue;
            }
            "Tj" | "'" => operation.operands.first(),
            "\"" => operation.operands.get(2),
            "TJ" => operation.operands.first(),
            _ => continue,
        };

        let Some(shown) = shown else {
            continue;
        };

        let decode = |bytes: &[u8]| -> String {
            let encoding = current_font.as_ref().and_then(|f| encodings.get(f));
            match encoding.map(|e| Document::decode_text(e, bytes)) {
                Some(Ok(text)) => text,
                _ => decode_fallback(bytes),
            }
        };

        let mut text = String::new();
        collect_text(shown, &decode, &mut text);

        trace!("{} -> {:?}", operation.operator, text);
        if !text.trim().is_empty() {
            fragments.push(text);
        }
    }

    Ok(fragments)
}

fn collect_text(operand: &Object, decode: &dyn Fn(&[u8]) -> String, text: &mut String) {
    match operand {
        Object::String(bytes, _) => text.push_str(&decode(bytes)),
        Object::Array(items) => {
            for item in items {
                collect_text(item, decode, text);
            }
        }
        Object::Integer(i) if (*i as f32) < WORD_GAP => text.push(' '),
        Object::Real(r) if (*r as f32) < WORD_GAP => text.push(' '),
        _ => {}
    }
}

/// UTF-16BE with BOM, otherwise Latin-1.
fn decode_fallback(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// One fragment per non-empty line of the first page.
fn line_fragments(raw: &[u8]) -> Result<Vec<String>> {
    let text = pdf_extract::extract_text_from_mem(raw)
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    let first_page = text.split('\u{c}').next().unwrap_or_default();

    Ok(first_page
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
