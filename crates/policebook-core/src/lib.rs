//! Core library for building SIV police books.
//!
//! This crate provides:
//! - Page-1 text fragment extraction from receipt PDFs
//! - SIV purchase receipt parsing into purchase records
//! - Month and year aggregation with sequence numbering
//! - Protected xlsx workbook output, one worksheet per month

pub mod error;
pub mod ledger;
pub mod models;
pub mod pdf;
pub mod receipt;
pub mod workbook;

pub use error::{BookError, DocumentDefect, ExtractionError, ParseError, ReceiptError, Result};
pub use ledger::{
    FailurePolicy, MonthAggregator, MonthOutcome, MonthSheet, SheetLabels, YearAggregator,
    YearLedger,
};
pub use models::config::PolicebookConfig;
pub use models::record::{Buyer, PurchaseRecord, SequencedPurchase};
pub use pdf::{FragmentMode, FragmentSource, PdfFragmentExtractor};
pub use receipt::{OrderingPolicy, ReceiptParser};
pub use workbook::WorkbookWriter;
