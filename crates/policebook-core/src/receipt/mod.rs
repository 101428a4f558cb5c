//! SIV receipt parsing.

mod parser;
pub mod rules;

pub use parser::ReceiptParser;
pub use rules::{OrderingPolicy, ReceiptBlock};

use crate::error::ParseError;

/// Result type for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;
