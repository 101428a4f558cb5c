//! Field rules for SIV purchase receipts.
//!
//! The receipt has no explicit schema: fields are found from literal anchors
//! and fixed offsets inside the buyer block. Each field is read by one rule,
//! and every rule fails with a [`ParseError`] naming what it expected.

pub mod datetime;
pub mod fields;
pub mod patterns;
pub mod siren;

pub use datetime::{calendar_date, EntryDateTime, EntryDateTimeRule, OrderingPolicy};
pub use fields::{BuyerRule, RegistrationRule, VinRule};
pub use patterns::*;
pub use siren::{format_siren, validate_siren};

use crate::error::ParseError;

/// Trait for field rules.
pub trait FieldRule {
    /// The type of value this rule produces.
    type Output;

    /// Field name reported in errors.
    const FIELD: &'static str;

    /// Read the field from the trimmed block.
    fn apply(&self, block: &ReceiptBlock<'_>) -> Result<Self::Output, ParseError>;
}

/// The fragments between the SIREN/SIRET label and the purchase date line.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptBlock<'a> {
    fragments: &'a [String],
}

impl<'a> ReceiptBlock<'a> {
    /// Wrap an already trimmed block.
    pub fn new(fragments: &'a [String]) -> Self {
        Self { fragments }
    }

    /// Cut the buyer block out of a full page of fragments.
    ///
    /// Everything up to and including the last [`BLOCK_START`] is dropped,
    /// then everything after the first fragment containing [`BLOCK_END`].
    pub fn locate(page: &'a [String]) -> Result<Self, ParseError> {
        let start = page
            .iter()
            .rposition(|f| f == BLOCK_START)
            .ok_or(ParseError::AnchorNotFound {
                anchor: BLOCK_START,
            })?;
        let rest = &page[start + 1..];

        let end = rest
            .iter()
            .position(|f| f.contains(BLOCK_END))
            .ok_or(ParseError::AnchorNotFound { anchor: BLOCK_END })?;

        Ok(Self::new(&rest[..=end]))
    }

    pub(crate) fn len(&self) -> usize {
        self.fragments.len()
    }

    pub(crate) fn fragments(&self) -> &'a [String] {
        self.fragments
    }

    /// Fragment at `index`, or an error naming `field`.
    pub fn get(&self, field: &'static str, index: usize) -> Result<&'a str, ParseError> {
        self.fragments
            .get(index)
            .map(String::as_str)
            .ok_or(ParseError::InsufficientFragments {
                field,
                index,
                available: self.fragments.len(),
            })
    }

    /// Fragment `back` positions from the end (0 is the last one).
    pub fn from_end(&self, field: &'static str, back: usize) -> Result<&'a str, ParseError> {
        match self.fragments.len().checked_sub(back + 1) {
            Some(index) => self.get(field, index),
            None => Err(ParseError::InsufficientFragments {
                field,
                index: back,
                available: self.fragments.len(),
            }),
        }
    }

    pub fn last(&self, field: &'static str) -> Result<&'a str, ParseError> {
        self.from_end(field, 0)
    }

    /// Index of the first fragment exactly equal to `label`.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.fragments.iter().position(|f| f == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_locate_uses_last_start_anchor() {
        let page = strings(&[
            "N° SIREN/SIRET :",
            "seller",
            "N° SIREN/SIRET :",
            "DUPONT",
            "Jean",
            "Date et heure de l'achat : 01/06/2021 à 14h30",
            "footer",
        ]);

        let block = ReceiptBlock::locate(&page).unwrap();
        assert_eq!(
            block.fragments(),
            &page[3..6],
        );
    }

    #[test]
    fn test_locate_missing_start() {
        let page = strings(&["DUPONT", "Date et heure de l'achat : 01/06/2021 à 14h30"]);
        assert_eq!(
            ReceiptBlock::locate(&page).unwrap_err(),
            ParseError::AnchorNotFound {
                anchor: BLOCK_START
            }
        );
    }

    #[test]
    fn test_locate_end_must_follow_start() {
        let page = strings(&[
            "Date et heure de l'achat : 01/06/2021 à 14h30",
            "N° SIREN/SIRET :",
            "DUPONT",
        ]);
        assert_eq!(
            ReceiptBlock::locate(&page).unwrap_err(),
            ParseError::AnchorNotFound { anchor: BLOCK_END }
        );
    }

    #[test]
    fn test_from_end_bounds() {
        let fragments = strings(&["only"]);
        let block = ReceiptBlock::new(&fragments);

        assert_eq!(block.last("x").unwrap(), "only");
        assert!(matches!(
            block.from_end("vin", 1),
            Err(ParseError::InsufficientFragments { field: "vin", available: 1, .. })
        ));
    }
}
