//! Receipt parser assembling a purchase record from the field rules.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::models::record::PurchaseRecord;

use super::rules::{
    BuyerRule, EntryDateTimeRule, FieldRule, OrderingPolicy, ReceiptBlock, RegistrationRule,
    VinRule,
};
use super::Result;

/// Parser for the page-1 fragments of one SIV purchase receipt.
#[derive(Debug, Clone, Default)]
pub struct ReceiptParser {
    /// How the ordering key is derived.
    ordering: OrderingPolicy,
    /// Whether to validate SIREN checksums.
    validate_siren: bool,
}

impl ReceiptParser {
    /// Create a parser with the compatible ordering key and no SIREN check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ordering policy.
    pub fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    /// Set SIREN validation.
    pub fn with_siren_validation(mut self, validate: bool) -> Self {
        self.validate_siren = validate;
        self
    }

    /// Parse one receipt. Pure over `fragments`.
    pub fn parse(&self, fragments: &[String]) -> Result<PurchaseRecord> {
        let block = ReceiptBlock::locate(fragments)?;
        debug!(
            "Receipt block: {} of {} fragments",
            block.len(),
            fragments.len()
        );
        trace!("Block fragments: {:?}", block.fragments());

        let entry = EntryDateTimeRule::new(self.ordering).apply(&block)?;
        let buyer = BuyerRule::new()
            .with_siren_validation(self.validate_siren)
            .apply(&block)?;
        let registration_number = RegistrationRule.apply(&block)?;
        let vin = VinRule.apply(&block)?;

        Ok(PurchaseRecord {
            entry_date: entry.date,
            entry_time: entry.time,
            buyer,
            registration_number,
            vin,
            source: PathBuf::new(),
            ordering_key: entry.ordering_key,
        })
    }
}
