//! Positional rules for the buyer, registration plate and VIN.

use super::patterns::{ADDRESS_LABEL, REGISTRATION_LABEL};
use super::siren::validate_siren;
use super::{FieldRule, ReceiptBlock};
use crate::error::ParseError;
use crate::models::record::Buyer;

/// Index of the SIREN in a legal-entity block.
const SIREN_INDEX: usize = 8;
/// Index of the company name in a legal-entity block.
const COMPANY_NAME_INDEX: usize = 9;
/// Distance from the registration label to the plate.
const REGISTRATION_OFFSET: usize = 2;

/// Classifies the buyer and reads its name and SIREN.
///
/// A block opening on the address label belongs to a legal entity. Otherwise
/// the first one or two fragments are the person's name parts.
#[derive(Debug, Default)]
pub struct BuyerRule {
    validate_siren: bool,
}

impl BuyerRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set SIREN checksum validation.
    pub fn with_siren_validation(mut self, validate: bool) -> Self {
        self.validate_siren = validate;
        self
    }
}

impl FieldRule for BuyerRule {
    type Output = Buyer;

    const FIELD: &'static str = "buyer";

    fn apply(&self, block: &ReceiptBlock<'_>) -> Result<Self::Output, ParseError> {
        let first = block.get(Self::FIELD, 0)?;

        if first == ADDRESS_LABEL {
            let siren = block.get("SIREN", SIREN_INDEX)?.trim();
            let name = block.get("company name", COMPANY_NAME_INDEX)?;

            if self.validate_siren && !validate_siren(siren) {
                return Err(ParseError::InvalidTaxId {
                    value: siren.to_string(),
                });
            }

            return Ok(Buyer::LegalEntity {
                name: name.to_string(),
                siren: siren.to_string(),
            });
        }

        let name = match block.fragments().get(1) {
            Some(second) if second != ADDRESS_LABEL => format!("{} {}", first, second),
            _ => first.to_string(),
        };

        Ok(Buyer::NaturalPerson { name })
    }
}

/// Reads the plate two fragments after its label.
#[derive(Debug, Default)]
pub struct RegistrationRule;

impl FieldRule for RegistrationRule {
    type Output = String;

    const FIELD: &'static str = "registration number";

    fn apply(&self, block: &ReceiptBlock<'_>) -> Result<Self::Output, ParseError> {
        let label = block
            .position(REGISTRATION_LABEL)
            .ok_or(ParseError::AnchorNotFound {
                anchor: REGISTRATION_LABEL,
            })?;

        block
            .get(Self::FIELD, label + REGISTRATION_OFFSET)
            .map(str::to_string)
    }
}

/// Reads the VIN, the fragment just before the date line.
#[derive(Debug, Default)]
pub struct VinRule;

impl FieldRule for VinRule {
    type Output = String;

    const FIELD: &'static str = "VIN";

    fn apply(&self, block: &ReceiptBlock<'_>) -> Result<Self::Output, ParseError> {
        block.from_end(Self::FIELD, 1).map(str::to_string)
    }
}
