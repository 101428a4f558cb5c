//! Purchase records extracted from SIV receipts.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::receipt::rules::datetime::calendar_date;

/// The buyer named on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Buyer {
    /// A private individual.
    NaturalPerson { name: String },
    /// A registered company, identified by its SIREN/SIRET.
    LegalEntity { name: String, siren: String },
}

impl Buyer {
    /// Name or company name, as printed in the book.
    pub fn name(&self) -> &str {
        match self {
            Self::NaturalPerson { name } | Self::LegalEntity { name, .. } => name,
        }
    }

    /// Business identifier, only for legal entities.
    pub fn siren(&self) -> Option<&str> {
        match self {
            Self::NaturalPerson { .. } => None,
            Self::LegalEntity { siren, .. } => Some(siren),
        }
    }

    pub fn is_legal_entity(&self) -> bool {
        matches!(self, Self::LegalEntity { .. })
    }
}

/// One vehicle purchase, i.e. one row of the police book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Entry date as printed (`DD/MM/YYYY`).
    pub entry_date: String,

    /// Entry time as printed (`HHhMM`).
    pub entry_time: String,

    /// Buyer identity.
    pub buyer: Buyer,

    /// Vehicle registration plate.
    pub registration_number: String,

    /// Vehicle identification number.
    pub vin: String,

    /// Document the record was read from.
    #[serde(default, skip_serializing_if = "path_is_empty")]
    pub source: PathBuf,

    #[serde(skip)]
    pub(crate) ordering_key: NaiveDateTime,
}

fn path_is_empty(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

impl PurchaseRecord {
    /// Key used to order records within a month. Not a displayable date.
    pub fn ordering_key(&self) -> NaiveDateTime {
        self.ordering_key
    }

    /// Entry date parsed as a real calendar date, when it is one.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        calendar_date(&self.entry_date)
    }

    pub fn buyer_name(&self) -> &str {
        self.buyer.name()
    }

    pub fn tax_id(&self) -> Option<&str> {
        self.buyer.siren()
    }

    /// Attach the source document path.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }
}

/// A record with its order number. Numbered records are immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencedPurchase {
    sequence_number: u32,
    #[serde(flatten)]
    record: PurchaseRecord,
}

impl SequencedPurchase {
    pub(crate) fn new(sequence_number: u32, record: PurchaseRecord) -> Self {
        Self {
            sequence_number,
            record,
        }
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn record(&self) -> &PurchaseRecord {
        &self.record
    }
}
