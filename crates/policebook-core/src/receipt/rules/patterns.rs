//! Literal anchors and regex patterns of the SIV purchase receipt.

use lazy_static::lazy_static;
use regex::Regex;

/// Label preceding the buyer block. The block starts after its last occurrence.
pub const BLOCK_START: &str = "N° SIREN/SIRET :";

/// Phrase of the fragment closing the block; that fragment carries the date and time.
pub const BLOCK_END: &str = "Date et heure de l'achat";

/// Address label. As the first fragment of the block it marks a legal entity.
pub const ADDRESS_LABEL: &str = "Adresse :";

/// Label two fragments before the registration plate.
pub const REGISTRATION_LABEL: &str = "Numéro d'immatriculation";

lazy_static! {
    // Entry date as printed, DD/MM/YYYY (DD/MM/YY tolerated)
    pub static ref ENTRY_DATE: Regex = Regex::new(
        r"^(\d{2})/(\d{2})/(\d{4}|\d{2})$"
    ).unwrap();

    // Entry time as printed, e.g. 14h30
    pub static ref ENTRY_TIME: Regex = Regex::new(
        r"^(\d{2})h(\d{2})$"
    ).unwrap();

    // SIREN (9 digits) or SIRET (14 digits), spaces allowed between groups
    pub static ref SIREN_SIRET: Regex = Regex::new(
        r"^\d{3} ?\d{3} ?\d{3}(?: ?\d{5})?$"
    ).unwrap();
}
