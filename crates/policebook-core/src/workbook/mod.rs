//! Year workbook output.

mod writer;

pub use writer::WorkbookWriter;

/// Column headers, in column order.
pub const HEADERS: [&str; 7] = [
    "NUMÉRO D'ORDRE",
    "DATE D'ENTRÉE",
    "HEURE",
    "NOM / RAISON SOCIALE",
    "SIREN",
    "IMMATRICULATION",
    "VIN",
];

/// Column widths in characters, in column order.
pub const COLUMN_WIDTHS: [f64; 7] = [16.0, 13.0, 6.0, 36.0, 10.0, 17.0, 20.0];
