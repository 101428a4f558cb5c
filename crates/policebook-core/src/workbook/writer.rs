//! Workbook writer using rust_xlsxwriter.

use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::{debug, info};

use super::{COLUMN_WIDTHS, HEADERS};
use crate::error::{BookError, Result};
use crate::ledger::{MonthSheet, YearLedger};
use crate::models::record::SequencedPurchase;

/// Writes one workbook per year, one protected worksheet per month.
#[derive(Debug, Clone, Default)]
pub struct WorkbookWriter {
    password: Option<String>,
}

impl WorkbookWriter {
    /// Writer with plain, password-less sheet protection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Protect worksheets with `password`.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    /// Write `ledger` to `path`.
    pub fn write(&self, ledger: &YearLedger, path: &Path) -> Result<()> {
        let mut workbook = self.build(ledger)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BookError::io(parent, e))?;
        }
        workbook.save(path)?;

        info!(
            "{} written ({} sheets, {} rows)",
            path.display(),
            ledger.months.len(),
            ledger.record_count()
        );
        Ok(())
    }

    /// Write `ledger` to an in-memory xlsx file.
    pub fn write_to_buffer(&self, ledger: &YearLedger) -> Result<Vec<u8>> {
        let mut workbook = self.build(ledger)?;
        Ok(workbook.save_to_buffer()?)
    }

    fn build(&self, ledger: &YearLedger) -> Result<Workbook> {
        let mut workbook = Workbook::new();

        for month in &ledger.months {
            let worksheet = workbook.add_worksheet();
            self.fill(worksheet, month)?;
            debug!("Sheet {:?}: {} rows", month.label, month.rows.len());
        }

        Ok(workbook)
    }

    fn fill(&self, worksheet: &mut Worksheet, month: &MonthSheet) -> Result<()> {
        worksheet.set_name(&month.label)?;

        for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
            let col = col as u16;
            worksheet.write_string(0, col, *header)?;
            worksheet.set_column_width(col, width)?;
        }

        for (index, row) in month.rows.iter().enumerate() {
            write_row(worksheet, index as u32 + 1, row)?;
        }

        match &self.password {
            Some(password) => worksheet.protect_with_password(password),
            None => worksheet.protect(),
        };

        Ok(())
    }
}

fn write_row(worksheet: &mut Worksheet, row: u32, purchase: &SequencedPurchase) -> Result<()> {
    let record = purchase.record();

    worksheet.write_number(row, 0, f64::from(purchase.sequence_number()))?;
    worksheet.write_string(row, 1, &record.entry_date)?;
    worksheet.write_string(row, 2, &record.entry_time)?;
    worksheet.write_string(row, 3, record.buyer_name())?;
    if let Some(siren) = record.tax_id() {
        worksheet.write_string(row, 4, siren)?;
    }
    worksheet.write_string(row, 5, &record.registration_number)?;
    worksheet.write_string(row, 6, &record.vin)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::PurchaseRecord;
    use crate::receipt::ReceiptParser;
    use calamine::{Data, Reader, Xlsx};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn parse(fragments: &[&str]) -> PurchaseRecord {
        let fragments: Vec<String> = fragments.iter().map(|s| s.to_string()).collect();
        ReceiptParser::new().parse(&fragments).unwrap()
    }

    fn ledger() -> YearLedger {
        let person = parse(&[
            "N° SIREN/SIRET :",
            "MARTIN",
            "Sophie",
            "Adresse :",
            "Numéro d'immatriculation",
            "-",
            "EF-456-GH",
            "VR3UHZKXZLT012345",
            "Date et heure de l'achat : 15/03/2020 à 09h05",
        ]);
        let company = parse(&[
            "N° SIREN/SIRET :",
            "Adresse :",
            "1",
            "2",
            "3",
            "4",
            "5",
            "6",
            "7",
            "732829320",
            "ACME CORP",
            "Numéro d'immatriculation",
            "-",
            "AB-123-CD",
            "VF1AAAAA123456789",
            "Date et heure de l'achat : 02/04/2020 à 17h45",
        ]);

        YearLedger {
            year: "2020".to_string(),
            months: vec![
                MonthSheet {
                    label: "3".to_string(),
                    directory: PathBuf::from("2020/3"),
                    rows: vec![SequencedPurchase::new(41, person)],
                },
                MonthSheet {
                    label: "4".to_string(),
                    directory: PathBuf::from("2020/4"),
                    rows: vec![SequencedPurchase::new(42, company)],
                },
            ],
            defects: Vec::new(),
            next_sequence: 43,
        }
    }

    fn cell(range: &calamine::Range<Data>, row: u32, col: u32) -> Data {
        range.get_value((row, col)).cloned().unwrap_or(Data::Empty)
    }

    #[test]
    fn test_round_trip() {
        let buffer = WorkbookWriter::new()
            .with_password(Some("s3cret".to_string()))
            .write_to_buffer(&ledger())
            .unwrap();

        let mut workbook = Xlsx::new(Cursor::new(buffer)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["3".to_string(), "4".to_string()]);

        let march = workbook.worksheet_range("3").unwrap();
        let headers: Vec<Data> = (0..7).map(|c| cell(&march, 0, c)).collect();
        assert_eq!(
            headers,
            HEADERS
                .iter()
                .map(|h| Data::String(h.to_string()))
                .collect::<Vec<_>>()
        );
        assert_eq!(cell(&march, 1, 0), Data::Float(41.0));
        assert_eq!(cell(&march, 1, 1), Data::String("15/03/2020".to_string()));
        assert_eq!(cell(&march, 1, 2), Data::String("09h05".to_string()));
        assert_eq!(cell(&march, 1, 3), Data::String("MARTIN Sophie".to_string()));
        assert_eq!(cell(&march, 1, 4), Data::Empty);
        assert_eq!(cell(&march, 1, 5), Data::String("EF-456-GH".to_string()));
        assert_eq!(cell(&march, 1, 6), Data::String("VR3UHZKXZLT012345".to_string()));

        let april = workbook.worksheet_range("4").unwrap();
        assert_eq!(cell(&april, 1, 0), Data::Float(42.0));
        assert_eq!(cell(&april, 1, 3), Data::String("ACME CORP".to_string()));
        assert_eq!(cell(&april, 1, 4), Data::String("732829320".to_string()));
    }

    #[test]
    fn test_write_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books").join("2020.xlsx");

        WorkbookWriter::new().write(&ledger(), &path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_invalid_sheet_label() {
        let mut ledger = ledger();
        ledger.months[0].label = "03/2020".to_string();

        let err = WorkbookWriter::new().write_to_buffer(&ledger).unwrap_err();
        assert!(matches!(err, BookError::Workbook(_)));
    }

    #[test]
    fn test_empty_password_means_plain_protection() {
        let writer = WorkbookWriter::new().with_password(Some(String::new()));
        assert!(writer.password.is_none());
    }
}
