//! Entry date/time extraction and the within-month ordering key.

use chrono::{Days, Months, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::patterns::{ENTRY_DATE, ENTRY_TIME};
use super::{FieldRule, ReceiptBlock};
use crate::error::ParseError;

/// Character range of the date on the date/time line.
const DATE_CHARS: (usize, usize) = (27, 37);
/// Character range of the time on the date/time line.
const TIME_CHARS: (usize, usize) = (40, 45);

/// How the ordering key of a record is derived from its entry date and time.
///
/// `Compatible` reproduces the historical key: a two-digit year is read as
/// 19xx, and the month number is applied as a zero-based month index, so
/// every key lands one month late (December rolls into January of the next
/// year). Relative order inside a month directory is the same as the calendar
/// order except across that December boundary. `Calendar` uses the real date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    #[default]
    Compatible,
    Calendar,
}

/// Entry date and time as printed, plus the ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDateTime {
    pub date: String,
    pub time: String,
    pub ordering_key: NaiveDateTime,
}

/// Reads the date and time from the last fragment of the block.
pub struct EntryDateTimeRule {
    policy: OrderingPolicy,
}

impl EntryDateTimeRule {
    pub fn new(policy: OrderingPolicy) -> Self {
        Self { policy }
    }
}

impl Default for EntryDateTimeRule {
    fn default() -> Self {
        Self::new(OrderingPolicy::default())
    }
}

impl FieldRule for EntryDateTimeRule {
    type Output = EntryDateTime;

    const FIELD: &'static str = "entry date/time";

    fn apply(&self, block: &ReceiptBlock<'_>) -> Result<Self::Output, ParseError> {
        let line = block.last(Self::FIELD)?;
        let malformed = |reason: String| ParseError::MalformedDateTime {
            line: line.to_string(),
            reason,
        };

        let chars: Vec<char> = line.chars().collect();
        if chars.len() < TIME_CHARS.1 {
            return Err(malformed(format!(
                "expected at least {} characters, found {}",
                TIME_CHARS.1,
                chars.len()
            )));
        }

        let date: String = chars[DATE_CHARS.0..DATE_CHARS.1].iter().collect();
        let date = date.trim().to_string();
        let time: String = chars[TIME_CHARS.0..TIME_CHARS.1].iter().collect();

        let (day, month, year) = split_date(&date)
            .ok_or_else(|| malformed(format!("date {:?} is not DD/MM/YYYY", date)))?;
        let (hour, minute) = split_time(&time)
            .ok_or_else(|| malformed(format!("time {:?} is not HHhMM", time)))?;

        let ordering_key = match self.policy {
            OrderingPolicy::Compatible => compatible_key(year, month, day, hour, minute),
            OrderingPolicy::Calendar => calendar_key(year, month, day, hour, minute),
        }
        .ok_or_else(|| malformed(format!("{} {} is not a valid date and time", date, time)))?;

        Ok(EntryDateTime {
            date,
            time,
            ordering_key,
        })
    }
}

fn split_date(date: &str) -> Option<(u32, u32, i32)> {
    let caps = ENTRY_DATE.captures(date)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?))
}

fn split_time(time: &str) -> Option<(u32, u32)> {
    let caps = ENTRY_TIME.captures(time)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Two-digit year pivot: 00-50 is 20xx, 51-99 is 19xx.
fn pivot_year(year: i32) -> i32 {
    match year {
        0..=50 => 2000 + year,
        51..=99 => 1900 + year,
        _ => year,
    }
}

/// Legacy key: `year < 100` means 19xx, `month` is a zero-based index, and
/// every component overflows into the next larger unit.
fn compatible_key(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    let year = if (0..100).contains(&year) { 1900 + year } else { year };
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?.checked_add_months(Months::new(month))?;

    let date = match day {
        0 => start.checked_sub_days(Days::new(1))?,
        d => start.checked_add_days(Days::new(u64::from(d) - 1))?,
    };

    date.and_hms_opt(0, 0, 0)?.checked_add_signed(
        TimeDelta::hours(i64::from(hour)) + TimeDelta::minutes(i64::from(minute)),
    )
}

fn calendar_key(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(pivot_year(year), month, day)?.and_hms_opt(hour, minute, 0)
}

/// Parse a printed entry date into a calendar date.
pub fn calendar_date(date: &str) -> Option<NaiveDate> {
    let (day, month, year) = split_date(date)?;
    NaiveDate::from_ymd_opt(pivot_year(year), month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_of(line: &str) -> Vec<String> {
        vec!["VF1AAAAA123456789".to_string(), line.to_string()]
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_reads_fixed_offsets() {
        let fragments = block_of("Date et heure de l'achat : 01/06/2021 à 14h30");
        let block = ReceiptBlock::new(&fragments);

        let entry = EntryDateTimeRule::new(OrderingPolicy::Calendar).apply(&block).unwrap();
        assert_eq!(entry.date, "01/06/2021");
        assert_eq!(entry.time, "14h30");
        assert_eq!(entry.ordering_key, at(2021, 6, 1, 14, 30));
    }

    #[test]
    fn test_compatible_key_is_one_month_late() {
        let fragments = block_of("Date et heure de l'achat : 01/06/2021 à 14h30");
        let block = ReceiptBlock::new(&fragments);

        let entry = EntryDateTimeRule::default().apply(&block).unwrap();
        assert_eq!(entry.ordering_key, at(2021, 7, 1, 14, 30));
    }

    #[test]
    fn test_compatible_key_rolls_over() {
        // December is index 12: January of the following year
        assert_eq!(compatible_key(2020, 12, 15, 9, 5), Some(at(2021, 1, 15, 9, 5)));
        // 31 May -> "June 31" -> 1 July
        assert_eq!(compatible_key(2021, 5, 31, 0, 0), Some(at(2021, 7, 1, 0, 0)));
        // Two-digit years are read as 19xx
        assert_eq!(compatible_key(21, 6, 1, 14, 30), Some(at(1921, 7, 1, 14, 30)));
        // Day zero is the last day of the previous month
        assert_eq!(compatible_key(2021, 6, 0, 0, 0), Some(at(2021, 6, 30, 0, 0)));
    }

    #[test]
    fn test_compatible_key_preserves_order_within_month() {
        let early = compatible_key(2021, 3, 2, 8, 0).unwrap();
        let late = compatible_key(2021, 3, 2, 17, 45).unwrap();
        let next_day = compatible_key(2021, 3, 3, 7, 0).unwrap();
        assert!(early < late);
        assert!(late < next_day);
    }

    #[test]
    fn test_calendar_rejects_impossible_dates() {
        let fragments = block_of("Date et heure de l'achat : 31/02/2021 à 14h30");
        let block = ReceiptBlock::new(&fragments);

        let err = EntryDateTimeRule::new(OrderingPolicy::Calendar).apply(&block).unwrap_err();
        assert!(matches!(err, ParseError::MalformedDateTime { .. }));

        // The legacy key tolerates it
        assert!(EntryDateTimeRule::default().apply(&block).is_ok());
    }

    #[test]
    fn test_short_line_is_malformed() {
        let fragments = block_of("Date et heure de l'achat : 01/06/21 à 14h30");
        let block = ReceiptBlock::new(&fragments);

        let err = EntryDateTimeRule::default().apply(&block).unwrap_err();
        match err {
            ParseError::MalformedDateTime { reason, .. } => assert!(reason.contains("45")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let fragments = block_of("Date et heure de l'achat : 2021-06-01 à 14:30");
        let block = ReceiptBlock::new(&fragments);

        let err = EntryDateTimeRule::default().apply(&block).unwrap_err();
        assert!(matches!(err, ParseError::MalformedDateTime { .. }));
    }

    #[test]
    fn test_two_digit_year_padded_line() {
        let fragments = block_of("Date et heure de l'achat : 01/06/21   à 14h30");
        let block = ReceiptBlock::new(&fragments);

        let entry = EntryDateTimeRule::new(OrderingPolicy::Calendar).apply(&block).unwrap();
        assert_eq!(entry.date, "01/06/21");
        assert_eq!(entry.ordering_key, at(2021, 6, 1, 14, 30));
    }

    #[test]
    fn test_calendar_date() {
        assert_eq!(calendar_date("24/12/2019"), NaiveDate::from_ymd_opt(2019, 12, 24));
        assert_eq!(calendar_date("24/12/99"), NaiveDate::from_ymd_opt(1999, 12, 24));
        assert_eq!(calendar_date("32/12/2019"), None);
    }
}
