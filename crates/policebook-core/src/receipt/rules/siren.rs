//! SIREN/SIRET (French business identifier) validation.

use super::patterns::SIREN_SIRET;

/// SIREN of La Poste, whose establishments use a digit-sum rule instead of Luhn.
const LA_POSTE_SIREN: &str = "356000000";

/// Validate a SIREN (9 digits) or SIRET (14 digits).
///
/// Both use the Luhn checksum, except La Poste SIRETs which are valid when
/// the sum of their digits is a multiple of 5.
pub fn validate_siren(value: &str) -> bool {
    if !SIREN_SIRET.is_match(value.trim()) {
        return false;
    }

    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();

    let compact: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 14 && compact.starts_with(LA_POSTE_SIREN) {
        return digits.iter().sum::<u32>() % 5 == 0;
    }

    luhn(&digits)
}

fn luhn(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Format a SIREN as `XXX XXX XXX`.
pub fn format_siren(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() != 9 {
        return value.to_string();
    }

    format!("{} {} {}", &digits[0..3], &digits[3..6], &digits[6..9])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_siren_valid() {
        assert!(validate_siren("732829320"));
        assert!(validate_siren("732 829 320")); // With spaces
        assert!(validate_siren("73282932000074")); // SIRET
    }

    #[test]
    fn test_validate_siren_invalid() {
        assert!(!validate_siren("732829321")); // Bad checksum
        assert!(!validate_siren("73282932")); // Too short
        assert!(!validate_siren("ACME CORP"));
    }

    #[test]
    fn test_la_poste_exception() {
        // Digit sum 15, fails Luhn
        assert!(validate_siren("35600000000001"));
        assert!(!validate_siren("35600000000002"));
    }

    #[test]
    fn test_format_siren() {
        assert_eq!(format_siren("732829320"), "732 829 320");
        assert_eq!(format_siren("73282932000074"), "73282932000074");
    }
}
