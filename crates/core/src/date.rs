//! Day/month/year date handling for user-entered dates (membership expiry).
//!
//! Input is `dd/mm/yyyy`. The constructed calendar date must round-trip
//! exactly: `31/02/2026` is rejected instead of being clamped.

use chrono::{Datelike, NaiveDate};

use crate::error::{DomainError, DomainResult};

/// Parse a `dd/mm/yyyy` date.
pub fn parse_uk_date(input: &str) -> DomainResult<NaiveDate> {
    let raw = input.trim();
    let parts: Vec<&str> = raw.split('/').collect();

    let well_formed = parts.len() == 3
        && parts[0].len() == 2
        && parts[1].len() == 2
        && parts[2].len() == 4
        && parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit()));
    if !well_formed {
        return Err(DomainError::validation("Date must be in dd/mm/yyyy format."));
    }

    let day: u32 = parts[0].parse().map_err(|_| DomainError::validation("Invalid date."))?;
    let month: u32 = parts[1].parse().map_err(|_| DomainError::validation("Invalid date."))?;
    let year: i32 = parts[2].parse().map_err(|_| DomainError::validation("Invalid date."))?;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DomainError::validation("Invalid date."))?;

    if date.day() != day || date.month() != month || date.year() != year {
        return Err(DomainError::validation("Invalid date."));
    }

    Ok(date)
}

/// Parse an optional `dd/mm/yyyy` date; blank input means "no date".
pub fn parse_uk_date_opt(input: Option<&str>) -> DomainResult<Option<NaiveDate>> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_uk_date(raw).map(Some),
    }
}

/// Format a date back into `dd/mm/yyyy`.
pub fn format_uk_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_a_real_calendar_date() {
        let date = parse_uk_date("28/02/2026").unwrap();
        assert_eq!(date.day(), 28);
        assert_eq!(date.month(), 2);
        assert_eq!(date.year(), 2026);
    }

    #[test]
    fn rejects_day_overflow() {
        let err = parse_uk_date("31/02/2026").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_leap_day_in_common_year() {
        assert!(parse_uk_date("29/02/2026").is_err());
        assert!(parse_uk_date("29/02/2028").is_ok());
    }

    #[test]
    fn rejects_wrong_shape() {
        for raw in ["2026-02-28", "1/2/2026", "28/02/26", "aa/bb/cccc", "28/02/2026/1"] {
            let err = parse_uk_date(raw).unwrap_err();
            assert!(err.to_string().contains("dd/mm/yyyy"), "{raw}");
        }
    }

    #[test]
    fn blank_optional_input_is_none() {
        assert_eq!(parse_uk_date_opt(None).unwrap(), None);
        assert_eq!(parse_uk_date_opt(Some("   ")).unwrap(), None);
        assert!(parse_uk_date_opt(Some("01/13/2026")).is_err());
    }

    proptest! {
        /// Whatever is accepted formats back to exactly the input.
        #[test]
        fn accepted_dates_reformat_to_input(day in 0u32..40, month in 0u32..15, year in 1900i32..2100) {
            let raw = format!("{day:02}/{month:02}/{year:04}");
            match parse_uk_date(&raw) {
                Ok(date) => prop_assert_eq!(format_uk_date(date), raw),
                Err(_) => prop_assert!(NaiveDate::from_ymd_opt(year, month, day).is_none()),
            }
        }
    }
}
