//! Per-field input validation and normalization.
//!
//! Each parser is total: malformed input comes back as a
//! [`ValidationError`], never a panic. The engine re-prompts the same field
//! on failure and the cursor does not advance.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::model::BankDetails;

/// Affirmative consent tokens (bilingual).
const CONSENT_YES: &[&str] = &[
    "yes", "y", "haan", "haanji", "consent", "agree", "ok", "sure", "accept",
];

/// Negative consent tokens (bilingual).
const CONSENT_NO: &[&str] = &["no", "n", "nah", "na", "stop", "reject"];

/// Applicant name: non-empty after trimming, stored as typed.
pub fn parse_name(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Age in whole years on `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

/// Date of birth in `DD-MM-YYYY`; the resulting age must be 18-75 inclusive.
pub fn parse_date_of_birth(
    input: &str,
    today: NaiveDate,
) -> Result<(NaiveDate, u8), ValidationError> {
    let dob = NaiveDate::parse_from_str(input.trim(), "%d-%m-%Y")
        .map_err(|_| ValidationError::InvalidDate)?;
    let age = age_on(dob, today);
    if !(18..=75).contains(&age) {
        return Err(ValidationError::AgeOutOfRange { age });
    }
    Ok((dob, age as u8))
}

/// Monthly income: thousands separators stripped, positive decimal.
pub fn parse_income(input: &str) -> Result<Decimal, ValidationError> {
    let cleaned = input.replace(',', "");
    let amount: Decimal = cleaned
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidNumber)?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidNumber);
    }
    Ok(amount.round_dp(2))
}

/// Map a free-text consent reply to a boolean; unrecognized text is neither.
pub fn parse_consent(input: &str) -> Option<bool> {
    let candidate = input.trim().to_lowercase();
    if CONSENT_YES.contains(&candidate.as_str()) {
        return Some(true);
    }
    if CONSENT_NO.contains(&candidate.as_str()) {
        return Some(false);
    }
    None
}

/// Bank details: two lines — routing code (IFSC), then account number.
pub fn parse_bank_details(input: &str) -> Result<BankDetails, ValidationError> {
    let mut lines = input.lines().map(str::trim).filter(|l| !l.is_empty());
    let ifsc = lines.next().ok_or(ValidationError::InvalidBankDetails)?;
    let account_number = lines.next().ok_or(ValidationError::InvalidBankDetails)?;
    Ok(BankDetails {
        ifsc: ifsc.to_uppercase(),
        account_number: account_number.to_string(),
    })
}

/// Pick an option by button index, clamping out-of-range to the first.
pub fn pick_option<'a>(options: &'a [&'a str], index: usize) -> &'a str {
    options.get(index).copied().unwrap_or(options[0])
}

/// Title-case free text: uppercase each letter that follows a non-letter.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_is_letter = false;
    for ch in input.trim().chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

/// Capitalize the first letter, lowercase the rest.
pub fn capitalize(input: &str) -> String {
    let trimmed = input.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn name_trims_and_rejects_empty() {
        assert_eq!(parse_name("  Asha Rao  ").unwrap(), "Asha Rao");
        assert_eq!(parse_name("   "), Err(ValidationError::EmptyName));
    }

    #[test]
    fn age_is_deterministic_for_fixed_today() {
        let today = date(2024, 6, 15);
        assert_eq!(age_on(date(1995, 12, 31), today), 28);
        assert_eq!(age_on(date(2000, 6, 15), today), 24);
        assert_eq!(age_on(date(2000, 6, 16), today), 23);
    }

    #[test]
    fn dob_parses_day_month_year() {
        let today = date(2024, 6, 15);
        let (dob, age) = parse_date_of_birth("31-12-1995", today).unwrap();
        assert_eq!(dob, date(1995, 12, 31));
        assert_eq!(age, 28);
    }

    #[test]
    fn dob_rejects_malformed_input() {
        let today = date(2024, 6, 15);
        for input in ["1995-12-31", "31/12/1995", "tomorrow", "32-01-1995"] {
            assert_eq!(
                parse_date_of_birth(input, today),
                Err(ValidationError::InvalidDate),
                "{input} should be invalid"
            );
        }
    }

    #[test]
    fn dob_rejects_age_out_of_range() {
        let today = date(2024, 6, 15);
        assert_eq!(
            parse_date_of_birth("16-06-2006", today),
            Err(ValidationError::AgeOutOfRange { age: 17 })
        );
        assert_eq!(
            parse_date_of_birth("01-01-1940", today),
            Err(ValidationError::AgeOutOfRange { age: 84 })
        );
        // Boundary ages are accepted.
        assert!(parse_date_of_birth("15-06-2006", today).is_ok());
        assert!(parse_date_of_birth("16-06-1949", today).is_ok());
    }

    #[test]
    fn income_strips_separators_and_requires_positive() {
        assert_eq!(parse_income("45,000").unwrap(), dec!(45000));
        assert_eq!(parse_income(" 45000.505 ").unwrap(), dec!(45000.50));
        assert_eq!(parse_income("abc"), Err(ValidationError::InvalidNumber));
        assert_eq!(parse_income("0"), Err(ValidationError::InvalidNumber));
        assert_eq!(parse_income("-500"), Err(ValidationError::InvalidNumber));
    }

    #[test]
    fn consent_synonyms_map_both_ways() {
        for yes in ["yes", "Y", "Haan", "agree", "OK", "accept"] {
            assert_eq!(parse_consent(yes), Some(true), "{yes}");
        }
        for no in ["no", "N", "nah", "STOP", "reject"] {
            assert_eq!(parse_consent(no), Some(false), "{no}");
        }
        assert_eq!(parse_consent("maybe later"), None);
    }

    #[test]
    fn bank_details_need_two_lines() {
        let details = parse_bank_details("hdfc0001234\n50100012345678").unwrap();
        assert_eq!(details.ifsc, "HDFC0001234");
        assert_eq!(details.account_number, "50100012345678");
        assert_eq!(
            parse_bank_details("HDFC0001234"),
            Err(ValidationError::InvalidBankDetails)
        );
    }

    #[test]
    fn option_index_clamps_to_first() {
        let options = ["Salaried", "Self-Employed", "Others"];
        assert_eq!(pick_option(&options, 1), "Self-Employed");
        assert_eq!(pick_option(&options, 9), "Salaried");
    }

    #[test]
    fn free_text_normalizers() {
        assert_eq!(title_case("self-employed"), "Self-Employed");
        assert_eq!(title_case("  software engineer "), "Software Engineer");
        assert_eq!(capitalize("home renovation"), "Home renovation");
        assert_eq!(capitalize("TRAVEL"), "Travel");
    }
}
