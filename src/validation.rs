use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// MM/DD/YYYY, both components zero-padded. Anything looser is rejected
/// before we even try to build a date out of it.
static BIRTHDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").unwrap()
});

/// University tokens recognized inside a normalized degree code.
const UNIVERSITIES: [(&str, &str); 3] = [
    ("UGC", "NSBM Green University"),
    ("PLY", "Plymouth University"),
    ("VU", "Victoria University"),
];

/// Degree tokens recognized inside a normalized degree code.
const DEGREES: [(&str, &str); 2] = [
    ("SE", "Software Engineering"),
    ("CS", "Computer Science"),
];

const CODE_MIN_LEN: usize = 5;
const CODE_MAX_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BirthdayError {
    /// Input does not match the MM/DD/YYYY pattern.
    Format,
    /// Pattern matched but the components are not a real calendar date.
    InvalidDate,
}

impl fmt::Display for BirthdayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BirthdayError::Format => {
                write!(f, "❌ Invalid birthday format. Please try again (MM/DD/YYYY).")
            }
            BirthdayError::InvalidDate => write!(f, "❌ Invalid date. Please try again."),
        }
    }
}

pub fn parse_birthday(input: &str) -> Result<NaiveDate, BirthdayError> {
    let caps = BIRTHDAY_RE
        .captures(input.trim())
        .ok_or(BirthdayError::Format)?;

    // The regex guarantees these are short digit runs.
    let month: u32 = caps[1].parse().map_err(|_| BirthdayError::Format)?;
    let day: u32 = caps[2].parse().map_err(|_| BirthdayError::Format)?;
    let year: i32 = caps[3].parse().map_err(|_| BirthdayError::Format)?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or(BirthdayError::InvalidDate)
}

/// A degree code that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeCode {
    /// Normalized form: uppercase, `[A-Z0-9-]` only.
    pub code: String,
    pub university: &'static str,
    pub degree: &'static str,
    /// Always the trailing 2 characters of the normalized code.
    pub group: String,
}

/// Every check that failed for a rejected degree code. Checks are not
/// short-circuited so the user is told about all of them at once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DegreeCodeError {
    pub normalized: String,
    pub bad_length: bool,
    pub unknown_university: bool,
    pub unknown_degree: bool,
}

impl fmt::Display for DegreeCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        if self.bad_length {
            lines.push(format!(
                "❌ The code must be {}-{} characters long.",
                CODE_MIN_LEN, CODE_MAX_LEN
            ));
        }
        if self.unknown_university {
            lines.push("❌ The code does not contain a recognized university.".to_string());
        }
        if self.unknown_degree {
            lines.push("❌ The code does not contain a recognized degree.".to_string());
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// Uppercase and strip everything outside `[A-Z0-9-]`.
pub fn normalize_degree_code(input: &str) -> String {
    input
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

pub fn parse_degree_code(input: &str) -> Result<DegreeCode, DegreeCodeError> {
    let normalized = normalize_degree_code(input);

    let bad_length = normalized.len() < CODE_MIN_LEN || normalized.len() > CODE_MAX_LEN;
    let university = UNIVERSITIES
        .iter()
        .find(|(token, _)| normalized.contains(token))
        .map(|(_, name)| *name);
    let degree = DEGREES
        .iter()
        .find(|(token, _)| normalized.contains(token))
        .map(|(_, name)| *name);

    match (bad_length, university, degree) {
        (false, Some(university), Some(degree)) => {
            let group = normalized[normalized.len() - 2..].to_string();
            Ok(DegreeCode {
                code: normalized,
                university,
                degree,
                group,
            })
        }
        _ => Err(DegreeCodeError {
            normalized,
            bad_length,
            unknown_university: university.is_none(),
            unknown_degree: degree.is_none(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_birthday() {
        let date = parse_birthday("05/20/2000").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2000, 5, 20).unwrap());
    }

    #[test]
    fn rejects_unpadded_birthday() {
        assert_eq!(parse_birthday("5/20/2000"), Err(BirthdayError::Format));
        assert_eq!(parse_birthday("05-20-2000"), Err(BirthdayError::Format));
        assert_eq!(parse_birthday("hello"), Err(BirthdayError::Format));
    }

    #[test]
    fn rejects_impossible_date() {
        assert_eq!(parse_birthday("02/30/2000"), Err(BirthdayError::InvalidDate));
        assert_eq!(parse_birthday("13/01/2000"), Err(BirthdayError::InvalidDate));
    }

    #[test]
    fn accepts_lowercase_degree_code() {
        let code = parse_degree_code("se-ugc-b1").unwrap();
        assert_eq!(code.code, "SE-UGC-B1");
        assert_eq!(code.university, "NSBM Green University");
        assert_eq!(code.degree, "Software Engineering");
        assert_eq!(code.group, "B1");
    }

    #[test]
    fn strips_noise_characters() {
        let code = parse_degree_code(" cs ply 22 ").unwrap();
        assert_eq!(code.code, "CSPLY22");
        assert_eq!(code.university, "Plymouth University");
        assert_eq!(code.degree, "Computer Science");
        assert_eq!(code.group, "22");
    }

    #[test]
    fn unrecognized_code_fails_both_token_checks() {
        let err = parse_degree_code("XX-YY").unwrap_err();
        assert!(!err.bad_length);
        assert!(err.unknown_university);
        assert!(err.unknown_degree);
    }

    #[test]
    fn too_short_code_reports_length() {
        let err = parse_degree_code("SE").unwrap_err();
        assert!(err.bad_length);
        // "SE" is a known degree token, so only the other two checks fire.
        assert!(err.unknown_university);
        assert!(!err.unknown_degree);
    }

    #[test]
    fn too_long_code_reports_length() {
        let err = parse_degree_code("SE-UGC-B1-EXTRA").unwrap_err();
        assert!(err.bad_length);
        assert!(!err.unknown_university);
        assert!(!err.unknown_degree);
    }

    #[test]
    fn error_message_names_every_failed_check() {
        let err = parse_degree_code("Q-Q").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("5-11 characters"));
        assert!(text.contains("university"));
        assert!(text.contains("degree"));
    }

    #[test]
    fn victoria_token_is_recognized() {
        let code = parse_degree_code("SE-VU-A2").unwrap();
        assert_eq!(code.university, "Victoria University");
        assert_eq!(code.group, "A2");
    }
}
