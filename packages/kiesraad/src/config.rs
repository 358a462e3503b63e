//! Configuration constants and validation functions.

use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::error::{KiesraadError, Result};

/// File name prefix of EML 510 count files (`Telling_<election>_<municipality>.xml`).
pub const COUNT_FILE_PREFIX: &str = "Telling";

/// File name prefix of EML 110a election definition files.
pub const DEFINITION_FILE_PREFIX: &str = "Verkiezingsdefinitie";

/// File name prefix of EML 230 candidate list files.
pub const CANDIDATE_LIST_FILE_PREFIX: &str = "Kandidatenlijsten_";

/// Path fragment marking electoral district aggregation files.
///
/// These repeat the municipal results one level up and are never read as
/// municipality files.
pub const ELECTORAL_DISTRICT_MARKER: &str = "kieskring";

/// Default output directory for the CLI.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default folder containing saved results pages.
pub const DEFAULT_PAGES_DIR: &str = "data";

/// Values that mark a count as "not applicable" or redacted.
///
/// Compared case-insensitively after trimming.
pub const NOT_APPLICABLE_MARKERS: &[&str] = &["-", "n.v.t.", "nvt", "x", "*"];

/// Election identifier pattern: letters, a four digit year, optional suffix.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ELECTION_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,}\d{4}[A-Za-z0-9_]*$").expect("valid regex"));

/// Date pattern: YYYY-MM-DD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Validate an election identifier.
///
/// # Examples
/// ```
/// use kiesraad::config::validate_election_id;
///
/// assert!(validate_election_id("TK2017").is_ok());
/// assert!(validate_election_id("GR2018_Amsterdam").is_ok());
/// assert!(validate_election_id("2017").is_err());
/// ```
pub fn validate_election_id(election_id: &str) -> Result<()> {
    if ELECTION_ID_PATTERN.is_match(election_id) {
        Ok(())
    } else {
        Err(KiesraadError::InvalidElectionId(election_id.to_string()))
    }
}

/// Validate date format (YYYY-MM-DD) and that it is a real calendar date.
///
/// # Examples
/// ```
/// use kiesraad::config::validate_date;
///
/// assert!(validate_date("2017-03-15").is_ok());
/// assert!(validate_date("2017-02-30").is_err());
/// ```
pub fn validate_date(date_str: &str) -> Result<()> {
    if !DATE_PATTERN.is_match(date_str) {
        return Err(KiesraadError::InvalidDate(date_str.to_string()));
    }

    chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| KiesraadError::InvalidDate(date_str.to_string()))?;

    Ok(())
}

/// Check whether a count value is a not-applicable marker.
///
/// Empty text counts as not applicable as well.
pub fn is_not_applicable(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || NOT_APPLICABLE_MARKERS
            .iter()
            .any(|marker| marker.eq_ignore_ascii_case(value))
}

/// Make a municipality name safe for use as a file stem.
///
/// Keeps alphanumerics (including accented letters), `-`, `_` and `.`;
/// whitespace becomes `_` and everything else is dropped.
///
/// # Examples
/// ```
/// use kiesraad::config::sanitize_file_stem;
///
/// assert_eq!(sanitize_file_stem("Súdwest-Fryslân"), "Súdwest-Fryslân");
/// assert_eq!(sanitize_file_stem("'s-Gravenhage"), "s-Gravenhage");
/// assert_eq!(sanitize_file_stem("Bergen (NH.)"), "Bergen_NH");
/// ```
pub fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem.to_string()
    }
}

/// Default output directory for an election.
pub fn default_output_dir(election_id: Option<&str>) -> PathBuf {
    let base = PathBuf::from(DEFAULT_OUTPUT_DIR);
    match election_id {
        Some(id) => base.join(sanitize_file_stem(id)),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_election_id_valid() {
        assert!(validate_election_id("TK2017").is_ok());
        assert!(validate_election_id("GR2018_Amsterdam").is_ok());
        assert!(validate_election_id("PS2019").is_ok());
        assert!(validate_election_id("EP2019").is_ok());
    }

    #[test]
    fn test_validate_election_id_invalid() {
        assert!(validate_election_id("").is_err());
        assert!(validate_election_id("TK17").is_err());
        assert!(validate_election_id("T2017").is_err());
        assert!(validate_election_id("TK2017 ").is_err());
        assert!(validate_election_id("../TK2017").is_err());
    }

    #[test]
    fn test_validate_date_valid() {
        assert!(validate_date("2017-03-15").is_ok());
        assert!(validate_date("2018-03-21").is_ok());
    }

    #[test]
    fn test_validate_date_invalid() {
        assert!(validate_date("").is_err());
        assert!(validate_date("15-03-2017").is_err());
        assert!(validate_date("2017-13-01").is_err());
        assert!(validate_date("2017-02-30").is_err());
    }

    #[test]
    fn test_is_not_applicable() {
        assert!(is_not_applicable(""));
        assert!(is_not_applicable("  "));
        assert!(is_not_applicable("-"));
        assert!(is_not_applicable("N.V.T."));
        assert!(is_not_applicable("nvt"));
        assert!(!is_not_applicable("0"));
        assert!(!is_not_applicable("12"));
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("Amsterdam"), "Amsterdam");
        assert_eq!(sanitize_file_stem("Den Haag"), "Den_Haag");
        assert_eq!(sanitize_file_stem("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_file_stem("???"), "unnamed");
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(default_output_dir(None), PathBuf::from("output"));
        assert_eq!(
            default_output_dir(Some("TK2017")),
            PathBuf::from("output").join("TK2017")
        );
    }
}
