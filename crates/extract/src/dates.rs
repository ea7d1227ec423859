//! Member-since strings arrive in whatever language the account page was
//! served in. Normalization maps known month names to English and pulls
//! out a "Month Year" token when one exists.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::decode_hex_escapes;

/// Non-English month names (French, Spanish, Portuguese, German) and their
/// English equivalents. Shared spellings are listed once.
const MONTHS: &[(&str, &str)] = &[
    // French
    ("janvier", "January"),
    ("f\u{e9}vrier", "February"),
    ("mars", "March"),
    ("avril", "April"),
    ("mai", "May"),
    ("juin", "June"),
    ("juillet", "July"),
    ("ao\u{fb}t", "August"),
    ("septembre", "September"),
    ("octobre", "October"),
    ("novembre", "November"),
    ("d\u{e9}cembre", "December"),
    // Spanish
    ("enero", "January"),
    ("febrero", "February"),
    ("marzo", "March"),
    ("abril", "April"),
    ("mayo", "May"),
    ("junio", "June"),
    ("julio", "July"),
    ("agosto", "August"),
    ("septiembre", "September"),
    ("octubre", "October"),
    ("noviembre", "November"),
    ("diciembre", "December"),
    // Portuguese
    ("janeiro", "January"),
    ("fevereiro", "February"),
    ("mar\u{e7}o", "March"),
    ("maio", "May"),
    ("junho", "June"),
    ("julho", "July"),
    ("setembro", "September"),
    ("outubro", "October"),
    ("novembro", "November"),
    ("dezembro", "December"),
    // German
    ("januar", "January"),
    ("februar", "February"),
    ("m\u{e4}rz", "March"),
    ("juni", "June"),
    ("juli", "July"),
    ("oktober", "October"),
    ("dezember", "December"),
];

/// "Month Year", tolerating the "de"/"of" connector left by Romance-language
/// date formats ("May de 2021").
static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][a-zA-Z]+)(?:\s+(?:de|of))?\s+(\d{4})").expect("valid month-year pattern")
});

/// Normalize a raw member-since value: decode residual hex escapes, map
/// known month names to English with word-boundary matching, then extract
/// a "Month Year" token. Falls back to the cleaned string when no token
/// matches.
pub fn normalize_member_since(raw: &str) -> String {
    let mut cleaned = decode_hex_escapes(raw.trim()).trim().to_string();

    for (localized, english) in MONTHS {
        // Per-month pattern; compiled lazily only for months actually
        // present, which keeps the common all-English case cheap.
        if cleaned.to_lowercase().contains(localized) {
            if let Ok(re) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(localized))) {
                cleaned = re.replace_all(&cleaned, *english).into_owned();
            }
        }
    }

    match MONTH_YEAR.captures(&cleaned) {
        Some(caps) => format!("{} {}", &caps[1], &caps[2]),
        None => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_passthrough() {
        assert_eq!(normalize_member_since("March 2021"), "March 2021");
    }

    #[test]
    fn test_spanish_month_mapped() {
        assert_eq!(normalize_member_since("enero de 2020"), "January 2020");
    }

    #[test]
    fn test_french_accented_month_mapped() {
        assert_eq!(normalize_member_since("d\u{e9}cembre 2019"), "December 2019");
        assert_eq!(normalize_member_since("ao\u{fb}t 2022"), "August 2022");
    }

    #[test]
    fn test_german_month_mapped() {
        assert_eq!(normalize_member_since("M\u{e4}rz 2023"), "March 2023");
    }

    #[test]
    fn test_portuguese_month_mapped() {
        assert_eq!(normalize_member_since("Desde setembro de 2018"), "September 2018");
    }

    #[test]
    fn test_word_boundary_no_partial_replacement() {
        // "mai" must not fire inside "maintained".
        assert_eq!(normalize_member_since("maintained 2020"), "maintained 2020");
    }

    #[test]
    fn test_hex_escapes_decoded_first() {
        assert_eq!(normalize_member_since(r"mayo\x20de\x202021"), "May 2021");
    }

    #[test]
    fn test_no_match_returns_cleaned_input() {
        assert_eq!(normalize_member_since("since a while"), "since a while");
        assert_eq!(normalize_member_since(""), "");
    }
}
