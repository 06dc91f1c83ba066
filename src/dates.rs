//! Date normalization for show-specific episode date representations.
//!
//! Every show publishes dates differently: ZDF embeds German date phrases in
//! episode URLs (`markus-lanz-vom-12-maerz-2024-100.html`), ARD prints
//! localized `DD.MM.YYYY` strings in listing teasers. Both are normalized to
//! canonical `YYYY-MM-DD` strings, which string-sort in chronological order.
//!
//! Malformed input is expected and common (pages change layout), so parsing
//! never errors: any unrecognized input yields `None` and the caller excludes
//! that candidate.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Hint describing which representation a raw date string uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// URL-embedded German phrase: `vom-12-maerz-2024`.
    UrlSlug,
    /// Localized numeric string: `12.03.2024`.
    Numeric,
}

/// German month names mapped to month numbers. Keys are stored with
/// diacritics already folded (`märz` -> `maerz`), matching [`fold_german`].
/// The plain `marz` spelling shows up in some slugs too.
const MONTHS: &[(&str, u32)] = &[
    ("januar", 1),
    ("februar", 2),
    ("maerz", 3),
    ("marz", 3),
    ("april", 4),
    ("mai", 5),
    ("juni", 6),
    ("juli", 7),
    ("august", 8),
    ("september", 9),
    ("oktober", 10),
    ("november", 11),
    ("dezember", 12),
];

static SLUG_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"vom-(\d{1,2})-([a-z]+)-(\d{4})").unwrap());

static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").unwrap());

/// Parse a raw date representation into a canonical `YYYY-MM-DD` string.
///
/// Returns `None` on any unparseable input; callers must treat that as
/// "exclude this candidate", never as an error.
pub fn parse(raw: &str, format: DateFormat) -> Option<String> {
    match format {
        DateFormat::UrlSlug => parse_slug_date(raw),
        DateFormat::Numeric => parse_numeric_date(raw),
    }
}

/// Extract a `vom-DD-<monthname>-YYYY` phrase from a URL or slug.
///
/// The input is lowercased and German diacritics are folded before the month
/// lookup, so `vom-12-März-2024` and `vom-12-maerz-2024` both resolve.
pub fn parse_slug_date(raw: &str) -> Option<String> {
    let folded = fold_german(raw);
    let caps = SLUG_DATE.captures(&folded)?;
    let day: u32 = caps[1].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let month = MONTHS
        .iter()
        .find(|(name, _)| *name == &caps[2])
        .map(|(_, m)| *m)?;
    canonical(year, month, day)
}

/// Parse a numeric `DD.MM.YYYY` string, tolerating surrounding text.
pub fn parse_numeric_date(raw: &str) -> Option<String> {
    let caps = NUMERIC_DATE.captures(raw)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    canonical(year, month, day)
}

/// Validate through chrono so impossible dates (32.01., 30.02.) come back as
/// `None` instead of sorting garbage into the watermark comparison.
fn canonical(year: i32, month: u32, day: u32) -> Option<String> {
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Lowercase and decompose German diacritics to their ASCII slug forms.
fn fold_german(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().flat_map(|c| c.to_lowercase()) {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            _ => out.push(c),
        }
    }
    // Slugs write "März" as both "maerz" and "marz"; MONTHS carries both keys.
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_date_from_full_url() {
        let url = "https://www.zdf.de/talk/markus-lanz-vom-12-maerz-2024-100.html";
        assert_eq!(parse_slug_date(url), Some("2024-03-12".to_string()));
    }

    #[test]
    fn test_slug_date_with_diacritics() {
        assert_eq!(
            parse_slug_date("maybrit-illner-vom-7-März-2024"),
            Some("2024-03-07".to_string())
        );
    }

    #[test]
    fn test_slug_date_all_months() {
        for (slug, expected) in [
            ("vom-1-januar-2023", "2023-01-01"),
            ("vom-28-februar-2023", "2023-02-28"),
            ("vom-15-mai-2023", "2023-05-15"),
            ("vom-31-dezember-2023", "2023-12-31"),
        ] {
            assert_eq!(parse_slug_date(slug), Some(expected.to_string()));
        }
    }

    #[test]
    fn test_slug_date_unknown_month() {
        assert_eq!(parse_slug_date("vom-12-brumaire-2024"), None);
    }

    #[test]
    fn test_slug_date_missing_phrase() {
        assert_eq!(parse_slug_date("markus-lanz-100.html"), None);
    }

    #[test]
    fn test_numeric_date() {
        assert_eq!(parse_numeric_date("12.03.2024"), Some("2024-03-12".to_string()));
        assert_eq!(parse_numeric_date("1.1.2024"), Some("2024-01-01".to_string()));
    }

    #[test]
    fn test_numeric_date_embedded_in_teaser() {
        assert_eq!(
            parse_numeric_date("Sendung vom 05.11.2024 | 22:15 Uhr"),
            Some("2024-11-05".to_string())
        );
    }

    #[test]
    fn test_numeric_date_impossible() {
        assert_eq!(parse_numeric_date("32.01.2024"), None);
        assert_eq!(parse_numeric_date("30.02.2024"), None);
        assert_eq!(parse_numeric_date("12.13.2024"), None);
    }

    #[test]
    fn test_numeric_date_garbage() {
        assert_eq!(parse_numeric_date(""), None);
        assert_eq!(parse_numeric_date("Mehr laden"), None);
    }

    #[test]
    fn test_parse_with_hint() {
        assert_eq!(
            parse("vom-3-juli-2025", DateFormat::UrlSlug),
            Some("2025-07-03".to_string())
        );
        assert_eq!(
            parse("03.07.2025", DateFormat::Numeric),
            Some("2025-07-03".to_string())
        );
    }

    #[test]
    fn test_canonical_sorts_chronologically() {
        let a = parse_numeric_date("09.01.2024").unwrap();
        let b = parse_numeric_date("10.01.2024").unwrap();
        let c = parse_numeric_date("02.02.2024").unwrap();
        assert!(a < b);
        assert!(b < c);
    }
}
