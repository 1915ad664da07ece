//! Normalization of provider-native value representations.
//!
//! Brazilian data sources report numbers in pt-BR convention (`.` thousands
//! separator, `,` decimal separator), often with an `R$` currency prefix and
//! magnitude suffixes ("1,5 bi", "700 mi"). Scraped pages additionally need
//! markup stripped before they are regex-searchable.
//!
//! All functions here are pure and total: unparsable input yields `NaN` (or
//! an empty string), never an error.

use regex::Regex;
use std::sync::LazyLock;

static MAGNITUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9.,]+)\s*(milh(?:ões)?|mi|m|bilh(?:ões)?|bi|b)?").expect("valid regex")
});

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex"));

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex"));

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Parses a pt-BR formatted number ("1.234,56"), tolerating an `R$` prefix.
///
/// Returns `NaN` for empty or unparsable input. Digit-only input parses as in
/// plain ASCII; note that a bare `.` is read as a thousands separator, which
/// is the convention every source handled here follows.
#[must_use]
pub fn parse_localized_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return f64::NAN;
    }
    let text = text.trim_start_matches("R$").trim();
    let normalized = text.replace('.', "").replace(',', ".");
    normalized.parse::<f64>().unwrap_or(f64::NAN)
}

/// Parses a pt-BR number with an optional magnitude suffix.
///
/// Recognizes `mi`/`m`/`milh`/`milhões` (×10⁶) and `bi`/`b`/`bilh`/`bilhões`
/// (×10⁹), case-insensitive. Input without a suffix is left unscaled.
/// Returns `NaN` when no numeric prefix is found.
#[must_use]
pub fn parse_magnitude_value(text: &str) -> f64 {
    let Some(captures) = MAGNITUDE_RE.captures(text) else {
        return f64::NAN;
    };
    let number = parse_localized_number(&captures[1]);
    if number.is_nan() {
        return f64::NAN;
    }
    let suffix = captures
        .get(2)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();
    match suffix.as_str() {
        "bilh" | "bilhões" | "bi" | "b" => number * 1_000_000_000.0,
        "milh" | "milhões" | "mi" | "m" => number * 1_000_000.0,
        _ => number,
    }
}

/// Strips markup from an HTML document, leaving regex-searchable plain text.
///
/// Removes script/style blocks and all remaining tags, unescapes the common
/// entities, and collapses whitespace runs to single spaces. Best-effort by
/// design: the scraper only needs label/value pairs to survive, not document
/// structure.
#[must_use]
pub fn strip_markup(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = SCRIPT_RE.replace_all(html, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = unescape_entities(&text);
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Replaces the HTML entities that actually occur on the scraped pages.
fn unescape_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Converts a possibly-NaN float into the `Option` carrier used everywhere
/// downstream of the fetch layer.
#[must_use]
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pt_br_numbers() {
        assert_eq!(parse_localized_number("1.234,56"), 1234.56);
        assert_eq!(parse_localized_number("0,95"), 0.95);
        assert_eq!(parse_localized_number("42"), 42.0);
        assert_eq!(parse_localized_number("R$ 10,50"), 10.5);
        assert_eq!(parse_localized_number("  R$ 1.000.000  "), 1_000_000.0);
    }

    #[test]
    fn unparsable_input_yields_nan() {
        assert!(parse_localized_number("").is_nan());
        assert!(parse_localized_number("   ").is_nan());
        assert!(parse_localized_number("abc").is_nan());
        assert!(parse_localized_number("R$").is_nan());
    }

    #[test]
    fn parses_magnitude_suffixes() {
        assert_eq!(parse_magnitude_value("1,5 bi"), 1_500_000_000.0);
        assert_eq!(parse_magnitude_value("700 mi"), 700_000_000.0);
        assert_eq!(parse_magnitude_value("2 bilhões"), 2_000_000_000.0);
        assert_eq!(parse_magnitude_value("3,2 milhões"), 3_200_000.0);
        assert_eq!(parse_magnitude_value("1,5 B"), 1_500_000_000.0);
    }

    #[test]
    fn no_suffix_leaves_value_unscaled() {
        assert_eq!(parse_magnitude_value("123,45"), 123.45);
        assert_eq!(parse_magnitude_value("500"), 500.0);
    }

    #[test]
    fn magnitude_of_garbage_is_nan() {
        assert!(parse_magnitude_value("").is_nan());
        assert!(parse_magnitude_value("sem valor").is_nan());
    }

    #[test]
    fn strips_tags_scripts_and_entities() {
        let html = "<html><head><style>body { color: red; }</style>\
                    <script type=\"text/javascript\">var x = 1 < 2;</script></head>\
                    <body><div>P/VP</div>  <span>0,95</span> &amp; DY &nbsp; 8,5%</body></html>";
        let text = strip_markup(html);
        assert_eq!(text, "P/VP 0,95 & DY 8,5%");
        assert!(!text.contains("color"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn strip_markup_of_empty_is_empty() {
        assert_eq!(strip_markup(""), "");
    }

    #[test]
    fn finite_filters_nan() {
        assert_eq!(finite(1.5), Some(1.5));
        assert_eq!(finite(f64::NAN), None);
        assert_eq!(finite(f64::INFINITY), None);
    }
}
