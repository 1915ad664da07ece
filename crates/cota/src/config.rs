//! Runtime configuration, read once from the environment.

use std::path::PathBuf;

/// Relative tolerance for the cross-source price agreement flag.
pub const DEFAULT_PRICE_MATCH_TOLERANCE: f64 = 0.02;

/// Dividend-yield values above this are taken as already-in-percent;
/// at or below it they are scaled by 100.
pub const DEFAULT_YIELD_PERCENT_THRESHOLD: f64 = 1.0;

/// Default monthly contribution amount, in BRL.
pub const DEFAULT_CONTRIBUTION_AMOUNT: f64 = 185.0;

/// Analyzer tunables.
///
/// Every field has a safe default; malformed environment values fall back
/// silently rather than failing construction.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerConfig {
    /// Relative tolerance for the price match flag (`PRICE_MATCH_TOLERANCE`).
    pub price_match_tolerance: f64,
    /// Whether the page-scraping FII source may be consulted
    /// (`USE_INVESTIDOR10`).
    pub use_investidor10: bool,
    /// Threshold separating fractional from percent dividend yields
    /// (`YIELD_PERCENT_THRESHOLD`).
    pub yield_percent_threshold: f64,
    /// Monthly contribution amount for downstream position sizing
    /// (`VALOR_APORTE`). Not used by the analysis itself.
    pub contribution_amount: f64,
    /// SQLite response cache location (`CACHE_PATH`); no cache when unset.
    pub cache_path: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            price_match_tolerance: DEFAULT_PRICE_MATCH_TOLERANCE,
            use_investidor10: true,
            yield_percent_threshold: DEFAULT_YIELD_PERCENT_THRESHOLD,
            contribution_amount: DEFAULT_CONTRIBUTION_AMOUNT,
            cache_path: None,
        }
    }
}

impl AnalyzerConfig {
    /// Read the configuration from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            price_match_tolerance: parse_f64(
                env("PRICE_MATCH_TOLERANCE").as_deref(),
                DEFAULT_PRICE_MATCH_TOLERANCE,
            ),
            use_investidor10: truthy(env("USE_INVESTIDOR10").as_deref(), true),
            yield_percent_threshold: parse_f64(
                env("YIELD_PERCENT_THRESHOLD").as_deref(),
                DEFAULT_YIELD_PERCENT_THRESHOLD,
            ),
            contribution_amount: parse_f64(
                env("VALOR_APORTE").as_deref(),
                DEFAULT_CONTRIBUTION_AMOUNT,
            ),
            cache_path: std::env::var_os("CACHE_PATH").map(PathBuf::from),
        }
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Truthiness convention shared with the original deployments: unset means
/// the default, and only the explicit falsy spellings turn a flag off.
fn truthy(raw: Option<&str>, default: bool) -> bool {
    match raw {
        None => default,
        Some(raw) => !matches!(
            raw.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
    }
}

fn parse_f64(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(|r| r.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.price_match_tolerance, 0.02);
        assert!(config.use_investidor10);
        assert_eq!(config.yield_percent_threshold, 1.0);
        assert_eq!(config.contribution_amount, 185.0);
        assert!(config.cache_path.is_none());
    }

    #[test]
    fn truthy_only_recognizes_falsy_spellings() {
        assert!(truthy(None, true));
        assert!(!truthy(None, false));
        assert!(!truthy(Some("0"), true));
        assert!(!truthy(Some(" FALSE "), true));
        assert!(!truthy(Some("no"), true));
        assert!(!truthy(Some("off"), true));
        assert!(truthy(Some("1"), false));
        assert!(truthy(Some("yes"), false));
        assert!(truthy(Some("anything"), false));
    }

    #[test]
    fn parse_f64_falls_back_on_garbage() {
        assert_eq!(parse_f64(Some("0.05"), 0.02), 0.05);
        assert_eq!(parse_f64(Some(" 0.05 "), 0.02), 0.05);
        assert_eq!(parse_f64(Some("not a number"), 0.02), 0.02);
        assert_eq!(parse_f64(Some("NaN"), 0.02), 0.02);
        assert_eq!(parse_f64(None, 0.02), 0.02);
    }
}
