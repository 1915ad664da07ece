//! Folding per-source metric candidates into single trusted values.
//!
//! Every rule here is a strict override chain: the primary source wins
//! whenever it has an opinion, regardless of what the others say. Cross-source
//! agreement is surfaced as a flag on the price, never used to pick a value.

use cota_core::FundamentalSnapshot;

/// Denominator floor for the relative price difference, so near-zero prices
/// cannot divide by zero.
const AGREEMENT_FLOOR: f64 = 1e-9;

/// Outcome of reconciling the two price candidates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PriceSelection {
    /// The winning price, if any candidate was present.
    pub value: Option<f64>,
    /// Whether the candidates agreed within tolerance. `None` unless both
    /// candidates were present.
    pub matched: Option<bool>,
}

/// Relative-difference agreement check between two prices.
#[must_use]
pub fn prices_match(a: f64, b: f64, tolerance: f64) -> bool {
    let denom = a.abs().max(b.abs()).max(AGREEMENT_FLOOR);
    (a - b).abs() / denom <= tolerance
}

/// Reconcile the primary and secondary price candidates.
///
/// With both present the preferred side always wins; agreement within
/// `tolerance` only sets the `matched` flag. A single present candidate is
/// returned as-is with no flag.
#[must_use]
pub fn select_price(
    primary: Option<f64>,
    secondary: Option<f64>,
    prefer_primary: bool,
    tolerance: f64,
) -> PriceSelection {
    match (primary, secondary) {
        (Some(p), Some(s)) => PriceSelection {
            value: Some(if prefer_primary { p } else { s }),
            matched: Some(prices_match(p, s, tolerance)),
        },
        (Some(p), None) => PriceSelection {
            value: Some(p),
            matched: None,
        },
        (None, Some(s)) => PriceSelection {
            value: Some(s),
            matched: None,
        },
        (None, None) => PriceSelection::default(),
    }
}

/// Strict override: the primary candidate wins whenever present.
///
/// Left-foldable across any number of sources in priority order.
#[must_use]
pub fn select_metric(primary: Option<f64>, secondary: Option<f64>) -> Option<f64> {
    primary.or(secondary)
}

/// The per-source snapshots in override order: Yahoo, then brapi, then the
/// scraped page.
#[derive(Clone, Copy, Debug)]
pub struct SourceSet<'a> {
    /// Primary source.
    pub yahoo: &'a FundamentalSnapshot,
    /// Secondary source.
    pub brapi: &'a FundamentalSnapshot,
    /// Tertiary source; an empty snapshot when not consulted.
    pub scraped: &'a FundamentalSnapshot,
}

impl SourceSet<'_> {
    /// Fold one metric across the three sources in override order.
    pub fn fold(&self, metric: impl Fn(&FundamentalSnapshot) -> Option<f64>) -> Option<f64> {
        select_metric(
            select_metric(metric(self.yahoo), metric(self.brapi)),
            metric(self.scraped),
        )
    }
}

/// Resolve P/VP, deriving it when no source reports it directly.
///
/// Derivation chain, attempted in order:
/// 1. book value per share, from direct candidates, then NAV candidates
///    (the scraped per-share net asset value doubles as a NAV candidate),
///    then equity divided by shares outstanding;
///    with a positive book value and a price, P/VP = price / book value.
/// 2. market cap divided by equity (equity positive).
#[must_use]
pub fn resolve_price_to_book(sources: &SourceSet<'_>, price: Option<f64>) -> Option<f64> {
    if let Some(direct) = sources.fold(|s| s.price_to_book) {
        return Some(direct);
    }

    let mut book = sources.fold(|s| s.book_value);
    if book.is_none() {
        book = select_metric(
            select_metric(sources.yahoo.nav, sources.brapi.nav),
            sources.scraped.book_value,
        );
    }
    if book.is_none() {
        let shares = sources.fold(|s| s.shares_outstanding);
        let equity = sources.fold(|s| s.equity);
        if let (Some(shares), Some(equity)) = (shares, equity) {
            if shares > 0.0 {
                book = Some(equity / shares);
            }
        }
    }

    match book {
        Some(book) if book > 0.0 => price.map(|p| p / book),
        Some(_) => None,
        None => {
            let equity = sources.fold(|s| s.equity);
            let market_cap = select_metric(sources.yahoo.market_cap, sources.brapi.market_cap);
            match (equity, market_cap) {
                (Some(equity), Some(market_cap)) if equity > 0.0 => Some(market_cap / equity),
                _ => None,
            }
        }
    }
}

/// Resolve the average daily traded value in currency.
///
/// Average volume folds across the API sources; when both are silent it is
/// derived from the scraped currency liquidity divided by the price. The
/// result is volume times price.
#[must_use]
pub fn resolve_liquidity(sources: &SourceSet<'_>, price: Option<f64>) -> Option<f64> {
    let avg_volume = select_metric(sources.yahoo.avg_volume, sources.brapi.avg_volume).or_else(
        || match (sources.scraped.daily_liquidity, price) {
            (Some(liquidity), Some(p)) if p != 0.0 => Some(liquidity / p),
            _ => None,
        },
    );
    match (avg_volume, price) {
        (Some(volume), Some(p)) => Some(volume * p),
        _ => None,
    }
}

/// Normalize a raw dividend yield to percent.
///
/// Sources disagree on scale: some report `0.085`, some `8.5`. Values above
/// `threshold` are taken as already-in-percent, the rest scaled by 100.
#[must_use]
pub fn normalize_yield_percent(raw: Option<f64>, threshold: f64) -> Option<f64> {
    raw.map(|dy| if dy > threshold { dy } else { dy * 100.0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(f: impl FnOnce(&mut FundamentalSnapshot)) -> FundamentalSnapshot {
        let mut s = FundamentalSnapshot::default();
        f(&mut s);
        s
    }

    const TOL: f64 = 0.02;

    #[test]
    fn agreeing_prices_set_the_match_flag() {
        let selection = select_price(Some(10.0), Some(10.1), true, TOL);
        assert_eq!(selection.value, Some(10.0));
        assert_eq!(selection.matched, Some(true));
    }

    #[test]
    fn disagreeing_prices_still_follow_preference() {
        let selection = select_price(Some(10.0), Some(12.0), true, TOL);
        assert_eq!(selection.value, Some(10.0));
        assert_eq!(selection.matched, Some(false));

        let selection = select_price(Some(10.0), Some(12.0), false, TOL);
        assert_eq!(selection.value, Some(12.0));
        assert_eq!(selection.matched, Some(false));
    }

    #[test]
    fn single_candidate_wins_with_no_flag() {
        let selection = select_price(Some(10.0), None, true, TOL);
        assert_eq!(selection.value, Some(10.0));
        assert_eq!(selection.matched, None);

        let selection = select_price(None, Some(9.5), true, TOL);
        assert_eq!(selection.value, Some(9.5));
        assert_eq!(selection.matched, None);

        assert_eq!(select_price(None, None, true, TOL), PriceSelection::default());
    }

    #[test]
    fn zero_prices_match_via_denominator_floor() {
        assert!(prices_match(0.0, 0.0, TOL));
        assert!(!prices_match(0.0, 1.0, TOL));
    }

    #[test]
    fn select_metric_is_a_strict_override() {
        assert_eq!(select_metric(Some(1.0), Some(2.0)), Some(1.0));
        assert_eq!(select_metric(None, Some(2.0)), Some(2.0));
        assert_eq!(select_metric(Some(1.0), None), Some(1.0));
        assert_eq!(select_metric(None, None), None);
    }

    #[test]
    fn fold_prefers_sources_in_order() {
        let yahoo = snapshot(|s| s.dividend_yield = Some(0.08));
        let brapi = snapshot(|s| s.dividend_yield = Some(8.5));
        let scraped = snapshot(|s| s.dividend_yield = Some(9.0));
        let sources = SourceSet {
            yahoo: &yahoo,
            brapi: &brapi,
            scraped: &scraped,
        };
        assert_eq!(sources.fold(|s| s.dividend_yield), Some(0.08));

        let empty = FundamentalSnapshot::default();
        let sources = SourceSet {
            yahoo: &empty,
            brapi: &empty,
            scraped: &scraped,
        };
        assert_eq!(sources.fold(|s| s.dividend_yield), Some(9.0));
    }

    #[test]
    fn direct_price_to_book_wins_over_derivation() {
        let yahoo = snapshot(|s| {
            s.price_to_book = Some(0.92);
            s.book_value = Some(100.0);
        });
        let empty = FundamentalSnapshot::default();
        let sources = SourceSet {
            yahoo: &yahoo,
            brapi: &empty,
            scraped: &empty,
        };
        assert_eq!(resolve_price_to_book(&sources, Some(9.0)), Some(0.92));
    }

    #[test]
    fn price_to_book_derives_from_book_value() {
        let brapi = snapshot(|s| s.book_value = Some(10.0));
        let empty = FundamentalSnapshot::default();
        let sources = SourceSet {
            yahoo: &empty,
            brapi: &brapi,
            scraped: &empty,
        };
        assert_eq!(resolve_price_to_book(&sources, Some(9.5)), Some(0.95));
    }

    #[test]
    fn nav_stands_in_for_book_value() {
        let yahoo = snapshot(|s| s.nav = Some(10.0));
        let empty = FundamentalSnapshot::default();
        let sources = SourceSet {
            yahoo: &yahoo,
            brapi: &empty,
            scraped: &empty,
        };
        assert_eq!(resolve_price_to_book(&sources, Some(11.0)), Some(1.1));
    }

    #[test]
    fn equity_over_shares_derives_book_value() {
        let brapi = snapshot(|s| {
            s.equity = Some(1_000_000.0);
            s.shares_outstanding = Some(100_000.0);
        });
        let empty = FundamentalSnapshot::default();
        let sources = SourceSet {
            yahoo: &empty,
            brapi: &brapi,
            scraped: &empty,
        };
        // book = 10.0 per share
        assert_eq!(resolve_price_to_book(&sources, Some(9.0)), Some(0.9));
    }

    #[test]
    fn market_cap_over_equity_is_the_last_resort() {
        let yahoo = snapshot(|s| s.market_cap = Some(960_000.0));
        let brapi = snapshot(|s| s.equity = Some(1_000_000.0));
        let empty = FundamentalSnapshot::default();
        let sources = SourceSet {
            yahoo: &yahoo,
            brapi: &brapi,
            scraped: &empty,
        };
        assert_eq!(resolve_price_to_book(&sources, Some(9.6)), Some(0.96));
    }

    #[test]
    fn unresolvable_price_to_book_stays_absent() {
        let empty = FundamentalSnapshot::default();
        let sources = SourceSet {
            yahoo: &empty,
            brapi: &empty,
            scraped: &empty,
        };
        assert_eq!(resolve_price_to_book(&sources, Some(9.0)), None);

        // non-positive book value blocks the division and the last resort
        let brapi = snapshot(|s| s.book_value = Some(0.0));
        let sources = SourceSet {
            yahoo: &empty,
            brapi: &brapi,
            scraped: &empty,
        };
        assert_eq!(resolve_price_to_book(&sources, Some(9.0)), None);
    }

    #[test]
    fn liquidity_multiplies_volume_by_price() {
        let yahoo = snapshot(|s| s.avg_volume = Some(100_000.0));
        let empty = FundamentalSnapshot::default();
        let sources = SourceSet {
            yahoo: &yahoo,
            brapi: &empty,
            scraped: &empty,
        };
        assert_eq!(resolve_liquidity(&sources, Some(10.0)), Some(1_000_000.0));
        assert_eq!(resolve_liquidity(&sources, None), None);
    }

    #[test]
    fn scraped_currency_liquidity_backfills_volume() {
        let scraped = snapshot(|s| s.daily_liquidity = Some(3_200_000.0));
        let empty = FundamentalSnapshot::default();
        let sources = SourceSet {
            yahoo: &empty,
            brapi: &empty,
            scraped: &scraped,
        };
        assert_eq!(resolve_liquidity(&sources, Some(10.0)), Some(3_200_000.0));
    }

    #[test]
    fn yield_scale_is_normalized_to_percent() {
        assert_eq!(normalize_yield_percent(Some(0.085), 1.0), Some(8.5));
        assert_eq!(normalize_yield_percent(Some(8.5), 1.0), Some(8.5));
        assert_eq!(normalize_yield_percent(Some(1.0), 1.0), Some(100.0));
        assert_eq!(normalize_yield_percent(None, 1.0), None);
    }
}
