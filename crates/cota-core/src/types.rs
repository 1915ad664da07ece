//! Core data types for B3 market data.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Ticker`] - B3 trading symbol
//! - [`OhlcvBar`] - daily OHLCV price bar
//! - [`PriceSeries`] - date-ordered bar sequence with a usability threshold
//! - [`FundamentalSnapshot`] - one source's candidate values for the tracked metrics
//! - [`HistoryRange`] / [`HistoryInterval`] - provider-generic history request options
//! - [`FundamentalModules`] - which extended fundamentals modules to request

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum number of daily bars a history must carry to be usable for
/// indicator computation. Shorter series are treated as absent.
pub const MIN_HISTORY_BARS: usize = 100;

/// A B3 trading symbol.
///
/// Tickers are automatically uppercased on creation. Symbols ending in `11`
/// follow the exchange convention for real-estate funds (FIIs), which gates
/// the debt scoring rule and the page-scraping fallback source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a new ticker from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the symbol follows the FII (`...11`) naming convention.
    ///
    /// Fund-like instruments skip the leverage rules and unlock the
    /// page-scraping fallback source.
    #[must_use]
    pub fn is_fund(&self) -> bool {
        self.0.ends_with("11")
    }

    /// The Yahoo Finance symbol for this ticker (B3 listings carry a `.SA`
    /// suffix there).
    #[must_use]
    pub fn yahoo_symbol(&self) -> String {
        format!("{}.SA", self.0)
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// OHLCV (Open, High, Low, Close, Volume) daily bar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// Trading date of the bar.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Highest price during the session.
    pub high: f64,
    /// Lowest price during the session.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Trading volume.
    pub volume: f64,
}

impl OhlcvBar {
    /// Creates a new OHLCV bar.
    #[must_use]
    pub const fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// A date-ordered sequence of daily OHLCV bars for one instrument.
///
/// Construction sorts bars by date and drops duplicate dates, so strictly
/// increasing date order holds as an invariant. A series shorter than
/// [`MIN_HISTORY_BARS`] is kept but reports itself as unusable; callers treat
/// it the same as an absent history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    /// Creates a series from a vector of bars, sorting by date and keeping
    /// the first bar seen for any duplicated date.
    #[must_use]
    pub fn new(mut bars: Vec<OhlcvBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self { bars }
    }

    /// Returns an empty series.
    #[must_use]
    pub const fn empty() -> Self {
        Self { bars: Vec::new() }
    }

    /// Number of bars in the series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// True if the series has no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// True when the series is long enough for indicator computation.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.bars.len() >= MIN_HISTORY_BARS
    }

    /// The bars in ascending date order.
    #[must_use]
    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    /// Closing prices in ascending date order.
    #[must_use]
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The most recent closing price.
    #[must_use]
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}

impl IntoIterator for PriceSeries {
    type Item = OhlcvBar;
    type IntoIter = std::vec::IntoIter<OhlcvBar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.into_iter()
    }
}

impl FromIterator<OhlcvBar> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = OhlcvBar>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One data source's candidate values for the tracked fundamental metrics.
///
/// Every field is an `Option<f64>`: `None` means "this source has no opinion",
/// whether because the payload lacked the field, the value failed to parse, or
/// the fetch itself failed. The reconciler folds snapshots from several
/// sources into single trusted values and never learns why a field is absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    /// Regular market price.
    pub price: Option<f64>,
    /// Price-to-book ratio (P/VP).
    pub price_to_book: Option<f64>,
    /// Book value per share.
    pub book_value: Option<f64>,
    /// Net asset value per share.
    pub nav: Option<f64>,
    /// Dividend yield, scale as reported by the source.
    pub dividend_yield: Option<f64>,
    /// Average daily traded volume, in shares.
    pub avg_volume: Option<f64>,
    /// Debt-to-equity ratio, in percent.
    pub debt_to_equity: Option<f64>,
    /// Market capitalization.
    pub market_cap: Option<f64>,
    /// Shares outstanding.
    pub shares_outstanding: Option<f64>,
    /// Total stockholders' equity.
    pub equity: Option<f64>,
    /// Average daily traded value in currency (only some sources report this).
    pub daily_liquidity: Option<f64>,
}

impl FundamentalSnapshot {
    /// True when every tracked metric is absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.price_to_book.is_none()
            && self.book_value.is_none()
            && self.nav.is_none()
            && self.dividend_yield.is_none()
            && self.avg_volume.is_none()
            && self.debt_to_equity.is_none()
            && self.market_cap.is_none()
            && self.shares_outstanding.is_none()
            && self.equity.is_none()
            && self.daily_liquidity.is_none()
    }
}

/// How far back a history request should reach.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryRange {
    /// Three months of history.
    ThreeMonths,
    /// Six months of history.
    SixMonths,
    /// One year of history.
    #[default]
    OneYear,
    /// Two years of history.
    TwoYears,
}

impl HistoryRange {
    /// The range as the `1y`-style token most quote APIs accept.
    #[must_use]
    pub const fn as_token(&self) -> &'static str {
        match self {
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
        }
    }

    /// Approximate calendar days covered by the range.
    #[must_use]
    pub const fn approx_days(&self) -> i64 {
        match self {
            Self::ThreeMonths => 91,
            Self::SixMonths => 182,
            Self::OneYear => 365,
            Self::TwoYears => 730,
        }
    }
}

/// Sampling interval of a history request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryInterval {
    /// Daily bars.
    #[default]
    Daily,
    /// Weekly bars.
    Weekly,
    /// Monthly bars.
    Monthly,
}

impl HistoryInterval {
    /// The interval as the `1d`-style token most quote APIs accept.
    #[must_use]
    pub const fn as_token(&self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }
}

/// Which extended fundamentals modules a source should be asked for.
///
/// Sources that do not distinguish modules ignore the flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FundamentalModules {
    /// Valuation statistics (price-to-book, book value, shares outstanding...).
    pub key_statistics: bool,
    /// Financial health data (debt-to-equity...).
    pub financial_data: bool,
    /// Historical balance-sheet snapshots (stockholders' equity).
    pub balance_sheet_history: bool,
}

impl FundamentalModules {
    /// Request every module.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            key_statistics: true,
            financial_data: true,
            balance_sheet_history: true,
        }
    }

    /// Request no extended module (basic quote data only).
    #[must_use]
    pub const fn none() -> Self {
        Self {
            key_statistics: false,
            financial_data: false,
            balance_sheet_history: false,
        }
    }
}

impl Default for FundamentalModules {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> OhlcvBar {
        OhlcvBar::new(date.parse().unwrap(), close, close, close, close, 1_000.0)
    }

    #[test]
    fn ticker_uppercases_and_detects_funds() {
        let fund = Ticker::new("mxrf11");
        assert_eq!(fund.as_str(), "MXRF11");
        assert!(fund.is_fund());

        let equity = Ticker::new("petr4");
        assert_eq!(equity.as_str(), "PETR4");
        assert!(!equity.is_fund());
        assert_eq!(equity.yahoo_symbol(), "PETR4.SA");
    }

    #[test]
    fn price_series_sorts_and_dedups_by_date() {
        let series = PriceSeries::new(vec![
            bar("2024-01-03", 12.0),
            bar("2024-01-01", 10.0),
            bar("2024-01-03", 13.0),
            bar("2024-01-02", 11.0),
        ]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
        assert_eq!(series.last_close(), Some(12.0));
    }

    #[test]
    fn short_series_is_not_usable() {
        let bars: Vec<OhlcvBar> = (1..=99)
            .map(|i| {
                bar(
                    &format!("2024-{:02}-{:02}", (i - 1) / 28 + 1, (i - 1) % 28 + 1),
                    10.0,
                )
            })
            .collect();
        let series = PriceSeries::new(bars);
        assert_eq!(series.len(), 99);
        assert!(!series.is_usable());
    }

    #[test]
    fn empty_snapshot_reports_empty() {
        let snapshot = FundamentalSnapshot::default();
        assert!(snapshot.is_empty());

        let snapshot = FundamentalSnapshot {
            price_to_book: Some(0.9),
            ..Default::default()
        };
        assert!(!snapshot.is_empty());
    }
}
