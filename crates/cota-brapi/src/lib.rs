#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! brapi.dev data source.
//!
//! This crate provides the secondary, structured-API source of the pipeline.
//! A single `GET /api/quote/{ticker}` endpoint answers the spot price, the
//! price history (via `range`/`interval` params) and the fundamentals
//! (via the `modules` param), so all three `cota-core` traits sit on the same
//! request helper.
//!
//! Construction is tolerant of missing credentials: without a token the
//! client runs unauthenticated against the public tier. A process-wide
//! memoized instance is available through [`BrapiProvider::shared`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use cota_core::{
    DataProvider, FundamentalModules, FundamentalSnapshot, FundamentalsProvider, HistoryInterval,
    HistoryProvider, HistoryRange, OhlcvBar, PriceSeries, ProviderError, QuoteProvider, Result,
    Ticker,
};
use serde::Deserialize;
use tracing::debug;

/// Base URL for the brapi quote API.
const BRAPI_BASE_URL: &str = "https://brapi.dev/api/quote";

/// Upper bound on any single request.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Environment variables consulted for the API token, in order.
const TOKEN_ENV_VARS: &[&str] = &["BRAPI_TOKEN", "BRAPI_API_KEY"];

static SHARED: OnceLock<Arc<BrapiProvider>> = OnceLock::new();

/// brapi.dev data source.
///
/// Implements [`QuoteProvider`], [`HistoryProvider`] and
/// [`FundamentalsProvider`].
#[derive(Clone)]
pub struct BrapiProvider {
    client: reqwest::Client,
    token: Option<String>,
}

impl std::fmt::Debug for BrapiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrapiProvider")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl BrapiProvider {
    /// Create a new brapi provider, optionally authenticated.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, token }
    }

    /// Create a provider with the token from the environment, when set.
    #[must_use]
    pub fn from_env() -> Self {
        let token = TOKEN_ENV_VARS
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .filter(|t| !t.trim().is_empty());
        Self::new(token)
    }

    /// The process-wide shared instance, lazily constructed from the
    /// environment on first use.
    ///
    /// Initialization is idempotent: concurrent first calls observe the same
    /// fully-constructed instance.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        SHARED.get_or_init(|| Arc::new(Self::from_env())).clone()
    }

    /// Build the request path (without the token, so it can double as a
    /// cache/log key).
    fn quote_path(
        ticker: &Ticker,
        range: Option<HistoryRange>,
        interval: Option<HistoryInterval>,
        modules: Option<&str>,
    ) -> String {
        let mut path = format!("{}?", ticker.as_str());
        if let Some(range) = range {
            path.push_str(&format!("range={}&", range.as_token()));
        }
        if let Some(interval) = interval {
            path.push_str(&format!("interval={}&", interval.as_token()));
        }
        if let Some(modules) = modules {
            path.push_str(&format!("modules={modules}&"));
        }
        path.pop();
        path
    }

    /// The `modules` request parameter for a module selection, if any.
    fn modules_param(modules: &FundamentalModules) -> Option<String> {
        let mut names = Vec::new();
        if modules.key_statistics {
            names.push("defaultKeyStatistics");
        }
        if modules.financial_data {
            names.push("financialData");
        }
        if modules.balance_sheet_history {
            names.push("balanceSheetHistory");
        }
        (!names.is_empty()).then(|| names.join(","))
    }

    /// Make a quote request and return the first result.
    async fn fetch_raw_quote(
        &self,
        ticker: &Ticker,
        range: Option<HistoryRange>,
        interval: Option<HistoryInterval>,
        modules: Option<&str>,
    ) -> Result<BrapiQuote> {
        let path = Self::quote_path(ticker, range, interval, modules);
        debug!("brapi request: {}", path);

        let mut url = format!("{BRAPI_BASE_URL}/{path}");
        if let Some(token) = &self.token {
            url.push(if path.contains('?') { '&' } else { '?' });
            url.push_str(&format!("token={token}"));
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited {
                    provider: "brapi".to_string(),
                    retry_after: None,
                });
            }
            reqwest::StatusCode::NOT_FOUND => {
                return Err(ProviderError::TickerNotFound(ticker.to_string()));
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(ProviderError::AuthenticationFailed("brapi".to_string()));
            }
            status if !status.is_success() => {
                return Err(ProviderError::Network(format!("HTTP {status} for {ticker}")));
            }
            _ => {}
        }

        let payload: QuoteListResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        payload
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::TickerNotFound(ticker.to_string()))
    }
}

impl Default for BrapiProvider {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DataProvider for BrapiProvider {
    fn name(&self) -> &str {
        "brapi"
    }

    fn description(&self) -> &str {
        "brapi.dev quote API for B3 spot prices, history and fundamentals"
    }
}

#[async_trait]
impl QuoteProvider for BrapiProvider {
    async fn fetch_quote(&self, ticker: &Ticker) -> Result<f64> {
        let quote = self.fetch_raw_quote(ticker, None, None, None).await?;
        quote
            .spot_price()
            .ok_or_else(|| ProviderError::DataNotAvailable {
                provider: "brapi".to_string(),
                ticker: ticker.to_string(),
            })
    }
}

#[async_trait]
impl HistoryProvider for BrapiProvider {
    async fn fetch_history(
        &self,
        ticker: &Ticker,
        range: HistoryRange,
        interval: HistoryInterval,
    ) -> Result<PriceSeries> {
        let quote = self
            .fetch_raw_quote(ticker, Some(range), Some(interval), None)
            .await?;
        let series = quote.price_series();
        if series.is_empty() {
            return Err(ProviderError::DataNotAvailable {
                provider: "brapi".to_string(),
                ticker: ticker.to_string(),
            });
        }
        Ok(series)
    }
}

#[async_trait]
impl FundamentalsProvider for BrapiProvider {
    async fn fetch_fundamentals(
        &self,
        ticker: &Ticker,
        modules: &FundamentalModules,
    ) -> Result<FundamentalSnapshot> {
        let modules_param = Self::modules_param(modules);
        let quote = self
            .fetch_raw_quote(ticker, None, None, modules_param.as_deref())
            .await?;
        Ok(quote.snapshot())
    }
}

// ============================================================================
// brapi API Response Types
// ============================================================================

/// Top-level quote API response.
#[derive(Debug, Deserialize)]
struct QuoteListResponse {
    #[serde(default)]
    results: Vec<BrapiQuote>,
}

/// One quote result. brapi mirrors Yahoo's field names but has shipped both
/// camelCase and snake_case spellings over time, hence the alias lists.
#[derive(Debug, Default, Deserialize)]
struct BrapiQuote {
    #[serde(default, rename = "regularMarketPrice", alias = "regular_market_price")]
    regular_market_price: Option<f64>,
    #[serde(
        default,
        rename = "regularMarketPreviousClose",
        alias = "regular_market_previous_close"
    )]
    regular_market_previous_close: Option<f64>,
    #[serde(default, rename = "regularMarketVolume", alias = "regular_market_volume")]
    regular_market_volume: Option<f64>,
    #[serde(
        default,
        rename = "averageDailyVolume3Month",
        alias = "average_daily_volume3_month",
        alias = "average_daily_volume_3_month"
    )]
    average_daily_volume_3_month: Option<f64>,
    #[serde(
        default,
        rename = "averageDailyVolume10Day",
        alias = "average_daily_volume10_day",
        alias = "average_daily_volume_10_day"
    )]
    average_daily_volume_10_day: Option<f64>,
    #[serde(default, rename = "marketCap", alias = "market_cap")]
    market_cap: Option<f64>,
    #[serde(
        default,
        rename = "netAssetValue",
        alias = "net_asset_value",
        alias = "navPrice",
        alias = "nav_price"
    )]
    net_asset_value: Option<f64>,
    #[serde(
        default,
        rename = "historicalDataPrice",
        alias = "historical_data_price"
    )]
    historical_data_price: Vec<BrapiBar>,
    #[serde(
        default,
        rename = "defaultKeyStatistics",
        alias = "default_key_statistics"
    )]
    default_key_statistics: KeyStatistics,
    #[serde(default, rename = "financialData", alias = "financial_data")]
    financial_data: FinancialData,
    #[serde(
        default,
        rename = "balanceSheetHistory",
        alias = "balance_sheet_history"
    )]
    balance_sheet_history: Vec<BalanceSheet>,
}

#[derive(Debug, Deserialize)]
struct BrapiBar {
    date: i64,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    #[serde(default)]
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct KeyStatistics {
    #[serde(default, rename = "priceToBook", alias = "price_to_book")]
    price_to_book: Option<f64>,
    #[serde(default, rename = "bookValue", alias = "book_value")]
    book_value: Option<f64>,
    #[serde(default, rename = "sharesOutstanding", alias = "shares_outstanding")]
    shares_outstanding: Option<f64>,
    #[serde(default, rename = "dividendYield", alias = "dividend_yield")]
    dividend_yield: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct FinancialData {
    #[serde(default, rename = "debtToEquity", alias = "debt_to_equity")]
    debt_to_equity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct BalanceSheet {
    #[serde(default, rename = "endDate", alias = "end_date")]
    end_date: Option<String>,
    #[serde(
        default,
        rename = "totalStockholderEquity",
        alias = "total_stockholder_equity",
        alias = "totalStockholdersEquity",
        alias = "total_stockholders_equity",
        alias = "shareholdersEquity",
        alias = "shareholders_equity"
    )]
    total_stockholder_equity: Option<f64>,
}

impl BrapiQuote {
    /// Spot price: regular price, then previous close, then last history close.
    fn spot_price(&self) -> Option<f64> {
        self.regular_market_price
            .or(self.regular_market_previous_close)
            .or_else(|| self.price_series().last_close())
            .filter(|p| p.is_finite())
    }

    /// Convert the embedded history into a price series.
    fn price_series(&self) -> PriceSeries {
        let bars = self
            .historical_data_price
            .iter()
            .filter_map(|bar| {
                let date = Utc
                    .timestamp_opt(bar.date, 0)
                    .single()
                    .map(|dt| dt.date_naive())?;
                let close = bar.close?;
                Some(OhlcvBar::new(
                    date,
                    bar.open.unwrap_or(close),
                    bar.high.unwrap_or(close),
                    bar.low.unwrap_or(close),
                    close,
                    bar.volume.unwrap_or(0.0),
                ))
            })
            .collect();
        PriceSeries::new(bars)
    }

    /// Average daily volume, preferring the longer sampling window.
    fn avg_volume(&self) -> Option<f64> {
        self.average_daily_volume_3_month
            .or(self.average_daily_volume_10_day)
            .or(self.regular_market_volume)
    }

    /// Equity from the most recent balance-sheet snapshot.
    fn latest_equity(&self) -> Option<f64> {
        self.balance_sheet_history
            .iter()
            .max_by_key(|sheet| {
                sheet
                    .end_date
                    .as_deref()
                    .and_then(parse_sheet_date)
                    .unwrap_or(NaiveDate::MIN)
            })
            .and_then(|sheet| sheet.total_stockholder_equity)
    }

    /// Fold the payload into a fundamentals snapshot.
    fn snapshot(&self) -> FundamentalSnapshot {
        let stats = &self.default_key_statistics;
        FundamentalSnapshot {
            price: self.spot_price(),
            price_to_book: stats.price_to_book,
            book_value: stats.book_value,
            nav: self.net_asset_value,
            dividend_yield: stats.dividend_yield,
            avg_volume: self.avg_volume(),
            debt_to_equity: self.financial_data.debt_to_equity,
            market_cap: self.market_cap,
            shares_outstanding: stats.shares_outstanding,
            equity: self.latest_equity(),
            daily_liquidity: None,
        }
    }
}

/// Balance sheets have shipped both plain dates and full timestamps.
fn parse_sheet_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_path_carries_optional_params() {
        let ticker = Ticker::new("mxrf11");
        assert_eq!(
            BrapiProvider::quote_path(&ticker, None, None, None),
            "MXRF11"
        );
        assert_eq!(
            BrapiProvider::quote_path(
                &ticker,
                Some(HistoryRange::OneYear),
                Some(HistoryInterval::Daily),
                None
            ),
            "MXRF11?range=1y&interval=1d"
        );
        assert_eq!(
            BrapiProvider::quote_path(&ticker, None, None, Some("defaultKeyStatistics")),
            "MXRF11?modules=defaultKeyStatistics"
        );
    }

    #[test]
    fn modules_param_reflects_selection() {
        assert_eq!(
            BrapiProvider::modules_param(&FundamentalModules::all()).as_deref(),
            Some("defaultKeyStatistics,financialData,balanceSheetHistory")
        );
        assert_eq!(BrapiProvider::modules_param(&FundamentalModules::none()), None);
    }

    #[test]
    fn spot_price_prefers_regular_market_price() {
        let quote: BrapiQuote = serde_json::from_str(
            r#"{ "regularMarketPrice": 10.2, "regularMarketPreviousClose": 10.0 }"#,
        )
        .unwrap();
        assert_eq!(quote.spot_price(), Some(10.2));

        let quote: BrapiQuote =
            serde_json::from_str(r#"{ "regularMarketPreviousClose": 10.0 }"#).unwrap();
        assert_eq!(quote.spot_price(), Some(10.0));
    }

    #[test]
    fn history_converts_to_ordered_series() {
        let quote: BrapiQuote = serde_json::from_str(
            r#"{
                "historicalDataPrice": [
                    { "date": 1704153600, "open": 10.1, "high": 10.6, "low": 10.0, "close": 10.3, "volume": 120000 },
                    { "date": 1704067200, "open": 10.0, "high": 10.5, "low": 9.8, "close": 10.2, "volume": 100000 },
                    { "date": 1704240000, "close": null }
                ]
            }"#,
        )
        .unwrap();
        let series = quote.price_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![10.2, 10.3]);
    }

    #[test]
    fn snapshot_extracts_fundamentals_with_fallbacks() {
        let quote: BrapiQuote = serde_json::from_str(
            r#"{
                "regularMarketPrice": 9.6,
                "marketCap": 960000,
                "averageDailyVolume10Day": 80000,
                "regularMarketVolume": 50000,
                "defaultKeyStatistics": {
                    "priceToBook": 0.92,
                    "sharesOutstanding": 100000,
                    "dividendYield": 8.5
                },
                "financialData": { "debtToEquity": 42.5 },
                "balanceSheetHistory": [
                    { "endDate": "2022-12-31", "totalStockholderEquity": 900000 },
                    { "endDate": "2023-12-31", "totalStockholderEquity": 1040000 }
                ]
            }"#,
        )
        .unwrap();
        let snapshot = quote.snapshot();
        assert_eq!(snapshot.price, Some(9.6));
        assert_eq!(snapshot.price_to_book, Some(0.92));
        // 3-month average is absent, so the 10-day window wins over raw volume
        assert_eq!(snapshot.avg_volume, Some(80_000.0));
        assert_eq!(snapshot.equity, Some(1_040_000.0));
        assert_eq!(snapshot.debt_to_equity, Some(42.5));
    }

    #[test]
    fn snake_case_payloads_are_accepted() {
        let quote: BrapiQuote = serde_json::from_str(
            r#"{
                "regular_market_price": 9.6,
                "default_key_statistics": { "price_to_book": 0.92 }
            }"#,
        )
        .unwrap();
        assert_eq!(quote.spot_price(), Some(9.6));
        assert_eq!(quote.snapshot().price_to_book, Some(0.92));
    }

    #[test]
    fn shared_instance_is_memoized() {
        let a = BrapiProvider::shared();
        let b = BrapiProvider::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn debug_redacts_token() {
        let provider = BrapiProvider::new(Some("secret_token".to_string()));
        let debug_str = format!("{provider:?}");
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
