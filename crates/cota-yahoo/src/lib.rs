#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance data source.
//!
//! This crate provides the primary time-series source of the pipeline. It
//! implements the [`QuoteProvider`], [`HistoryProvider`] and
//! [`FundamentalsProvider`] traits from `cota-core` on top of two public
//! Yahoo endpoints:
//!
//! - the chart API for OHLCV history and the current price,
//! - the quoteSummary API for fundamentals modules.
//!
//! Requests are rate limited (1 request per second by default) and bounded by
//! a 15 second timeout. An optional [`ResponseCache`] is consulted before the
//! network.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cota_core::{
    DataProvider, FundamentalModules, FundamentalSnapshot, FundamentalsProvider, HistoryInterval,
    HistoryProvider, HistoryRange, OhlcvBar, PriceSeries, ProviderError, QuoteProvider,
    ResponseCache, Result, Ticker,
};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Yahoo Finance chart API base URL.
const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance quote summary API base URL.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// Upper bound on any single request.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Yahoo Finance data source.
///
/// Implements [`QuoteProvider`], [`HistoryProvider`] and
/// [`FundamentalsProvider`].
pub struct YahooProvider {
    client: reqwest::Client,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl std::fmt::Debug for YahooProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooProvider")
            .field("rate_limit_ms", &self.rate_limit_ms)
            .field("cache", &self.cache.as_ref().map(|_| "configured"))
            .finish()
    }
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new Yahoo Finance provider with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            rate_limit_ms: rate_limit.as_millis() as u64,
            last_request_time: AtomicU64::new(0),
            cache: None,
        }
    }

    /// Consult the given response cache before going to the network.
    #[must_use]
    pub fn with_response_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now.saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            Ordering::Relaxed,
        );
    }

    /// Build the chart API path for a ticker.
    fn chart_path(ticker: &Ticker, range: HistoryRange, interval: HistoryInterval) -> String {
        format!(
            "{}?range={}&interval={}",
            ticker.yahoo_symbol(),
            range.as_token(),
            interval.as_token()
        )
    }

    /// Build the quoteSummary path for a ticker.
    fn summary_path(ticker: &Ticker, modules: &FundamentalModules) -> String {
        let mut names = vec!["summaryDetail", "price"];
        if modules.key_statistics {
            names.push("defaultKeyStatistics");
        }
        if modules.financial_data {
            names.push("financialData");
        }
        if modules.balance_sheet_history {
            names.push("balanceSheetHistory");
        }
        format!("{}?modules={}", ticker.yahoo_symbol(), names.join(","))
    }

    /// Fetch a response body, going through the cache when one is configured.
    async fn get_text(&self, ticker: &Ticker, base: &str, path: &str) -> Result<String> {
        if let Some(cache) = &self.cache {
            match cache.get(self.name(), path).await {
                Ok(Some(body)) => return Ok(body),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Cache read failed, fetching fresh"),
            }
        }

        self.apply_rate_limit().await;

        let url = format!("{base}/{path}");
        debug!("Yahoo request: {}", path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                provider: "Yahoo Finance".to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::TickerNotFound(ticker.to_string()));
        }

        if !response.status().is_success() {
            return Err(ProviderError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                ticker
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(self.name(), path, &body).await {
                warn!(error = %e, "Failed to cache Yahoo response");
            }
        }

        Ok(body)
    }

    /// Fetch and decode a chart API response.
    async fn fetch_chart(
        &self,
        ticker: &Ticker,
        range: HistoryRange,
        interval: HistoryInterval,
    ) -> Result<ChartData> {
        let path = Self::chart_path(ticker, range, interval);
        let body = self.get_text(ticker, CHART_API_URL, &path).await?;

        let response: ChartResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(error) = response.chart.error {
            if error.code == "Not Found" {
                return Err(ProviderError::TickerNotFound(ticker.to_string()));
            }
            return Err(ProviderError::Other(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        response
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::TickerNotFound(ticker.to_string()))
    }

    /// Convert a chart payload into a price series.
    fn parse_chart_series(ticker: &Ticker, data: ChartData) -> Result<PriceSeries> {
        let timestamps = data.timestamp.unwrap_or_default();
        if timestamps.is_empty() {
            return Err(ProviderError::DataNotAvailable {
                provider: "Yahoo Finance".to_string(),
                ticker: ticker.to_string(),
            });
        }

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("Missing quote data".to_string()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let Some(date) = Utc.timestamp_opt(ts, 0).single().map(|dt| dt.date_naive()) else {
                continue;
            };
            // Yahoo pads holiday rows with nulls; skip incomplete bars.
            let (Some(open), Some(high), Some(low), Some(close)) = (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
            ) else {
                continue;
            };
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0) as f64;
            bars.push(OhlcvBar::new(date, open, high, low, close, volume));
        }

        Ok(PriceSeries::new(bars))
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    fn description(&self) -> &str {
        "Yahoo Finance data source for OHLCV history, spot price and fundamentals"
    }
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    async fn fetch_quote(&self, ticker: &Ticker) -> Result<f64> {
        let data = self
            .fetch_chart(ticker, HistoryRange::ThreeMonths, HistoryInterval::Daily)
            .await?;

        let meta = data.meta.clone().unwrap_or_default();
        let from_meta = meta
            .regular_market_price
            .or(meta.previous_close)
            .or(meta.chart_previous_close);

        if let Some(price) = from_meta.filter(|p| p.is_finite()) {
            return Ok(price);
        }

        Self::parse_chart_series(ticker, data)?
            .last_close()
            .ok_or_else(|| ProviderError::DataNotAvailable {
                provider: "Yahoo Finance".to_string(),
                ticker: ticker.to_string(),
            })
    }
}

#[async_trait]
impl HistoryProvider for YahooProvider {
    async fn fetch_history(
        &self,
        ticker: &Ticker,
        range: HistoryRange,
        interval: HistoryInterval,
    ) -> Result<PriceSeries> {
        let data = self.fetch_chart(ticker, range, interval).await?;
        Self::parse_chart_series(ticker, data)
    }
}

#[async_trait]
impl FundamentalsProvider for YahooProvider {
    async fn fetch_fundamentals(
        &self,
        ticker: &Ticker,
        modules: &FundamentalModules,
    ) -> Result<FundamentalSnapshot> {
        let path = Self::summary_path(ticker, modules);
        let body = self.get_text(ticker, QUOTE_SUMMARY_URL, &path).await?;

        let response: QuoteSummaryResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        let result = response
            .quote_summary
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::TickerNotFound(ticker.to_string()))?;

        let stats = result.default_key_statistics.unwrap_or_default();
        let detail = result.summary_detail.unwrap_or_default();
        let financial = result.financial_data.unwrap_or_default();
        let price_block = result.price.unwrap_or_default();

        // Most recent balance-sheet snapshot carries the equity figure.
        let equity = result
            .balance_sheet_history
            .and_then(|h| {
                h.balance_sheet_statements
                    .into_iter()
                    .max_by_key(|s| s.end_date.raw.map(|v| v as i64).unwrap_or(i64::MIN))
            })
            .and_then(|s| s.total_stockholder_equity.raw);

        Ok(FundamentalSnapshot {
            price: price_block
                .regular_market_price
                .raw
                .or(detail.previous_close.raw),
            price_to_book: stats.price_to_book.raw,
            book_value: stats.book_value.raw,
            nav: stats.nav_price.raw,
            dividend_yield: detail
                .dividend_yield
                .raw
                .or(detail.trailing_annual_dividend_yield.raw),
            avg_volume: detail.average_volume.raw.or(detail.volume.raw),
            debt_to_equity: financial.debt_to_equity.raw,
            market_cap: price_block.market_cap.raw.or(detail.market_cap.raw),
            shares_outstanding: stats.shares_outstanding.raw,
            equity,
            daily_liquidity: None,
        })
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    result: Vec<ChartData>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Quote Summary API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(default)]
    result: Vec<QuoteSummaryData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryData {
    default_key_statistics: Option<KeyStatistics>,
    summary_detail: Option<SummaryDetail>,
    financial_data: Option<FinancialData>,
    price: Option<PriceBlock>,
    balance_sheet_history: Option<BalanceSheetHistory>,
}

/// Yahoo wraps every numeric field in a `{ "raw": ..., "fmt": ... }` object.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    #[serde(default)]
    price_to_book: RawValue,
    #[serde(default)]
    book_value: RawValue,
    #[serde(default)]
    nav_price: RawValue,
    #[serde(default)]
    shares_outstanding: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(default)]
    previous_close: RawValue,
    #[serde(default)]
    dividend_yield: RawValue,
    #[serde(default)]
    trailing_annual_dividend_yield: RawValue,
    #[serde(default)]
    average_volume: RawValue,
    #[serde(default)]
    volume: RawValue,
    #[serde(default)]
    market_cap: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    #[serde(default)]
    debt_to_equity: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceBlock {
    #[serde(default)]
    regular_market_price: RawValue,
    #[serde(default)]
    market_cap: RawValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceSheetHistory {
    #[serde(default)]
    balance_sheet_statements: Vec<BalanceSheetStatement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceSheetStatement {
    #[serde(default)]
    end_date: RawValue,
    #[serde(default)]
    total_stockholder_equity: RawValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_path_maps_b3_symbols() {
        let ticker = Ticker::new("petr4");
        let path = YahooProvider::chart_path(&ticker, HistoryRange::OneYear, HistoryInterval::Daily);
        assert_eq!(path, "PETR4.SA?range=1y&interval=1d");
    }

    #[test]
    fn summary_path_selects_modules() {
        let ticker = Ticker::new("MXRF11");
        let all = YahooProvider::summary_path(&ticker, &FundamentalModules::all());
        assert!(all.starts_with("MXRF11.SA?modules="));
        assert!(all.contains("defaultKeyStatistics"));
        assert!(all.contains("financialData"));
        assert!(all.contains("balanceSheetHistory"));

        let minimal = YahooProvider::summary_path(
            &ticker,
            &FundamentalModules {
                key_statistics: true,
                financial_data: false,
                balance_sheet_history: false,
            },
        );
        assert!(minimal.contains("defaultKeyStatistics"));
        assert!(!minimal.contains("financialData"));
    }

    #[test]
    fn parses_chart_payload_into_series() {
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": { "regularMarketPrice": 30.5 },
                    "timestamp": [1704067200, 1704153600, 1704240000],
                    "indicators": {
                        "quote": [{
                            "open": [10.0, null, 10.4],
                            "high": [10.5, 10.6, 10.9],
                            "low": [9.8, 10.0, 10.2],
                            "close": [10.2, 10.3, 10.6],
                            "volume": [100000, 120000, null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        let data = response.chart.result.into_iter().next().unwrap();
        let ticker = Ticker::new("PETR4");
        let series = YahooProvider::parse_chart_series(&ticker, data).unwrap();

        // The null-open bar is dropped, the null-volume bar defaults to 0
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![10.2, 10.6]);
        assert_eq!(series.bars()[1].volume, 0.0);
    }

    #[test]
    fn parses_quote_summary_fundamentals() {
        let body = r#"{
            "quoteSummary": {
                "result": [{
                    "defaultKeyStatistics": {
                        "priceToBook": { "raw": 0.92, "fmt": "0.92" },
                        "bookValue": { "raw": 10.4 },
                        "sharesOutstanding": { "raw": 100000 }
                    },
                    "summaryDetail": {
                        "dividendYield": { "raw": 0.085 },
                        "averageVolume": { "raw": 250000 }
                    },
                    "financialData": {
                        "debtToEquity": { "raw": 42.5 }
                    },
                    "price": {
                        "regularMarketPrice": { "raw": 9.6 },
                        "marketCap": { "raw": 960000 }
                    },
                    "balanceSheetHistory": {
                        "balanceSheetStatements": [
                            { "endDate": { "raw": 1672531200 }, "totalStockholderEquity": { "raw": 900000 } },
                            { "endDate": { "raw": 1704067200 }, "totalStockholderEquity": { "raw": 1040000 } }
                        ]
                    }
                }]
            }
        }"#;
        let response: QuoteSummaryResponse = serde_json::from_str(body).unwrap();
        let result = response.quote_summary.result.into_iter().next().unwrap();
        let stats = result.default_key_statistics.unwrap();
        assert_eq!(stats.price_to_book.raw, Some(0.92));

        // Latest balance sheet by end date wins
        let equity = result
            .balance_sheet_history
            .unwrap()
            .balance_sheet_statements
            .into_iter()
            .max_by_key(|s| s.end_date.raw.map(|v| v as i64).unwrap_or(i64::MIN))
            .and_then(|s| s.total_stockholder_equity.raw);
        assert_eq!(equity, Some(1_040_000.0));
    }

    #[test]
    fn provider_metadata() {
        let provider = YahooProvider::new();
        assert_eq!(provider.name(), "Yahoo Finance");
        assert!(!provider.description().is_empty());
    }
}
