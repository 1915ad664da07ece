#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! investidor10.com.br scraping source.
//!
//! The site publishes per-fund indicator pages with no API, so this source
//! works on the rendered HTML: strip the markup down to plain text, then
//! regex-search for the labelled values. The page layout changes occasionally;
//! every extractor is independent and a label that stops matching simply
//! leaves its metric absent.
//!
//! Only FII pages exist on the site, so the provider rejects non-fund tickers
//! up front.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use cota_core::normalize::{finite, parse_localized_number, parse_magnitude_value, strip_markup};
use cota_core::{
    DataProvider, FundamentalModules, FundamentalSnapshot, FundamentalsProvider, ProviderError,
    Result, Ticker,
};
use regex::Regex;
use tracing::debug;

/// Base URL of the per-fund indicator pages.
const BASE_URL: &str = "https://investidor10.com.br/fiis";

/// Upper bound on any single request.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Browser user agent; the site rejects obvious non-browser clients.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

static PVP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bP/VP\b[:\s]*([0-9][0-9.,]+)").expect("valid regex"));

static DY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bDY\s*\(12M\)\s*([0-9][0-9.,]+)").expect("valid regex"));

static DY_FALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Dividend\s*Y(?:ield|eld).*?([0-9][0-9.,]+)\s*%").expect("valid regex")
});

static LIQUIDITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Liquidez\s*Di[áa]ria\s*R\$\s*([0-9.,]+\s*[a-zA-Z]*)").expect("valid regex")
});

static NAV_PER_SHARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)VAL(?:\.|OR)?\s*PATRIMONIAL\s*P/\s*COTA\s*R\$\s*([0-9.,]+)")
        .expect("valid regex")
});

static EQUITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)VALOR\s*PATRIMONIAL\s*R\$\s*([0-9.,]+\s*[a-zA-Z]*)").expect("valid regex")
});

static SHARES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)COTAS\s*EMITIDAS\s*([0-9.,]+\s*[a-zA-Z]*)").expect("valid regex")
});

static SHARES_FALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)N[úu]mero\s*de\s*cotas\s*([0-9.,]+\s*[a-zA-Z]*)").expect("valid regex")
});

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Cotação\s*R\$\s*([0-9.,]+)").expect("valid regex"));

/// investidor10.com.br scraping source for FII fundamentals.
///
/// Implements [`FundamentalsProvider`]; the module selection is ignored since
/// a page fetch always yields everything the page shows.
#[derive(Clone, Debug)]
pub struct Investidor10Provider {
    client: reqwest::Client,
}

impl Investidor10Provider {
    /// Create a new scraping provider.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// The indicator page URL for a fund.
    fn page_url(ticker: &Ticker) -> String {
        format!("{BASE_URL}/{}/", ticker.as_str().to_lowercase())
    }

    async fn fetch_page(&self, ticker: &Ticker) -> Result<String> {
        let url = Self::page_url(ticker);
        debug!("investidor10 request: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited {
                    provider: "investidor10".to_string(),
                    retry_after: None,
                });
            }
            reqwest::StatusCode::NOT_FOUND => {
                return Err(ProviderError::TickerNotFound(ticker.to_string()));
            }
            status if !status.is_success() => {
                return Err(ProviderError::Network(format!("HTTP {status} for {ticker}")));
            }
            _ => {}
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))
    }
}

impl Default for Investidor10Provider {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the labelled indicator values from a fund page.
///
/// Works on markup-stripped text. Any label that does not match, or whose
/// value does not parse, leaves its metric as `None`.
fn extract_metrics(html: &str) -> FundamentalSnapshot {
    if html.is_empty() {
        return FundamentalSnapshot::default();
    }
    let text = strip_markup(html);

    let capture = |re: &Regex| {
        re.captures(&text)
            .map(|c| c.get(1).map_or("", |m| m.as_str()).to_string())
    };

    let price_to_book = capture(&PVP_RE).and_then(|v| finite(parse_localized_number(&v)));
    let dividend_yield = capture(&DY_RE)
        .or_else(|| capture(&DY_FALLBACK_RE))
        .and_then(|v| finite(parse_localized_number(&v)));
    let daily_liquidity = capture(&LIQUIDITY_RE).and_then(|v| finite(parse_magnitude_value(&v)));
    let book_value = capture(&NAV_PER_SHARE_RE).and_then(|v| finite(parse_localized_number(&v)));
    let equity = capture(&EQUITY_RE).and_then(|v| finite(parse_magnitude_value(&v)));
    let shares_outstanding = capture(&SHARES_RE)
        .or_else(|| capture(&SHARES_FALLBACK_RE))
        .and_then(|v| finite(parse_magnitude_value(&v)));
    let price = capture(&PRICE_RE).and_then(|v| finite(parse_localized_number(&v)));

    FundamentalSnapshot {
        price,
        price_to_book,
        book_value,
        dividend_yield,
        daily_liquidity,
        equity,
        shares_outstanding,
        ..Default::default()
    }
}

impl DataProvider for Investidor10Provider {
    fn name(&self) -> &str {
        "investidor10"
    }

    fn description(&self) -> &str {
        "investidor10.com.br scraped indicator pages for FIIs"
    }
}

#[async_trait]
impl FundamentalsProvider for Investidor10Provider {
    async fn fetch_fundamentals(
        &self,
        ticker: &Ticker,
        _modules: &FundamentalModules,
    ) -> Result<FundamentalSnapshot> {
        if !ticker.is_fund() {
            return Err(ProviderError::NotSupported(format!(
                "investidor10 only covers FIIs, not {ticker}"
            )));
        }
        let html = self.fetch_page(ticker).await?;
        let snapshot = extract_metrics(&html);
        if snapshot.is_empty() {
            return Err(ProviderError::DataNotAvailable {
                provider: "investidor10".to_string(),
                ticker: ticker.to_string(),
            });
        }
        Ok(snapshot)
    }
}
