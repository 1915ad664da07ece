//! The analysis pipeline: fetch, reconcile, compute, score.

use std::sync::Arc;

use tracing::{debug, warn};

use cota_brapi::BrapiProvider;
use cota_cache::SqliteCache;
use cota_core::{
    FundamentalModules, FundamentalSnapshot, FundamentalsProvider, HistoryInterval, HistoryProvider,
    HistoryRange, MarketDataProvider, QuoteProvider, Result, Ticker,
};
use cota_investidor10::Investidor10Provider;
use cota_yahoo::YahooProvider;

use crate::config::AnalyzerConfig;
use crate::indicators::{self, Trend, RSI_PERIOD, SMA_PERIOD};
use crate::reconcile::{
    normalize_yield_percent, resolve_liquidity, resolve_price_to_book, select_metric, select_price,
    SourceSet,
};
use crate::score::{self, ScoreInputs, Signal, Verdict};

/// A completed analysis of one ticker.
///
/// Immutable once built; the display metrics are the reconciled values the
/// score was computed from.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    /// The analyzed ticker.
    pub ticker: Ticker,
    /// Reconciled price.
    pub price: f64,
    /// Whether the price candidates agreed within tolerance; `None` when
    /// only one source had a price.
    pub price_match: Option<bool>,
    /// Reconciled P/VP, possibly derived.
    pub price_to_book: Option<f64>,
    /// Latest RSI-14.
    pub rsi: Option<f64>,
    /// Reconciled dividend yield, in percent.
    pub dividend_yield_pct: Option<f64>,
    /// Average daily traded value, in currency.
    pub daily_liquidity: Option<f64>,
    /// Debt-to-equity ratio, in percent.
    pub debt_to_equity: Option<f64>,
    /// Price position relative to the SMA-200.
    pub trend: Trend,
    /// Signed rule-table score.
    pub score: i32,
    /// Signals in rule evaluation order.
    pub signals: Vec<Signal>,
    /// Verdict tier for the score.
    pub verdict: Verdict,
}

impl Analysis {
    /// Render the fixed-format plain-text report.
    #[must_use]
    pub fn report(&self) -> String {
        crate::report::render(self)
    }
}

/// A price-only lookup result with its per-source candidates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceQuote {
    /// Reconciled price.
    pub price: f64,
    /// The primary source's candidate.
    pub yahoo: Option<f64>,
    /// The secondary source's candidate.
    pub brapi: Option<f64>,
    /// Agreement flag; `None` unless both candidates were present.
    pub matched: Option<bool>,
}

/// Multi-source analyzer over the three data providers.
#[derive(Debug)]
pub struct Analyzer {
    yahoo: Arc<dyn MarketDataProvider>,
    brapi: Arc<dyn MarketDataProvider>,
    scraper: Arc<dyn FundamentalsProvider>,
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Create an analyzer with the given configuration.
    ///
    /// When a cache path is configured the Yahoo client gets a SQLite
    /// response cache; a cache that fails to open is logged and skipped.
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        let mut yahoo = YahooProvider::new();
        if let Some(path) = &config.cache_path {
            match SqliteCache::new(path) {
                Ok(cache) => yahoo = yahoo.with_response_cache(Arc::new(cache)),
                Err(e) => warn!(error = %e, "Response cache unavailable, continuing without"),
            }
        }
        Self::with_sources(
            Arc::new(yahoo),
            BrapiProvider::shared(),
            Arc::new(Investidor10Provider::new()),
            config,
        )
    }

    /// Create an analyzer over explicit sources.
    ///
    /// `yahoo` is the preferred source, `brapi` the override fallback and
    /// `scraper` the fundamentals-only fill for funds.
    #[must_use]
    pub fn with_sources(
        yahoo: Arc<dyn MarketDataProvider>,
        brapi: Arc<dyn MarketDataProvider>,
        scraper: Arc<dyn FundamentalsProvider>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            yahoo,
            brapi,
            scraper,
            config,
        }
    }

    /// Create an analyzer configured from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(AnalyzerConfig::from_env())
    }

    /// Analyze a ticker end to end.
    ///
    /// Returns `None` when no source can supply a usable price history
    /// (at least 100 daily bars) or when the ticker is unknown everywhere.
    /// Every other data gap degrades gracefully into `N/A` metrics.
    pub async fn analyze(&self, ticker: &str) -> Option<Analysis> {
        let ticker = Ticker::new(ticker);
        let modules = FundamentalModules::all();

        let (history, yahoo_fundamentals) = tokio::join!(
            self.yahoo
                .fetch_history(&ticker, HistoryRange::OneYear, HistoryInterval::Daily),
            self.yahoo.fetch_fundamentals(&ticker, &modules),
        );

        let mut history = silence("yahoo", history).unwrap_or_default();
        if !history.is_usable() {
            debug!(ticker = %ticker, "Primary history too short, trying secondary");
            if let Some(fallback) = silence(
                "brapi",
                self.brapi
                    .fetch_history(&ticker, HistoryRange::OneYear, HistoryInterval::Daily)
                    .await,
            ) {
                history = fallback;
            }
        }
        if !history.is_usable() {
            warn!(ticker = %ticker, bars = history.len(), "Insufficient history, aborting analysis");
            return None;
        }

        let closes = history.closes();
        let rsi = indicators::rsi(&closes, RSI_PERIOD);
        let long_sma = indicators::sma(&closes, SMA_PERIOD);
        let history_price = history.last_close();

        let yahoo_snapshot = silence("yahoo", yahoo_fundamentals).unwrap_or_default();

        // Extended brapi modules cost an extra upstream call on their side;
        // only ask for them when the primary source left gaps.
        let brapi_modules = if has_fundamental_gaps(&yahoo_snapshot) {
            modules
        } else {
            FundamentalModules::none()
        };
        let brapi_snapshot = silence(
            "brapi",
            self.brapi.fetch_fundamentals(&ticker, &brapi_modules).await,
        )
        .unwrap_or_default();

        let mut scraped = FundamentalSnapshot::default();
        if self.config.use_investidor10 && ticker.is_fund() && has_fundamental_gaps(&yahoo_snapshot)
        {
            scraped = silence(
                "investidor10",
                self.scraper.fetch_fundamentals(&ticker, &modules).await,
            )
            .unwrap_or_default();
        }

        let selection = select_price(
            history_price,
            brapi_snapshot.price,
            true,
            self.config.price_match_tolerance,
        );
        let price = selection.value.or(scraped.price)?;

        Some(assemble(
            &self.config,
            ticker,
            price,
            selection.matched,
            rsi,
            long_sma,
            &SourceSet {
                yahoo: &yahoo_snapshot,
                brapi: &brapi_snapshot,
                scraped: &scraped,
            },
        ))
    }

    /// Look up the current price only.
    ///
    /// Both API sources are queried concurrently; returns `None` when
    /// neither has a price.
    pub async fn price(&self, ticker: &str) -> Option<PriceQuote> {
        let ticker = Ticker::new(ticker);
        let (yahoo, brapi) = tokio::join!(
            self.yahoo.fetch_quote(&ticker),
            self.brapi.fetch_quote(&ticker),
        );
        let yahoo = silence("yahoo", yahoo);
        let brapi = silence("brapi", brapi);

        let selection = select_price(yahoo, brapi, true, self.config.price_match_tolerance);
        let price = selection.value?;
        Some(PriceQuote {
            price,
            yahoo,
            brapi,
            matched: selection.matched,
        })
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

/// Reconcile, score and package the analysis. Pure given its inputs.
fn assemble(
    config: &AnalyzerConfig,
    ticker: Ticker,
    price: f64,
    price_match: Option<bool>,
    rsi: Option<f64>,
    long_sma: Option<f64>,
    sources: &SourceSet<'_>,
) -> Analysis {
    let price_to_book = resolve_price_to_book(sources, Some(price));
    let dividend_yield_pct = normalize_yield_percent(
        sources.fold(|s| s.dividend_yield),
        config.yield_percent_threshold,
    );
    let daily_liquidity = resolve_liquidity(sources, Some(price));
    let debt_to_equity = select_metric(sources.yahoo.debt_to_equity, sources.brapi.debt_to_equity);

    let card = score::score(&ScoreInputs {
        price_to_book,
        dividend_yield_pct,
        daily_liquidity,
        debt_to_equity,
        rsi,
        is_fund: ticker.is_fund(),
    });
    let verdict = card.verdict();

    Analysis {
        trend: Trend::of(price, long_sma),
        ticker,
        price,
        price_match,
        price_to_book,
        rsi,
        dividend_yield_pct,
        daily_liquidity,
        debt_to_equity,
        score: card.score,
        signals: card.signals,
        verdict,
    }
}

/// True when any metric the secondary/tertiary sources could fill is missing.
///
/// NAV is not checked: it only backs the P/VP derivation, so a snapshot that
/// already carries P/VP or book value has no use for it.
fn has_fundamental_gaps(snapshot: &FundamentalSnapshot) -> bool {
    snapshot.price_to_book.is_none()
        || snapshot.book_value.is_none()
        || snapshot.dividend_yield.is_none()
        || snapshot.avg_volume.is_none()
        || snapshot.debt_to_equity.is_none()
        || snapshot.market_cap.is_none()
}

/// Convert a provider failure into source silence, with a trace of why.
fn silence<T>(provider: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(provider, error = %e, "Source failed, treating it as silent");
            None
        }
    }
}
