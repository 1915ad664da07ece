//! Provider traits for fetching market data.
//!
//! This module defines the core provider traits:
//!
//! - [`DataProvider`] - Base trait for all data sources
//! - [`QuoteProvider`] - Current spot price
//! - [`HistoryProvider`] - Daily OHLCV history
//! - [`FundamentalsProvider`] - Fundamental metric snapshots
//!
//! Implementations return [`ProviderError`](crate::ProviderError) on failure;
//! the analyzer converts any error into "this source has no opinion", so a
//! provider never needs to recover beyond reporting what went wrong.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{FundamentalModules, FundamentalSnapshot, HistoryInterval, HistoryRange, PriceSeries, Ticker},
};

/// Base trait for all data sources.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "Yahoo Finance").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for the current spot price of an instrument.
#[async_trait]
pub trait QuoteProvider: DataProvider {
    /// Fetches the current regular market price for a ticker.
    async fn fetch_quote(&self, ticker: &Ticker) -> Result<f64>;
}

/// Provider for daily OHLCV price history.
#[async_trait]
pub trait HistoryProvider: DataProvider {
    /// Fetches the price history for a ticker.
    ///
    /// The returned series is date-ordered. Callers check
    /// [`PriceSeries::is_usable`] before computing indicators over it.
    async fn fetch_history(
        &self,
        ticker: &Ticker,
        range: HistoryRange,
        interval: HistoryInterval,
    ) -> Result<PriceSeries>;
}

/// A full-capability source: quote, history and fundamentals.
///
/// Blanket-implemented, so any type carrying the three capability traits can
/// be held as a `dyn MarketDataProvider` and swapped for a canned source in
/// tests.
pub trait MarketDataProvider: QuoteProvider + HistoryProvider + FundamentalsProvider {}

impl<T> MarketDataProvider for T where T: QuoteProvider + HistoryProvider + FundamentalsProvider {}

/// Provider for fundamental metric snapshots.
#[async_trait]
pub trait FundamentalsProvider: DataProvider {
    /// Fetches this source's candidate values for the tracked metrics.
    ///
    /// `modules` selects which extended data the source should be asked for;
    /// sources that do not distinguish modules ignore it. Individual metrics
    /// the source cannot answer come back as `None` inside the snapshot, not
    /// as an error.
    async fn fetch_fundamentals(
        &self,
        ticker: &Ticker,
        modules: &FundamentalModules,
    ) -> Result<FundamentalSnapshot>;
}
