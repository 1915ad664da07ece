#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for B3 market data sources.
//!
//! This crate provides the foundational abstractions the analysis pipeline
//! builds on:
//!
//! - [`DataProvider`](provider::DataProvider) - Base trait for all sources
//! - [`QuoteProvider`](provider::QuoteProvider) - Current spot price
//! - [`HistoryProvider`](provider::HistoryProvider) - Daily OHLCV history
//! - [`FundamentalsProvider`](provider::FundamentalsProvider) - Fundamental snapshots
//! - [`ResponseCache`](cache::ResponseCache) - Raw response caching
//! - [`normalize`] - pt-BR numeric/markup normalization

/// Cache trait for raw provider responses.
pub mod cache;
/// Error types for data-source operations.
pub mod error;
/// Normalization of provider-native value representations.
pub mod normalize;
/// Provider traits for fetching market data.
pub mod provider;
/// Core data types (Ticker, OHLCV, snapshots, request options).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::ResponseCache;
pub use error::{ProviderError, Result};
pub use provider::{
    DataProvider, FundamentalsProvider, HistoryProvider, MarketDataProvider, QuoteProvider,
};
pub use types::{
    FundamentalModules, FundamentalSnapshot, HistoryInterval, HistoryRange, MIN_HISTORY_BARS,
    OhlcvBar, PriceSeries, Ticker,
};
