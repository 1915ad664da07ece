#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Core types and traits
pub use cota_core::*;

// Cache implementations
pub use cota_cache::{InMemoryCache, NoopCache, SqliteCache};

// Providers
pub use cota_brapi::BrapiProvider;
pub use cota_investidor10::Investidor10Provider;
pub use cota_yahoo::YahooProvider;

pub mod analyzer;
pub mod config;
pub mod indicators;
pub mod reconcile;
pub mod report;
pub mod score;

pub use analyzer::{Analysis, Analyzer, PriceQuote};
pub use config::AnalyzerConfig;
pub use indicators::Trend;
pub use score::{Signal, Verdict};
