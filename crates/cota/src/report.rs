//! Plain-text report rendering.

use std::fmt::Write;

use crate::analyzer::Analysis;

const DIVIDER: &str = "---------------------------";

/// Render the fixed-format report for an analysis.
///
/// Every metric slot is always present; missing values render as `N/A`.
#[must_use]
pub fn render(analysis: &Analysis) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "REPORT: {}", analysis.ticker);
    let _ = writeln!(out, "Price: R$ {:.2}", analysis.price);
    let _ = writeln!(out, "{DIVIDER}");
    let _ = writeln!(
        out,
        "P/VP: {} (target: <1.0)",
        fmt_or_na(analysis.price_to_book, 2)
    );
    let _ = writeln!(out, "RSI: {} (target: <35)", fmt_or_na(analysis.rsi, 1));
    let _ = writeln!(
        out,
        "Yield: {} (target: >8%)",
        analysis
            .dividend_yield_pct
            .map_or_else(|| "N/A".to_string(), |dy| format!("{dy:.2}%"))
    );
    let _ = writeln!(
        out,
        "Liquidity: {}/day",
        compact_currency(analysis.daily_liquidity)
    );
    let _ = writeln!(
        out,
        "Debt: {}",
        analysis
            .debt_to_equity
            .map_or_else(|| "N/A".to_string(), |d| format!("{d:.1}%"))
    );
    let _ = writeln!(out, "Trend: {}", analysis.trend);
    let _ = writeln!(out, "{DIVIDER}");
    let _ = writeln!(out, "Signals: {}", signal_list(analysis));
    let _ = writeln!(out, "Score: {}/10", analysis.score);
    let _ = write!(out, "Verdict: {}", analysis.verdict);

    out
}

fn signal_list(analysis: &Analysis) -> String {
    if analysis.signals.is_empty() {
        return "Neutral".to_string();
    }
    analysis
        .signals
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

fn fmt_or_na(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.decimals$}"))
}

/// Compact currency display: `R$ 1.2M`, `R$ 350.0K`, `R$ 42.00`.
fn compact_currency(value: Option<f64>) -> String {
    let Some(value) = value else {
        return "N/A".to_string();
    };
    if value >= 1_000_000.0 {
        format!("R$ {:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("R$ {:.1}K", value / 1_000.0)
    } else {
        format!("R$ {value:.2}")
    }
}
