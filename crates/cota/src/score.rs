//! Rule-based scoring of the reconciled metrics.
//!
//! A fixed rule table maps each available metric to score points and,
//! usually, a labelled signal. Metrics with no reconciled value contribute
//! nothing: no points, no signal. The sum is a signed, unbounded score that
//! maps onto a four-tier verdict.

use std::fmt;

/// One scoring rule's label, in rule-table order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// P/VP below 0.95.
    Discount,
    /// P/VP between 0.95 and 1.05.
    FairPrice,
    /// P/VP above 1.15.
    Premium,
    /// Dividend yield of 8% or more.
    HighYield,
    /// Dividend yield below 5%.
    LowYield,
    /// Daily traded value below R$ 500k.
    LowLiquidity,
    /// Daily traded value above R$ 2M.
    GoodLiquidity,
    /// Debt-to-equity above 150%.
    HighDebt,
    /// Debt-to-equity below 50%.
    LowDebt,
    /// RSI below 35.
    Oversold,
    /// RSI above 75.
    Overbought,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Discount => "Discount (P/VP)",
            Self::FairPrice => "Fair Price",
            Self::Premium => "Premium (P/VP)",
            Self::HighYield => "High Yield",
            Self::LowYield => "Low Yield",
            Self::LowLiquidity => "Low Liquidity",
            Self::GoodLiquidity => "Good Liquidity",
            Self::HighDebt => "High Debt",
            Self::LowDebt => "Low Debt",
            Self::Oversold => "Oversold",
            Self::Overbought => "Overbought",
        };
        write!(f, "{label}")
    }
}

/// Four-tier recommendation derived from the score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Score of 7 or more.
    StrongBuy,
    /// Score of 4 to 6.
    ModerateBuy,
    /// Score of 1 to 3.
    Neutral,
    /// Score of 0 or less.
    Avoid,
}

impl Verdict {
    /// Map a score onto its verdict tier.
    #[must_use]
    pub const fn from_score(score: i32) -> Self {
        if score >= 7 {
            Self::StrongBuy
        } else if score >= 4 {
            Self::ModerateBuy
        } else if score >= 1 {
            Self::Neutral
        } else {
            Self::Avoid
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::StrongBuy => "STRONG BUY",
            Self::ModerateBuy => "MODERATE BUY",
            Self::Neutral => "NEUTRAL / WAIT",
            Self::Avoid => "AVOID / HIGH RISK",
        };
        write!(f, "{label}")
    }
}

/// The reconciled facts the rule table consumes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScoreInputs {
    /// Reconciled P/VP.
    pub price_to_book: Option<f64>,
    /// Reconciled dividend yield, in percent.
    pub dividend_yield_pct: Option<f64>,
    /// Average daily traded value in currency.
    pub daily_liquidity: Option<f64>,
    /// Debt-to-equity ratio in percent; ignored for funds.
    pub debt_to_equity: Option<f64>,
    /// Latest RSI value.
    pub rsi: Option<f64>,
    /// Whether the instrument follows the FII convention.
    pub is_fund: bool,
}

/// Score plus the ordered signals that produced it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scorecard {
    /// Signed sum over the rule table.
    pub score: i32,
    /// Signals in rule-table order.
    pub signals: Vec<Signal>,
}

/// Apply the rule table.
///
/// Evaluation order is fixed (valuation, yield, liquidity, debt, momentum)
/// and determines the signal order in the output.
#[must_use]
pub fn score(inputs: &ScoreInputs) -> Scorecard {
    let mut card = Scorecard::default();

    if let Some(pvp) = inputs.price_to_book {
        if pvp < 0.95 {
            card.add(3, Some(Signal::Discount));
        } else if pvp <= 1.05 {
            card.add(1, Some(Signal::FairPrice));
        } else if pvp > 1.15 {
            card.add(-2, Some(Signal::Premium));
        }
    }

    if let Some(dy) = inputs.dividend_yield_pct {
        if dy >= 8.0 {
            card.add(2, Some(Signal::HighYield));
        } else if dy < 5.0 {
            card.add(-1, Some(Signal::LowYield));
        }
    }

    if let Some(liquidity) = inputs.daily_liquidity {
        if liquidity < 500_000.0 {
            card.add(-4, Some(Signal::LowLiquidity));
        } else if liquidity > 2_000_000.0 {
            card.add(1, Some(Signal::GoodLiquidity));
        }
    }

    if !inputs.is_fund {
        if let Some(debt) = inputs.debt_to_equity {
            if debt > 150.0 {
                card.add(-2, Some(Signal::HighDebt));
            } else if debt < 50.0 {
                card.add(1, Some(Signal::LowDebt));
            }
        }
    }

    if let Some(rsi) = inputs.rsi {
        if rsi < 35.0 {
            card.add(3, Some(Signal::Oversold));
        } else if rsi <= 60.0 {
            // healthy momentum zone scores without a signal
            card.add(1, None);
        } else if rsi > 75.0 {
            card.add(-3, Some(Signal::Overbought));
        }
    }

    card
}

impl Scorecard {
    fn add(&mut self, points: i32, signal: Option<Signal>) {
        self.score += points;
        if let Some(signal) = signal {
            self.signals.push(signal);
        }
    }

    /// The verdict tier for this score.
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        Verdict::from_score(self.score)
    }
}
