//! Market snapshot and phase signal types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, Result};

/// Inferred behavioral phase of the dominant market participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPhase {
    /// Quiet absorption of supply on heavy volume
    Accumulation,
    /// Shaking out weak holders on thin volume
    WashOut,
    /// Driving price higher
    Markup,
    /// Unloading into demand
    Distribution,
    /// No rule matched
    Unknown,
}

impl MarketPhase {
    /// Get display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketPhase::Accumulation => "accumulation",
            MarketPhase::WashOut => "wash_out",
            MarketPhase::Markup => "markup",
            MarketPhase::Distribution => "distribution",
            MarketPhase::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time market observation.
///
/// Every field defaults to zero when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub volume: Decimal,
    pub avg_volume: Decimal,
    /// Fractional price change over the observation window (0.01 = +1%)
    pub price_change: Decimal,
    pub volatility: Decimal,
    pub large_buy_ratio: Decimal,
    pub large_sell_ratio: Decimal,
}

/// Classified phase with supporting metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSignal {
    phase: MarketPhase,
    confidence: Decimal,
    volume_ratio: Decimal,
    price_volatility: Decimal,
    large_order_ratio: Decimal,
    timestamp: DateTime<Utc>,
}

impl PhaseSignal {
    /// Create a signal, rejecting confidence outside [0, 1].
    pub fn new(phase: MarketPhase, confidence: Decimal) -> Result<Self> {
        if confidence < Decimal::ZERO || confidence > Decimal::ONE {
            return Err(EngineError::InvalidConfidence(confidence));
        }

        Ok(Self {
            phase,
            confidence,
            volume_ratio: Decimal::ONE,
            price_volatility: Decimal::ZERO,
            large_order_ratio: Decimal::ZERO,
            timestamp: Utc::now(),
        })
    }

    /// Unclassified signal with zero confidence.
    pub fn unknown() -> Self {
        Self {
            phase: MarketPhase::Unknown,
            confidence: Decimal::ZERO,
            volume_ratio: Decimal::ONE,
            price_volatility: Decimal::ZERO,
            large_order_ratio: Decimal::ZERO,
            timestamp: Utc::now(),
        }
    }

    /// Attach the metrics the classification was based on.
    pub fn with_metrics(
        mut self,
        volume_ratio: Decimal,
        price_volatility: Decimal,
        large_order_ratio: Decimal,
    ) -> Self {
        self.volume_ratio = volume_ratio;
        self.price_volatility = price_volatility;
        self.large_order_ratio = large_order_ratio;
        self
    }

    pub fn phase(&self) -> MarketPhase {
        self.phase
    }

    pub fn confidence(&self) -> Decimal {
        self.confidence
    }

    pub fn volume_ratio(&self) -> Decimal {
        self.volume_ratio
    }

    pub fn price_volatility(&self) -> Decimal {
        self.price_volatility
    }

    pub fn large_order_ratio(&self) -> Decimal {
        self.large_order_ratio
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
