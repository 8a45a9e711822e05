//! Rule-based market phase classification.
//!
//! A snapshot is reduced to a small set of metrics which are then matched
//! against an ordered list of rules. The first matching rule wins and
//! supplies its own confidence formula; when nothing matches the phase is
//! `Unknown` with zero confidence.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::types::{MarketPhase, MarketSnapshot, PhaseSignal};
use crate::utils::{clamp_score, safe_div_or};

/// Metrics derived from a snapshot that the rules are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseMetrics {
    pub volume_ratio: Decimal,
    pub price_change: Decimal,
    pub volatility: Decimal,
    pub large_buy_ratio: Decimal,
    pub large_sell_ratio: Decimal,
}

impl PhaseMetrics {
    /// Derive metrics from a snapshot. Missing average volume yields a ratio of 1.0.
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        Self {
            volume_ratio: safe_div_or(snapshot.volume, snapshot.avg_volume, Decimal::ONE),
            price_change: snapshot.price_change,
            volatility: snapshot.volatility,
            large_buy_ratio: snapshot.large_buy_ratio,
            large_sell_ratio: snapshot.large_sell_ratio,
        }
    }

    /// Dominant large-order share on either side of the book.
    pub fn large_order_ratio(&self) -> Decimal {
        self.large_buy_ratio.max(self.large_sell_ratio)
    }
}

/// One classification rule.
#[derive(Debug, Clone, Copy)]
pub struct PhaseRule {
    pub phase: MarketPhase,
    pub matches: fn(&PhaseMetrics) -> bool,
    pub confidence: fn(&PhaseMetrics) -> Decimal,
    /// Upper bound applied to the raw confidence
    pub cap: Decimal,
}

impl PhaseRule {
    /// Confidence for these metrics if the rule matches.
    pub fn evaluate(&self, metrics: &PhaseMetrics) -> Option<Decimal> {
        if (self.matches)(metrics) {
            Some(clamp_score((self.confidence)(metrics), self.cap))
        } else {
            None
        }
    }

    /// Heavy volume, flat price, large buyers present.
    pub fn accumulation() -> Self {
        Self {
            phase: MarketPhase::Accumulation,
            matches: |m| {
                m.volume_ratio > dec!(1.5)
                    && m.price_change.abs() < dec!(0.02)
                    && m.large_buy_ratio > dec!(0.3)
            },
            confidence: |m| {
                m.volume_ratio
                    .saturating_mul(dec!(0.3))
                    .saturating_add(m.large_buy_ratio.saturating_mul(dec!(0.7)))
            },
            cap: dec!(0.9),
        }
    }

    /// Thin volume, elevated volatility, falling price.
    pub fn wash_out() -> Self {
        Self {
            phase: MarketPhase::WashOut,
            matches: |m| {
                m.volume_ratio < dec!(0.7)
                    && m.volatility > dec!(0.03)
                    && m.price_change < Decimal::ZERO
            },
            confidence: |m| {
                Decimal::ONE
                    .saturating_sub(m.volume_ratio)
                    .saturating_mul(dec!(0.4))
                    .saturating_add(m.volatility.saturating_mul(dec!(6)))
            },
            cap: dec!(0.85),
        }
    }

    /// Rising volume and price with large buyers.
    pub fn markup() -> Self {
        Self {
            phase: MarketPhase::Markup,
            matches: |m| {
                m.volume_ratio > dec!(1.2)
                    && m.price_change > dec!(0.03)
                    && m.large_buy_ratio > dec!(0.25)
            },
            confidence: |m| {
                m.price_change
                    .saturating_mul(dec!(5))
                    .saturating_add(m.large_buy_ratio.saturating_mul(dec!(0.5)))
            },
            cap: dec!(0.9),
        }
    }

    /// Very heavy volume going nowhere while large sellers dominate.
    pub fn distribution() -> Self {
        Self {
            phase: MarketPhase::Distribution,
            matches: |m| {
                m.volume_ratio > dec!(2.0)
                    && m.price_change.abs() < dec!(0.01)
                    && m.large_sell_ratio > dec!(0.35)
            },
            confidence: |m| {
                m.volume_ratio
                    .saturating_mul(dec!(0.3))
                    .saturating_add(m.large_sell_ratio.saturating_mul(dec!(0.7)))
            },
            cap: dec!(0.95),
        }
    }
}

/// Classifies snapshots into market phases.
#[derive(Debug, Clone)]
pub struct PhaseDetector {
    rules: Vec<PhaseRule>,
}

impl Default for PhaseDetector {
    fn default() -> Self {
        Self::with_rules(vec![
            PhaseRule::accumulation(),
            PhaseRule::wash_out(),
            PhaseRule::markup(),
            PhaseRule::distribution(),
        ])
    }
}

impl PhaseDetector {
    /// Create a detector from an ordered rule list (first match wins).
    pub fn with_rules(rules: Vec<PhaseRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PhaseRule] {
        &self.rules
    }

    /// Classify a snapshot.
    pub fn detect(&self, snapshot: &MarketSnapshot) -> PhaseSignal {
        let metrics = PhaseMetrics::from_snapshot(snapshot);

        let (phase, confidence) = self
            .rules
            .iter()
            .find_map(|rule| rule.evaluate(&metrics).map(|c| (rule.phase, c)))
            .unwrap_or((MarketPhase::Unknown, Decimal::ZERO));

        // Rule confidences are clamped to caps <= 1, so this never falls back.
        let signal = PhaseSignal::new(phase, confidence.min(Decimal::ONE))
            .unwrap_or_else(|_| PhaseSignal::unknown())
            .with_metrics(
                metrics.volume_ratio,
                metrics.volatility,
                metrics.large_order_ratio(),
            );

        debug!(
            phase = %signal.phase(),
            confidence = %signal.confidence(),
            volume_ratio = %metrics.volume_ratio,
            price_change = %metrics.price_change,
            "Phase classified"
        );

        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(
        volume: Decimal,
        avg_volume: Decimal,
        price_change: Decimal,
        volatility: Decimal,
        large_buy: Decimal,
        large_sell: Decimal,
    ) -> MarketSnapshot {
        MarketSnapshot {
            volume,
            avg_volume,
            price_change,
            volatility,
            large_buy_ratio: large_buy,
            large_sell_ratio: large_sell,
        }
    }

    #[test]
    fn test_accumulation_scenario() {
        let detector = PhaseDetector::default();
        let signal = detector.detect(&snapshot(
            dec!(1600000),
            dec!(1000000),
            dec!(0.01),
            dec!(0.015),
            dec!(0.35),
            dec!(0.1),
        ));

        assert_eq!(signal.phase(), MarketPhase::Accumulation);
        // 1.6 * 0.3 + 0.35 * 0.7 = 0.725
        assert_eq!(signal.confidence(), dec!(0.725));
        assert_eq!(signal.volume_ratio(), dec!(1.6));
        assert_eq!(signal.large_order_ratio(), dec!(0.35));
    }

    #[test]
    fn test_accumulation_confidence_capped() {
        let detector = PhaseDetector::default();
        let signal = detector.detect(&snapshot(
            dec!(5000),
            dec!(1000),
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(0.8),
            Decimal::ZERO,
        ));

        assert_eq!(signal.phase(), MarketPhase::Accumulation);
        assert_eq!(signal.confidence(), dec!(0.9));
    }

    #[test]
    fn test_wash_out() {
        let detector = PhaseDetector::default();
        let signal = detector.detect(&snapshot(
            dec!(500),
            dec!(1000),
            dec!(-0.04),
            dec!(0.05),
            Decimal::ZERO,
            Decimal::ZERO,
        ));

        assert_eq!(signal.phase(), MarketPhase::WashOut);
        // (1 - 0.5) * 0.4 + 0.05 * 10 * 0.6 = 0.2 + 0.3
        assert_eq!(signal.confidence(), dec!(0.5));
    }

    #[test]
    fn test_markup() {
        let detector = PhaseDetector::default();
        let signal = detector.detect(&snapshot(
            dec!(1300),
            dec!(1000),
            dec!(0.05),
            dec!(0.02),
            dec!(0.3),
            Decimal::ZERO,
        ));

        assert_eq!(signal.phase(), MarketPhase::Markup);
        // 0.05 * 10 * 0.5 + 0.3 * 0.5 = 0.25 + 0.15
        assert_eq!(signal.confidence(), dec!(0.40));
    }

    #[test]
    fn test_distribution() {
        let detector = PhaseDetector::default();
        let signal = detector.detect(&snapshot(
            dec!(2500),
            dec!(1000),
            dec!(0.005),
            dec!(0.01),
            dec!(0.1),
            dec!(0.5),
        ));

        assert_eq!(signal.phase(), MarketPhase::Distribution);
        // 2.5 * 0.3 + 0.5 * 0.7 = 1.1 -> capped
        assert_eq!(signal.confidence(), dec!(0.95));
        assert_eq!(signal.large_order_ratio(), dec!(0.5));
    }

    #[test]
    fn test_accumulation_takes_priority_over_distribution() {
        // Satisfies both the accumulation and distribution conditions.
        let detector = PhaseDetector::default();
        let signal = detector.detect(&snapshot(
            dec!(3000),
            dec!(1000),
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(0.4),
            dec!(0.4),
        ));

        assert_eq!(signal.phase(), MarketPhase::Accumulation);
    }

    #[test]
    fn test_empty_snapshot_is_unknown() {
        let detector = PhaseDetector::default();
        let signal = detector.detect(&MarketSnapshot::default());

        assert_eq!(signal.phase(), MarketPhase::Unknown);
        assert_eq!(signal.confidence(), Decimal::ZERO);
        assert_eq!(signal.volume_ratio(), Decimal::ONE);
    }

    #[test]
    fn test_rules_evaluate_in_isolation() {
        let metrics = PhaseMetrics {
            volume_ratio: dec!(0.5),
            price_change: dec!(-0.02),
            volatility: dec!(0.04),
            large_buy_ratio: Decimal::ZERO,
            large_sell_ratio: Decimal::ZERO,
        };

        assert_eq!(PhaseRule::accumulation().evaluate(&metrics), None);
        assert_eq!(PhaseRule::wash_out().evaluate(&metrics), Some(dec!(0.44)));
        assert_eq!(PhaseRule::markup().evaluate(&metrics), None);
        assert_eq!(PhaseRule::distribution().evaluate(&metrics), None);
    }

    #[test]
    fn test_custom_rule_order() {
        let detector =
            PhaseDetector::with_rules(vec![PhaseRule::distribution(), PhaseRule::accumulation()]);
        let signal = detector.detect(&snapshot(
            dec!(3000),
            dec!(1000),
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(0.4),
            dec!(0.4),
        ));

        assert_eq!(signal.phase(), MarketPhase::Distribution);
        assert_eq!(detector.rules().len(), 2);
    }

    #[test]
    fn test_extreme_magnitudes_do_not_panic() {
        let tiny = Decimal::new(1, 20);
        let detector = PhaseDetector::default();

        // Volume ratio saturates; distribution confidence clamps to its cap.
        let signal = detector.detect(&snapshot(
            dec!(10000000000),
            tiny,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(0.5),
        ));
        assert_eq!(signal.phase(), MarketPhase::Distribution);
        assert_eq!(signal.confidence(), dec!(0.95));

        let signal = detector.detect(&snapshot(
            dec!(-10000000000),
            tiny,
            dec!(-0.5),
            Decimal::MAX,
            Decimal::ZERO,
            Decimal::ZERO,
        ));
        assert_eq!(signal.phase(), MarketPhase::WashOut);
        assert_eq!(signal.confidence(), dec!(0.85));

        let signal = detector.detect(&snapshot(
            Decimal::MAX,
            dec!(0.5),
            Decimal::MAX,
            Decimal::ZERO,
            Decimal::MAX,
            Decimal::ZERO,
        ));
        assert_eq!(signal.phase(), MarketPhase::Markup);
        assert_eq!(signal.confidence(), dec!(0.9));
    }
}
