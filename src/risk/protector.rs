//! Position protection against distribution.
//!
//! Each monitoring tick classifies the latest snapshot and maps the phase
//! and confidence to a hold/reduce/exit decision. Escalating decisions are
//! written to the alert log and forwarded to the risk coordinator when one
//! is attached; coordinator failures are logged and never surface to the
//! caller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::alerts::AlertLog;
use super::coordinator::{ExitModeRequest, RiskCoordinator};
use super::exit_plan::{build_exit_plan, ExitPlan};
use crate::phase::{MarketPhase, MarketSnapshot, PhaseDetector, PhaseSignal};

/// What to do with an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionAction {
    Hold,
    Reduce,
    Exit,
}

impl ProtectionAction {
    /// Whether the action lowers exposure.
    pub fn is_escalating(&self) -> bool {
        matches!(self, ProtectionAction::Reduce | ProtectionAction::Exit)
    }
}

/// How quickly a protection action should be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Get display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }
}

/// Outcome of one monitoring tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionDecision {
    pub symbol: String,
    pub action: ProtectionAction,
    pub urgency: Urgency,
    pub reduce_ratio: Decimal,
    pub reason: String,
    pub phase: MarketPhase,
    pub confidence: Decimal,
    pub current_position: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl ProtectionDecision {
    /// Position size the decision asks to shed.
    pub fn reduce_size(&self) -> Decimal {
        self.current_position * self.reduce_ratio
    }

    /// Emit as structured log for downstream parsing.
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();

        match self.urgency {
            Urgency::Low => debug!(target: "protection_alert", "PROTECTION_ALERT: {}", json),
            Urgency::Medium => info!(target: "protection_alert", "PROTECTION_ALERT: {}", json),
            Urgency::High => warn!(target: "protection_alert", "PROTECTION_ALERT: {}", json),
            Urgency::Critical => error!(target: "protection_alert", "PROTECTION_ALERT: {}", json),
        }
    }
}

/// Decision plus the exit plan derived from it.
#[derive(Debug, Clone)]
pub struct ProtectionOutcome {
    pub decision: ProtectionDecision,
    pub exit_plan: Option<ExitPlan>,
}

/// Map a classified phase to an action, urgency, reduce ratio and reason.
pub fn evaluate_signal(signal: &PhaseSignal) -> (ProtectionAction, Urgency, Decimal, String) {
    let confidence = signal.confidence();

    match signal.phase() {
        MarketPhase::Distribution if confidence >= dec!(0.90) => (
            ProtectionAction::Exit,
            Urgency::Critical,
            Decimal::ONE,
            format!("Distribution confirmed (confidence {confidence}), exit fully"),
        ),
        MarketPhase::Distribution if confidence >= dec!(0.70) => (
            ProtectionAction::Reduce,
            Urgency::High,
            dec!(0.70),
            format!("Distribution likely (confidence {confidence}), cut 70%"),
        ),
        MarketPhase::Distribution => (
            ProtectionAction::Reduce,
            Urgency::Medium,
            dec!(0.30),
            format!("Possible distribution (confidence {confidence}), cut 30%"),
        ),
        MarketPhase::Markup if confidence >= dec!(0.80) => (
            ProtectionAction::Reduce,
            Urgency::Medium,
            dec!(0.30),
            format!("Extended markup (confidence {confidence}), take 30% off"),
        ),
        phase => (
            ProtectionAction::Hold,
            Urgency::Low,
            Decimal::ZERO,
            format!("Phase {phase} (confidence {confidence}), hold"),
        ),
    }
}

/// Continuously re-evaluates open positions.
pub struct PositionProtector {
    detector: PhaseDetector,
    alerts: Arc<AlertLog>,
    coordinator: Option<Arc<dyn RiskCoordinator>>,
}

impl PositionProtector {
    /// Create a protector writing escalations to `alerts`.
    pub fn new(detector: PhaseDetector, alerts: Arc<AlertLog>) -> Self {
        Self {
            detector,
            alerts,
            coordinator: None,
        }
    }

    /// Attach the outbound risk coordinator.
    pub fn with_coordinator(mut self, coordinator: Arc<dyn RiskCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn alerts(&self) -> &Arc<AlertLog> {
        &self.alerts
    }

    /// Evaluate one position against the latest snapshot.
    pub fn monitor(
        &self,
        symbol: &str,
        current_position: Decimal,
        snapshot: &MarketSnapshot,
    ) -> ProtectionDecision {
        let signal = self.detector.detect(snapshot);
        let (action, urgency, reduce_ratio, reason) = evaluate_signal(&signal);

        let decision = ProtectionDecision {
            symbol: symbol.to_string(),
            action,
            urgency,
            reduce_ratio,
            reason,
            phase: signal.phase(),
            confidence: signal.confidence(),
            current_position,
            timestamp: Utc::now(),
        };

        if action.is_escalating() {
            decision.emit();
            self.alerts.append(decision.clone());
            self.notify_coordinator(&decision);
        } else {
            debug!(%symbol, phase = %decision.phase, "Position held");
        }

        decision
    }

    /// Monitor and, for escalating decisions, derive the exit plan.
    pub fn protect(
        &self,
        symbol: &str,
        current_position: Decimal,
        snapshot: &MarketSnapshot,
    ) -> ProtectionOutcome {
        let decision = self.monitor(symbol, current_position, snapshot);
        let exit_plan = decision.action.is_escalating().then(|| {
            build_exit_plan(
                symbol,
                current_position,
                decision.reduce_ratio,
                decision.urgency,
            )
        });

        ProtectionOutcome {
            decision,
            exit_plan,
        }
    }

    /// Most recent escalating decisions, oldest first.
    pub fn get_recent_alerts(&self, limit: usize) -> Vec<ProtectionDecision> {
        self.alerts.recent(limit)
    }

    fn notify_coordinator(&self, decision: &ProtectionDecision) {
        let Some(coordinator) = &self.coordinator else {
            return;
        };

        let request = ExitModeRequest {
            symbol: decision.symbol.clone(),
            urgency: decision.urgency,
            reduce_ratio: decision.reduce_ratio,
            reason: decision.reason.clone(),
        };

        if let Err(e) = coordinator.enter_exit_mode(request) {
            warn!(
                symbol = %decision.symbol,
                urgency = decision.urgency.as_str(),
                error = %e,
                "Risk coordinator unavailable, continuing without it"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::risk::coordinator::MockRiskCoordinator;

    fn distribution_snapshot(volume_ratio: Decimal, large_sell: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            volume: volume_ratio * dec!(1000),
            avg_volume: dec!(1000),
            price_change: Decimal::ZERO,
            volatility: dec!(0.01),
            large_buy_ratio: dec!(0.1),
            large_sell_ratio: large_sell,
        }
    }

    fn protector() -> PositionProtector {
        PositionProtector::new(PhaseDetector::default(), Arc::new(AlertLog::new(100)))
    }

    #[test]
    fn test_decision_table() {
        let cases = [
            (MarketPhase::Distribution, dec!(0.95), ProtectionAction::Exit, Urgency::Critical, dec!(1.0)),
            (MarketPhase::Distribution, dec!(0.90), ProtectionAction::Exit, Urgency::Critical, dec!(1.0)),
            (MarketPhase::Distribution, dec!(0.89), ProtectionAction::Reduce, Urgency::High, dec!(0.70)),
            (MarketPhase::Distribution, dec!(0.70), ProtectionAction::Reduce, Urgency::High, dec!(0.70)),
            (MarketPhase::Distribution, dec!(0.69), ProtectionAction::Reduce, Urgency::Medium, dec!(0.30)),
            (MarketPhase::Markup, dec!(0.80), ProtectionAction::Reduce, Urgency::Medium, dec!(0.30)),
            (MarketPhase::Markup, dec!(0.79), ProtectionAction::Hold, Urgency::Low, Decimal::ZERO),
            (MarketPhase::WashOut, dec!(0.85), ProtectionAction::Hold, Urgency::Low, Decimal::ZERO),
            (MarketPhase::Accumulation, dec!(0.9), ProtectionAction::Hold, Urgency::Low, Decimal::ZERO),
            (MarketPhase::Unknown, Decimal::ZERO, ProtectionAction::Hold, Urgency::Low, Decimal::ZERO),
        ];

        for (phase, confidence, action, urgency, ratio) in cases {
            let signal = PhaseSignal::new(phase, confidence).unwrap();
            let (a, u, r, _) = evaluate_signal(&signal);
            assert_eq!((a, u, r), (action, urgency, ratio), "{phase} @ {confidence}");
        }
    }

    #[test]
    fn test_urgency_name_matches_serialized_form() {
        for urgency in [Urgency::Low, Urgency::Medium, Urgency::High, Urgency::Critical] {
            let json = serde_json::to_string(&urgency).unwrap();
            assert_eq!(json, format!("\"{}\"", urgency.as_str()));
        }
    }

    #[test]
    fn test_monitor_critical_distribution() {
        let protector = protector();
        // 2.5 * 0.3 + 0.4 * 0.7 = 1.03 -> capped at 0.95
        let decision = protector.monitor("BTCUSDT", dec!(1000), &distribution_snapshot(dec!(2.5), dec!(0.4)));

        assert_eq!(decision.phase, MarketPhase::Distribution);
        assert_eq!(decision.confidence, dec!(0.95));
        assert_eq!(decision.action, ProtectionAction::Exit);
        assert_eq!(decision.reduce_ratio, Decimal::ONE);
        assert_eq!(decision.reduce_size(), dec!(1000));
        assert_eq!(protector.get_recent_alerts(10).len(), 1);
    }

    #[test]
    fn test_monitor_high_distribution() {
        let protector = protector();
        // 2.1 * 0.3 + 0.36 * 0.7 = 0.63 + 0.252 = 0.882
        let decision = protector.monitor("BTCUSDT", dec!(1000), &distribution_snapshot(dec!(2.1), dec!(0.36)));

        assert_eq!(decision.confidence, dec!(0.882));
        assert_eq!(decision.action, ProtectionAction::Reduce);
        assert_eq!(decision.urgency, Urgency::High);
        assert_eq!(decision.reduce_ratio, dec!(0.70));
    }

    #[test]
    fn test_hold_is_not_logged() {
        let protector = protector();
        let decision = protector.monitor("BTCUSDT", dec!(1000), &MarketSnapshot::default());

        assert_eq!(decision.action, ProtectionAction::Hold);
        assert_eq!(decision.reduce_ratio, Decimal::ZERO);
        assert!(protector.get_recent_alerts(10).is_empty());
    }

    #[test]
    fn test_coordinator_receives_escalations() {
        let mut coordinator = MockRiskCoordinator::new();
        coordinator
            .expect_enter_exit_mode()
            .withf(|req| {
                req.symbol == "BTCUSDT" && req.urgency == Urgency::Critical && req.reduce_ratio == Decimal::ONE
            })
            .times(1)
            .returning(|_| Ok(()));

        let protector = protector().with_coordinator(Arc::new(coordinator));
        protector.monitor("BTCUSDT", dec!(1000), &distribution_snapshot(dec!(2.5), dec!(0.4)));
    }

    #[test]
    fn test_coordinator_not_called_on_hold() {
        let mut coordinator = MockRiskCoordinator::new();
        coordinator.expect_enter_exit_mode().times(0);

        let protector = protector().with_coordinator(Arc::new(coordinator));
        protector.monitor("BTCUSDT", dec!(1000), &MarketSnapshot::default());
    }

    #[test]
    fn test_coordinator_failure_is_contained() {
        let mut coordinator = MockRiskCoordinator::new();
        coordinator
            .expect_enter_exit_mode()
            .returning(|_| Err(EngineError::Coordinator("channel closed".to_string())));

        let protector = protector().with_coordinator(Arc::new(coordinator));
        let decision =
            protector.monitor("BTCUSDT", dec!(1000), &distribution_snapshot(dec!(2.5), dec!(0.4)));

        assert_eq!(decision.action, ProtectionAction::Exit);
        assert_eq!(protector.get_recent_alerts(10).len(), 1);
    }

    #[test]
    fn test_protect_builds_exit_plan() {
        let protector = protector();

        let outcome = protector.protect("BTCUSDT", dec!(1000), &distribution_snapshot(dec!(2.5), dec!(0.4)));
        let plan = outcome.exit_plan.unwrap();
        assert_eq!(plan.batch_sizes, vec![dec!(1000)]);

        let outcome = protector.protect("BTCUSDT", dec!(1000), &MarketSnapshot::default());
        assert!(outcome.exit_plan.is_none());
    }
}
