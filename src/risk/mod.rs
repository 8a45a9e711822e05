//! Position protection.
//!
//! Re-evaluates open positions for signs of distribution:
//! - Phase-driven hold/reduce/exit decisions
//! - Urgency-keyed exit plans
//! - Append-only alert log of escalations
//! - Non-blocking signalling of an external risk coordinator

mod alerts;
mod coordinator;
mod exit_plan;
mod protector;

pub use alerts::AlertLog;
pub use coordinator::{ChannelCoordinator, ExitModeRequest, RiskCoordinator};
pub use exit_plan::{build_exit_plan, ExitBatch, ExitPlan, ExitPlanStatus};
pub use protector::{
    evaluate_signal, PositionProtector, ProtectionAction, ProtectionDecision, ProtectionOutcome,
    Urgency,
};
