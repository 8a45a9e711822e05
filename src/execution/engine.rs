//! Position building engine.
//!
//! Ties the plan builder, mutator, splitter and ledger to a plan repository.
//! Every operation that touches an existing plan goes through
//! `PlanRepository::update`, so operations on one symbol are serialized while
//! different symbols proceed independently.

use rust_decimal::Decimal;
use tracing::{info, warn};

use super::builder::build_plan;
use super::ledger::record_execution;
use super::mutator::{adjust_plan, PlanAdjustment};
use super::plan::{AcquisitionPlan, ChildOrderBatch, PlanStatus};
use super::random::{RandomSource, ThreadRandom};
use super::registry::{InMemoryPlanRepository, PlanRepository};
use super::splitter::split_next_batch;
use crate::config::StealthConfig;
use crate::error::{EngineError, Result};
use crate::phase::{MarketPhase, PhaseSignal};

/// Builds positions through phase-adaptive batched plans.
pub struct PositionBuilder<R = InMemoryPlanRepository, G = ThreadRandom> {
    repository: R,
    rng: G,
    stealth: StealthConfig,
}

impl PositionBuilder {
    /// In-memory plans with a thread-local RNG.
    pub fn new(stealth: StealthConfig) -> Self {
        Self::with_parts(InMemoryPlanRepository::new(), ThreadRandom, stealth)
    }
}

impl<R: PlanRepository, G: RandomSource> PositionBuilder<R, G> {
    /// Create an engine from an explicit repository and random source.
    pub fn with_parts(repository: R, rng: G, stealth: StealthConfig) -> Self {
        Self {
            repository,
            rng,
            stealth,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Build a plan for `symbol`, replacing any existing one.
    ///
    /// Returns `None` if the target is already reached or the signal is
    /// distribution; an existing plan is left alone in that case.
    pub fn build_plan(
        &self,
        symbol: &str,
        target_size: Decimal,
        current_size: Decimal,
        signal: &PhaseSignal,
    ) -> Result<Option<AcquisitionPlan>> {
        let Some(plan) = build_plan(symbol, target_size, current_size, signal) else {
            return Ok(None);
        };

        if let Some(previous) = self.repository.put(plan.clone())? {
            info!(
                %symbol,
                previous_status = ?previous.status,
                previous_progress = %previous.progress(),
                "Replaced existing acquisition plan"
            );
        }

        Ok(Some(plan))
    }

    /// Apply a new phase signal to the active plan.
    ///
    /// Returns `None` when the symbol has no plan; otherwise the plan after
    /// adjustment (unchanged when the phase did not change).
    pub fn adjust_plan(
        &self,
        symbol: &str,
        signal: &PhaseSignal,
    ) -> Result<Option<AcquisitionPlan>> {
        let mut adjusted = None;
        self.repository.update(symbol, &mut |plan| {
            adjust_plan(plan, signal);
            adjusted = Some(plan.clone());
        })?;

        Ok(adjusted)
    }

    /// Apply a new phase signal and report what changed.
    pub fn adjust_plan_with_outcome(
        &self,
        symbol: &str,
        signal: &PhaseSignal,
    ) -> Result<Option<PlanAdjustment>> {
        let mut outcome = None;
        self.repository.update(symbol, &mut |plan| {
            outcome = Some(adjust_plan(plan, signal));
        })?;
        Ok(outcome)
    }

    /// Produce the next batch to dispatch.
    ///
    /// Returns `None` if no plan exists, the plan is paused, or every batch
    /// has been dispatched; in the last case the plan is marked completed.
    pub fn next_batch(&self, symbol: &str, stealth_mode: bool) -> Result<Option<ChildOrderBatch>> {
        let mut batch = None;
        self.repository.update(symbol, &mut |plan| {
            if plan.status == PlanStatus::Paused {
                return;
            }

            if plan.is_finished() {
                if plan.status != PlanStatus::Completed {
                    plan.status = PlanStatus::Completed;
                    plan.touch();
                    info!(
                        symbol = %plan.symbol,
                        current_size = %plan.current_size,
                        target = %plan.total_target_size,
                        "Acquisition plan completed"
                    );
                }
                return;
            }

            batch = split_next_batch(plan, stealth_mode, &self.stealth, &self.rng);
        })?;

        Ok(batch)
    }

    /// Record a dispatched batch.
    ///
    /// Returns `None` if the symbol has no plan. Out-of-sequence batches are
    /// rejected with `EngineError::BatchOutOfSequence`.
    pub fn mark_executed(
        &self,
        symbol: &str,
        batch: &ChildOrderBatch,
    ) -> Result<Option<AcquisitionPlan>> {
        let mut outcome: Option<Result<AcquisitionPlan>> = None;
        self.repository.update(symbol, &mut |plan| {
            outcome = Some(record_execution(plan, batch).map(|()| plan.clone()));
        })?;

        outcome.transpose()
    }

    /// Un-pause a plan halted by distribution.
    ///
    /// Refused while the supplied signal still shows distribution or if the
    /// plan is not paused. Returns `None` if the symbol has no plan.
    pub fn resume_plan(
        &self,
        symbol: &str,
        signal: &PhaseSignal,
    ) -> Result<Option<AcquisitionPlan>> {
        if signal.phase() == MarketPhase::Distribution {
            return Err(EngineError::InvalidResume {
                symbol: symbol.to_string(),
                reason: "distribution still detected".to_string(),
            });
        }

        let mut outcome: Option<Result<AcquisitionPlan>> = None;
        self.repository.update(symbol, &mut |plan| {
            if plan.status != PlanStatus::Paused {
                outcome = Some(Err(EngineError::InvalidResume {
                    symbol: plan.symbol.clone(),
                    reason: format!("plan is {:?}, not paused", plan.status),
                }));
                return;
            }

            adjust_plan(plan, signal);
            plan.status = if plan.current_batch_index == 0 {
                PlanStatus::Planning
            } else {
                PlanStatus::Executing
            };
            plan.touch();
            info!(symbol = %plan.symbol, phase = %plan.phase, "Acquisition plan resumed");
            outcome = Some(Ok(plan.clone()));
        })?;

        outcome.transpose()
    }

    /// Drop the plan for `symbol`.
    pub fn cancel_plan(&self, symbol: &str) -> Result<Option<AcquisitionPlan>> {
        let removed = self.repository.remove(symbol)?;
        if let Some(plan) = &removed {
            warn!(
                %symbol,
                status = ?plan.status,
                current_size = %plan.current_size,
                "Acquisition plan cancelled"
            );
        }
        Ok(removed)
    }

    pub fn get_plan(&self, symbol: &str) -> Result<Option<AcquisitionPlan>> {
        self.repository.get(symbol)
    }

    pub fn active_symbols(&self) -> Result<Vec<String>> {
        self.repository.symbols()
    }
}
