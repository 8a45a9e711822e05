//! Position building execution.
//!
//! Contains the acquisition side of the engine:
//! - Phase-keyed plan synthesis
//! - In-place plan adjustment when the phase changes
//! - Stealth splitting of batches into randomized child orders
//! - Execution ledger advancing plan progress
//! - Plan storage keyed by symbol

mod builder;
mod engine;
mod ledger;
mod mutator;
mod plan;
mod random;
mod registry;
mod splitter;

pub use builder::{build_plan, PlanTemplate};
pub use engine::PositionBuilder;
pub use ledger::record_execution;
pub use mutator::{adjust_plan, PlanAdjustment, MIN_SPED_UP_INTERVAL_SECS};
pub use plan::{
    AcquisitionPlan, ChildOrder, ChildOrderBatch, ExecutedBatch, FollowStrategy, PlanStatus,
};
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use registry::{InMemoryPlanRepository, PlanRepository};
pub use splitter::{split_next_batch, split_size};
