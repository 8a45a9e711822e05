//! Active plan storage, one plan per symbol.

use dashmap::DashMap;

use super::plan::AcquisitionPlan;
use crate::error::Result;

/// Storage for active acquisition plans keyed by symbol.
///
/// `update` must run the closure while holding exclusive access to that
/// symbol's plan so read-modify-write cycles never interleave.
pub trait PlanRepository: Send + Sync {
    fn get(&self, symbol: &str) -> Result<Option<AcquisitionPlan>>;

    /// Store a plan, returning the one it replaced.
    fn put(&self, plan: AcquisitionPlan) -> Result<Option<AcquisitionPlan>>;

    fn remove(&self, symbol: &str) -> Result<Option<AcquisitionPlan>>;

    /// Mutate a plan in place. Returns false if no plan exists for `symbol`.
    fn update(&self, symbol: &str, f: &mut dyn FnMut(&mut AcquisitionPlan)) -> Result<bool>;

    fn symbols(&self) -> Result<Vec<String>>;
}

/// In-process repository backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryPlanRepository {
    plans: DashMap<String, AcquisitionPlan>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlanRepository for InMemoryPlanRepository {
    fn get(&self, symbol: &str) -> Result<Option<AcquisitionPlan>> {
        Ok(self.plans.get(symbol).map(|entry| entry.value().clone()))
    }

    fn put(&self, plan: AcquisitionPlan) -> Result<Option<AcquisitionPlan>> {
        Ok(self.plans.insert(plan.symbol.clone(), plan))
    }

    fn remove(&self, symbol: &str) -> Result<Option<AcquisitionPlan>> {
        Ok(self.plans.remove(symbol).map(|(_, plan)| plan))
    }

    fn update(&self, symbol: &str, f: &mut dyn FnMut(&mut AcquisitionPlan)) -> Result<bool> {
        match self.plans.get_mut(symbol) {
            Some(mut entry) => {
                f(entry.value_mut());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn symbols(&self) -> Result<Vec<String>> {
        let mut symbols: Vec<String> = self.plans.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::builder::build_plan;
    use crate::phase::{MarketPhase, PhaseSignal};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn plan(symbol: &str, target: Decimal) -> AcquisitionPlan {
        let signal = PhaseSignal::new(MarketPhase::Unknown, Decimal::ZERO).unwrap();
        build_plan(symbol, target, Decimal::ZERO, &signal).unwrap()
    }

    #[test]
    fn test_put_replaces_existing_plan() {
        let repo = InMemoryPlanRepository::new();

        assert!(repo.put(plan("BTCUSDT", dec!(100))).unwrap().is_none());
        let replaced = repo.put(plan("BTCUSDT", dec!(200))).unwrap().unwrap();

        assert_eq!(replaced.total_target_size, dec!(100));
        assert_eq!(repo.get("BTCUSDT").unwrap().unwrap().total_target_size, dec!(200));
        assert_eq!(repo.symbols().unwrap(), vec!["BTCUSDT".to_string()]);
    }

    #[test]
    fn test_update_missing_symbol() {
        let repo = InMemoryPlanRepository::new();
        let mut called = false;

        let found = repo.update("ETHUSDT", &mut |_| called = true).unwrap();

        assert!(!found);
        assert!(!called);
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_writes() {
        let repo = Arc::new(InMemoryPlanRepository::new());
        repo.put(plan("BTCUSDT", dec!(100))).unwrap();
        repo.put(plan("ETHUSDT", dec!(100))).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = Arc::clone(&repo);
                let symbol = if i % 2 == 0 { "BTCUSDT" } else { "ETHUSDT" };
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        repo.update(symbol, &mut |p| p.current_size += Decimal::ONE)
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(repo.get("BTCUSDT").unwrap().unwrap().current_size, dec!(400));
        assert_eq!(repo.get("ETHUSDT").unwrap().unwrap().current_size, dec!(400));
    }

    #[test]
    fn test_remove() {
        let repo = InMemoryPlanRepository::new();
        repo.put(plan("BTCUSDT", dec!(100))).unwrap();

        assert!(repo.remove("BTCUSDT").unwrap().is_some());
        assert!(repo.get("BTCUSDT").unwrap().is_none());
        assert!(repo.remove("BTCUSDT").unwrap().is_none());
    }
}
