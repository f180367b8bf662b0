//! Optimizer — sweeps strategy parameter combinations over one simulator.
//!
//! Every combination gets its own strategy instance and its own isolated
//! run; only the tick store and the bar cache are shared, read-only. The
//! reduction carries the combination index, so the parallel and sequential
//! modes return the same winner.

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::debug;

use crate::engine::{Results, Simulator};
use crate::strategy::Strategy;

/// How to execute a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Parallel,
    Sequential,
}

/// Tests every parameter combination and returns the best.
pub struct Optimizer<'a, 'data, F> {
    simulator: &'a Simulator<'data>,
    factory: F,
}

impl<'a, 'data, F> Optimizer<'a, 'data, F> {
    /// `factory` builds a fresh strategy instance for a parameter
    /// combination; each instance is used for exactly one run.
    pub fn new(simulator: &'a Simulator<'data>, factory: F) -> Self {
        Self { simulator, factory }
    }

    /// Run every combination and return the `(results, parameters)` pair
    /// with the highest final account balance. Ties go to the earliest
    /// combination. `None` when `combinations` is empty.
    pub fn find_best<P, S>(
        &self,
        mode: ExecutionMode,
        combinations: &[P],
    ) -> Option<(Results, P)>
    where
        P: Clone + Sync,
        S: Strategy,
        F: Fn(&P) -> S + Sync,
    {
        match mode {
            ExecutionMode::Parallel => self.find_best_parallel(combinations),
            ExecutionMode::Sequential => self.find_best_sequential(combinations),
        }
    }

    /// Sweep on rayon's worker pool.
    pub fn find_best_parallel<P, S>(&self, combinations: &[P]) -> Option<(Results, P)>
    where
        P: Clone + Sync,
        S: Strategy,
        F: Fn(&P) -> S + Sync,
    {
        debug!(combinations = combinations.len(), "starting parallel sweep");
        combinations
            .par_iter()
            .enumerate()
            .map(|(index, params)| (index, self.simulate(params), params))
            .reduce_with(best_by_balance)
            .map(|(_, results, params)| (results, params.clone()))
    }

    /// Sweep on the calling thread, in input order.
    pub fn find_best_sequential<P, S>(&self, combinations: &[P]) -> Option<(Results, P)>
    where
        P: Clone,
        S: Strategy,
        F: Fn(&P) -> S,
    {
        debug!(combinations = combinations.len(), "starting sequential sweep");
        combinations
            .iter()
            .enumerate()
            .map(|(index, params)| (index, self.simulate(params), params))
            .reduce(best_by_balance)
            .map(|(_, results, params)| (results, params.clone()))
    }

    fn simulate<P, S>(&self, params: &P) -> Results
    where
        S: Strategy,
        F: Fn(&P) -> S,
    {
        let mut strategy = (self.factory)(params);
        self.simulator.run(&mut strategy)
    }
}

/// Max-by-balance with the combination index as the tie-break, which makes
/// the reduction associative and commutative.
fn best_by_balance<'p, P>(
    left: (usize, Results, &'p P),
    right: (usize, Results, &'p P),
) -> (usize, Results, &'p P) {
    match left.1.account_balance.total_cmp(&right.1.account_balance) {
        Ordering::Less => right,
        Ordering::Greater => left,
        Ordering::Equal => {
            if left.0 <= right.0 {
                left
            } else {
                right
            }
        }
    }
}
