use log::{debug, info, warn};

use crate::{
    budget::{
        budget_vector::BudgetVector,
        pure_dp_budget::{PureDPBudget, NEAR_TIE_TOLERANCE},
    },
    correlation::{
        cidp::{CidpSolver, DEFAULT_THETA},
        relations::{RelationGraph, RiskiestAssignment},
    },
    error::{Error, Result},
    trajectories::traits::{TrajectoryStore, Uid},
};

pub const DEFAULT_EPSILON_INIT: PureDPBudget = 0.1;
pub const DEFAULT_BETA: PureDPBudget = 0.05;
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Upper bound targeted for every user's correlated disclosure.
pub const DISCLOSURE_BOUND: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchDirection {
    Increase,
    Decrease,
}

/// Individual DF-optimization algorithm (IDFA).
///
/// Every user starts at `epsilon_init`. Users with a riskiest trajectory are
/// then visited in ascending UID order, and the budgets of everyone affected
/// by that user move together in `beta` steps:
///
/// * while `eps_u < CIDP_u <= 1`, budgets go up until `CIDP_u > 1`;
/// * while `CIDP_u > 1`, budgets go down until `CIDP_u <= 1`;
/// * otherwise the user is left alone.
///
/// Budgets are shared between overlapping affected sets, so the visit order
/// influences the final vector. The affected sets are computed once, from the
/// assignment given to [`BudgetOptimizer::optimize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetOptimizer {
    epsilon_init: PureDPBudget,
    beta: PureDPBudget,
    max_iterations: usize,
    solver: CidpSolver,
}

impl Default for BudgetOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON_INIT, DEFAULT_BETA, DEFAULT_THETA)
    }
}

impl BudgetOptimizer {
    pub fn new(epsilon_init: PureDPBudget, beta: PureDPBudget, theta: f64) -> Self {
        Self {
            epsilon_init,
            beta,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            solver: CidpSolver::new(theta),
        }
    }

    /// Caps the number of steps of each per-user search. Going over the cap
    /// fails with [`Error::NonConvergence`].
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn solver(&self) -> &CidpSolver {
        &self.solver
    }

    pub fn optimize<S: TrajectoryStore>(
        &self,
        store: &S,
        riskiest: &RiskiestAssignment,
    ) -> Result<BudgetVector> {
        info!(
            "Computing IDFA(epsilon_init={}, beta={})",
            self.epsilon_init, self.beta
        );

        let graph = RelationGraph::build(store, riskiest);
        let mut budgets =
            BudgetVector::uniform(graph.uids().iter().copied(), self.epsilon_init);
        let mut cidp = self.solver.solve(&graph, &budgets);

        let affected = graph.affected_by();
        debug!("affected = {affected:?}");

        for uid in graph.uids() {
            if !riskiest.contains_key(uid) {
                continue;
            }
            debug!("Optimizing user {uid}...");

            let epsilon = budgets.get(*uid);
            let disclosure = cidp[uid];
            let direction = if epsilon < disclosure && disclosure <= DISCLOSURE_BOUND {
                SearchDirection::Increase
            } else if disclosure > DISCLOSURE_BOUND {
                SearchDirection::Decrease
            } else {
                continue;
            };
            let step = match direction {
                SearchDirection::Increase => self.beta,
                SearchDirection::Decrease => -self.beta,
            };

            let mut iterations = 0;
            loop {
                if iterations == self.max_iterations {
                    return Err(Error::NonConvergence {
                        uid: *uid,
                        iterations,
                        disclosure: cidp[uid],
                    });
                }

                budgets.shift(&affected[uid], step);
                cidp = self.solver.solve(&graph, &budgets);
                iterations += 1;

                let disclosure = cidp[uid];
                warn_if_near_bound(*uid, disclosure);
                let settled = match direction {
                    SearchDirection::Increase => disclosure > DISCLOSURE_BOUND,
                    SearchDirection::Decrease => disclosure <= DISCLOSURE_BOUND,
                };
                if settled {
                    break;
                }
            }
            debug!(
                "User {uid} settled after {iterations} {direction:?} steps, CIDP = {}",
                cidp[uid]
            );
        }

        debug!("epsilon_opt = {budgets:?}");
        Ok(budgets)
    }
}

fn warn_if_near_bound(uid: Uid, disclosure: f64) {
    let diff = (disclosure - DISCLOSURE_BOUND).abs();
    if diff < NEAR_TIE_TOLERANCE && diff > 0.0 {
        warn!(
            "CIDP of user {uid} ({disclosure}) is within {diff} of the bound, comparison may flip with rounding",
        );
    }
}
