use std::collections::BTreeMap;

use log::{debug, log_enabled, Level};

use crate::{
    budget::budget_vector::BudgetVector,
    correlation::relations::{RelationGraph, RiskiestAssignment},
    trajectories::traits::{TrajectoryStore, Uid},
};

/// Correlation-adjusted disclosure of each user.
pub type DisclosureVector = BTreeMap<Uid, f64>;

/// Default discount applied to weak correlations.
pub const DEFAULT_THETA: f64 = 0.25;

/// Correlated individual differential privacy (CIDP) bound solver.
///
/// Users are indexed by ascending UID. Two n x n matrices are built from the
/// relation graph:
///
/// * `L` carries the relation-weighted degree of each user on its diagonal
///   (0.5 per strong visit, 1 per weak visit, on both ends) and -1 for every
///   coupled pair.
/// * `R` carries the budget a neighbour leaks to a user: `-eps_i` for strong
///   pairs, `-eps_i * theta` in the direction of a weak relation and 0 in
///   the opposite direction, and `eps_i / L[i][i]` on the diagonal.
///
/// The disclosure of user `i` is `sum_j L[i][j] * R[j][i]`. A user without
/// relations has a zero degree; its diagonal term is taken as `eps_i`
/// directly instead of dividing by zero, so it ends up with exactly its own
/// budget.
///
/// Relations are visited for ascending `i`, strong before weak, neighbours
/// ascending. When two users are weakly related in both directions, the
/// visit of the larger index overwrites the `R` entries of the smaller one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CidpSolver {
    theta: f64,
}

impl Default for CidpSolver {
    fn default() -> Self {
        Self::new(DEFAULT_THETA)
    }
}

impl CidpSolver {
    pub fn new(theta: f64) -> Self {
        Self { theta }
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn solve(
        &self,
        graph: &RelationGraph,
        budgets: &BudgetVector,
    ) -> DisclosureVector {
        debug!("Computing CIDP(epsilon={budgets:?}, theta={})", self.theta);

        let uids = graph.uids();
        let n = uids.len();
        let epsilon: Vec<f64> = uids.iter().map(|uid| budgets.get(*uid)).collect();

        // R[i][j] = -eps_i where i and j are not related, which never
        // contributes since L[i][j] = 0 there.
        let mut l = vec![vec![0.0; n]; n];
        let mut r: Vec<Vec<f64>> = epsilon.iter().map(|eps| vec![-eps; n]).collect();

        for (i, uid) in uids.iter().enumerate() {
            for j in graph.strong(*uid).iter().filter_map(|v| graph.index_of(*v)) {
                l[i][i] += 0.5;
                l[j][j] += 0.5;
                l[i][j] = -1.0;
                l[j][i] = -1.0;
                r[i][j] = -epsilon[i];
                r[j][i] = -epsilon[j];
            }
            for j in graph.weak(*uid).iter().filter_map(|v| graph.index_of(*v)) {
                l[i][i] += 1.0;
                l[j][j] += 1.0;
                l[i][j] = -1.0;
                l[j][i] = -1.0;
                r[i][j] = -epsilon[i] * self.theta;
                r[j][i] = 0.0;
            }
        }

        for i in 0..n {
            if l[i][i] != 0.0 {
                r[i][i] = epsilon[i] / l[i][i];
            }
        }

        if log_enabled!(Level::Debug) {
            debug!("L = {}", format_matrix(&l).join("\n    "));
            debug!("R = {}", format_matrix(&r).join("\n    "));
        }

        let cidp: DisclosureVector = uids
            .iter()
            .enumerate()
            .map(|(i, uid)| {
                let own = match l[i][i] != 0.0 {
                    true => l[i][i] * r[i][i],
                    false => epsilon[i],
                };
                let coupled: f64 = (0..n)
                    .filter(|j| *j != i)
                    .map(|j| l[i][j] * r[j][i])
                    .sum();
                (*uid, own + coupled)
            })
            .collect();

        debug!("CIDP = {cidp:?}");
        cidp
    }
}

/// Builds the relation graph for `riskiest` and solves the bound in one go.
pub fn compute_cidp<S: TrajectoryStore>(
    store: &S,
    riskiest: &RiskiestAssignment,
    budgets: &BudgetVector,
    theta: f64,
) -> DisclosureVector {
    let graph = RelationGraph::build(store, riskiest);
    CidpSolver::new(theta).solve(&graph, budgets)
}

/// Formats a matrix row by row for debug logs, e.g. `[ 1.00, -1.00]`.
fn format_matrix(matrix: &[Vec<f64>]) -> Vec<String> {
    matrix
        .iter()
        .map(|row| {
            let values: Vec<String> = row
                .iter()
                .map(|value| match *value >= 0.0 {
                    true => format!(" {value:.2}"),
                    false => format!("{value:.2}"),
                })
                .collect();
            format!("[{}]", values.join(", "))
        })
        .collect()
}
