use std::collections::BTreeMap;

use log::debug;

use crate::{
    budget::budget_vector::BudgetVector,
    correlation::relations::RiskiestAssignment,
    sanitizer::queue::RiskyQueue,
    trajectories::traits::{TrajectoryStore, Uid},
};

/// Mutable state of one sanitize call: the per-user risky queues, the noise
/// scales accumulated so far and the budgets chosen in each round.
///
/// Each call builds its own context, so repeated or interleaved calls never
/// share state.
#[derive(Debug, Clone, Default)]
pub struct SanitizationContext {
    queues: BTreeMap<Uid, RiskyQueue>,
    noise_scales: BTreeMap<Uid, Vec<f64>>,
    budgets: Vec<BudgetVector>,
}

impl SanitizationContext {
    /// Ranks the risky trajectories of every user once, up front.
    pub fn new<S: TrajectoryStore>(store: &S, threshold: f64) -> Self {
        let mut queues = BTreeMap::new();
        let mut noise_scales = BTreeMap::new();
        for uid in store.uids() {
            queues.insert(uid, RiskyQueue::build(uid, store, threshold));
            noise_scales.insert(uid, Vec::new());
        }

        let this = Self {
            queues,
            noise_scales,
            budgets: Vec::new(),
        };
        debug!("risky = {:?}", this.queues);
        this
    }

    /// Pops the riskiest remaining trajectory of every user that still has
    /// one. An empty assignment means sanitization is done.
    pub fn next_assignment(&mut self) -> RiskiestAssignment {
        self.queues
            .iter_mut()
            .filter_map(|(uid, queue)| {
                queue.pop().map(|(trajectory, _)| (*uid, trajectory.clone()))
            })
            .collect()
    }

    /// True if some user still has risky trajectories left.
    pub fn has_pending(&self) -> bool {
        self.queues.values().any(|queue| !queue.is_empty())
    }

    pub fn record_scale(&mut self, uid: Uid, scale: f64) {
        self.noise_scales.entry(uid).or_default().push(scale);
    }

    pub fn record_budgets(&mut self, budgets: BudgetVector) {
        self.budgets.push(budgets);
    }

    /// Number of completed rounds.
    pub fn rounds(&self) -> usize {
        self.budgets.len()
    }

    pub fn noise_scales(&self, uid: Uid) -> &[f64] {
        self.noise_scales
            .get(&uid)
            .map(|scales| scales.as_slice())
            .unwrap_or_default()
    }

    pub fn queue(&self, uid: Uid) -> Option<&RiskyQueue> {
        self.queues.get(&uid)
    }

    pub fn into_parts(self) -> (BTreeMap<Uid, Vec<f64>>, Vec<BudgetVector>) {
        (self.noise_scales, self.budgets)
    }
}
