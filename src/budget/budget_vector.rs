use std::collections::{btree_map, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::{budget::pure_dp_budget::PureDPBudget, trajectories::traits::Uid};

/// Per-user privacy budgets, one epsilon per user of the population.
///
/// Users without an entry have a zero budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetVector {
    budgets: BTreeMap<Uid, PureDPBudget>,
}

impl BudgetVector {
    /// Gives every user in `uids` the same `budget`.
    pub fn uniform(uids: impl IntoIterator<Item = Uid>, budget: PureDPBudget) -> Self {
        Self {
            budgets: uids.into_iter().map(|uid| (uid, budget)).collect(),
        }
    }

    pub fn get(&self, uid: Uid) -> PureDPBudget {
        self.budgets.get(&uid).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, uid: Uid, budget: PureDPBudget) {
        self.budgets.insert(uid, budget);
    }

    /// Adds `delta` (possibly negative) to the budget of every user in
    /// `uids`.
    pub fn shift<'a>(
        &mut self,
        uids: impl IntoIterator<Item = &'a Uid>,
        delta: PureDPBudget,
    ) {
        for uid in uids {
            *self.budgets.entry(*uid).or_insert(0.0) += delta;
        }
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Uid, PureDPBudget> {
        self.budgets.iter()
    }

    pub fn len(&self) -> usize {
        self.budgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.budgets.is_empty()
    }
}

impl FromIterator<(Uid, PureDPBudget)> for BudgetVector {
    fn from_iter<I: IntoIterator<Item = (Uid, PureDPBudget)>>(iter: I) -> Self {
        Self {
            budgets: iter.into_iter().collect(),
        }
    }
}
