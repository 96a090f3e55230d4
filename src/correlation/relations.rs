use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::trajectories::{
    traits::{TrajectoryStore, Uid},
    trajectory::Trajectory,
};

/// Each user's currently riskiest trajectory. Users without a trajectory at
/// or above the risk threshold have no entry.
pub type RiskiestAssignment = BTreeMap<Uid, Trajectory>;

/// Relation sets keyed by user. Users without relations have no entry.
pub type Relations = BTreeMap<Uid, BTreeSet<Uid>>;

static NO_RELATIONS: BTreeSet<Uid> = BTreeSet::new();

/// Correlations between users induced by their riskiest trajectories.
///
/// * Strong relations are mutual: users sharing the same riskiest
///   trajectory form a clique.
/// * Weak relations are directional: `v` is a weak relation of `u` when
///   `u`'s riskiest trajectory also appears in `v`'s ITD and the two are not
///   already strongly related.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    /// Every user of the population, ascending. Positions in this vector are
    /// the matrix indices used by the bound solver.
    uids: Vec<Uid>,
    strong: Relations,
    weak: Relations,
}

impl RelationGraph {
    /// Derives the relations for the given assignment. Assigned users that
    /// are not part of `store` are ignored.
    pub fn build<S: TrajectoryStore>(
        store: &S,
        riskiest: &RiskiestAssignment,
    ) -> Self {
        let uids: Vec<Uid> = store.uids().collect();

        let assigned: RiskiestAssignment = riskiest
            .iter()
            .filter(|(uid, _)| {
                let known = uids.binary_search(uid).is_ok();
                if !known {
                    warn!("Ignoring riskiest trajectory of unknown user {uid}");
                }
                known
            })
            .map(|(uid, trajectory)| (*uid, trajectory.clone()))
            .collect();

        let strong = find_strong_relations(&assigned);
        let weak = find_weak_relations(store, &uids, &assigned, &strong);
        debug!("strong relations: {strong:?}");
        debug!("weak relations: {weak:?}");

        Self { uids, strong, weak }
    }

    pub fn uids(&self) -> &[Uid] {
        &self.uids
    }

    /// Matrix index of `uid`, if it belongs to the population.
    pub fn index_of(&self, uid: Uid) -> Option<usize> {
        self.uids.binary_search(&uid).ok()
    }

    pub fn strong(&self, uid: Uid) -> &BTreeSet<Uid> {
        self.strong.get(&uid).unwrap_or(&NO_RELATIONS)
    }

    pub fn weak(&self, uid: Uid) -> &BTreeSet<Uid> {
        self.weak.get(&uid).unwrap_or(&NO_RELATIONS)
    }

    pub fn strong_relations(&self) -> &Relations {
        &self.strong
    }

    pub fn weak_relations(&self) -> &Relations {
        &self.weak
    }

    /// True if no relation of either kind starts or ends at `uid`.
    pub fn is_isolated(&self, uid: Uid) -> bool {
        self.strong(uid).is_empty()
            && self.weak(uid).is_empty()
            && !self.weak.values().any(|targets| targets.contains(&uid))
    }

    /// Users whose disclosure depends on the budget of each user.
    ///
    /// `affected[u]` holds `u` itself and every `v` with `u` in `strong[v]`
    /// or `weak[v]`. This is a single hop: relations of relations are not
    /// followed, since the bound solver only couples direct neighbours.
    pub fn affected_by(&self) -> Relations {
        let mut affected: Relations = self
            .uids
            .iter()
            .map(|uid| (*uid, BTreeSet::from([*uid])))
            .collect();

        for relations in [&self.strong, &self.weak] {
            for (source, targets) in relations {
                for target in targets {
                    affected.entry(*target).or_default().insert(*source);
                }
            }
        }

        affected
    }
}

/// Groups users by riskiest trajectory. Every group with at least two
/// members becomes a clique of strong relations.
fn find_strong_relations(riskiest: &RiskiestAssignment) -> Relations {
    let mut groups: BTreeMap<&Trajectory, BTreeSet<Uid>> = BTreeMap::new();
    for (uid, trajectory) in riskiest {
        groups.entry(trajectory).or_default().insert(*uid);
    }

    let mut relations = Relations::new();
    for members in groups.values().filter(|members| members.len() > 1) {
        for uid in members {
            let others = members.iter().filter(|other| *other != uid).copied();
            relations.insert(*uid, others.collect());
        }
    }
    relations
}

fn find_weak_relations<S: TrajectoryStore>(
    store: &S,
    uids: &[Uid],
    riskiest: &RiskiestAssignment,
    strong: &Relations,
) -> Relations {
    let mut relations = Relations::new();
    for (uid1, trajectory) in riskiest {
        let strongly_related = strong.get(uid1).unwrap_or(&NO_RELATIONS);
        for uid2 in uids {
            if uid1 != uid2
                && store.count(*uid2, trajectory) > 0
                && !strongly_related.contains(uid2)
            {
                relations.entry(*uid1).or_default().insert(*uid2);
            }
        }
    }
    relations
}
