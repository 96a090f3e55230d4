use std::collections::{BTreeMap, HashMap};

use log::{debug, log_enabled, warn, Level};

use crate::trajectories::{
    itd::Itd,
    traits::{TrajectoryStore, Uid},
    trajectory::Trajectory,
};

/// In-memory population: every user's ITD, keyed by UID.
///
/// Users iterate in ascending UID order. A population-wide frequency table
/// is computed once at construction so total counts are a single lookup.
#[derive(Debug, Clone, Default)]
pub struct Population {
    itds: BTreeMap<Uid, Itd>,
    frequencies: HashMap<Trajectory, u64>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a population from ITDs. UIDs must be unique; if the same UID
    /// shows up twice the last ITD wins.
    pub fn from_itds(itds: impl IntoIterator<Item = Itd>) -> Self {
        let mut by_uid = BTreeMap::new();
        for itd in itds {
            let uid = itd.uid();
            if by_uid.insert(uid, itd).is_some() {
                warn!("Duplicate ITD for user {uid}, keeping the last one");
            }
        }

        let mut frequencies = HashMap::new();
        for itd in by_uid.values() {
            for trajectory in itd.trajectories() {
                *frequencies.entry(trajectory.clone()).or_default() +=
                    itd.count(trajectory);
            }
        }

        let this = Self {
            itds: by_uid,
            frequencies,
        };
        if log_enabled!(Level::Debug) {
            debug!(
                "Loaded population of {} users\n{}",
                this.itds.len(),
                this.itds
                    .values()
                    .map(|itd| itd.to_string())
                    .collect::<Vec<_>>()
                    .join("\n")
            );
        }
        this
    }

    pub fn itd(&self, uid: Uid) -> Option<&Itd> {
        self.itds.get(&uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uid, &Itd)> {
        self.itds.iter()
    }

    pub fn len(&self) -> usize {
        self.itds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itds.is_empty()
    }
}

impl FromIterator<Itd> for Population {
    fn from_iter<I: IntoIterator<Item = Itd>>(iter: I) -> Self {
        Self::from_itds(iter)
    }
}

impl TrajectoryStore for Population {
    fn uids(&self) -> impl Iterator<Item = Uid> + '_ {
        self.itds.keys().copied()
    }

    fn trajectories(&self, uid: Uid) -> &[Trajectory] {
        self.itds
            .get(&uid)
            .map(|itd| itd.trajectories())
            .unwrap_or_default()
    }

    fn count(&self, uid: Uid, trajectory: &Trajectory) -> u64 {
        self.itds
            .get(&uid)
            .map(|itd| itd.count(trajectory))
            .unwrap_or(0)
    }

    fn total_count(&self, trajectory: &Trajectory) -> u64 {
        self.frequencies.get(trajectory).copied().unwrap_or(0)
    }

    fn num_users(&self) -> usize {
        self.itds.len()
    }
}
