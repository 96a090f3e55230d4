use std::{collections::HashMap, fmt};

use crate::{
    error::{Error, Result},
    trajectories::{traits::Uid, trajectory::Trajectory},
};

/// Accumulates the observed trajectories of one user before freezing them
/// into an [`Itd`].
#[derive(Debug, Clone)]
pub struct ItdBuilder {
    uid: Uid,
    counts: Vec<(Trajectory, u64)>,
    positions: HashMap<Trajectory, usize>,
}

impl ItdBuilder {
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            counts: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Records one more occurrence of `trajectory`.
    pub fn add(&mut self, trajectory: Trajectory) -> &mut Self {
        self.add_count(trajectory, 1)
    }

    /// Records `count` occurrences of `trajectory` at once. Zero counts are
    /// ignored, so every trajectory of the built ITD has a count of at
    /// least one.
    pub fn add_count(&mut self, trajectory: Trajectory, count: u64) -> &mut Self {
        if count == 0 {
            return self;
        }
        match self.positions.get(&trajectory) {
            Some(&position) => self.counts[position].1 += count,
            None => {
                self.positions.insert(trajectory.clone(), self.counts.len());
                self.counts.push((trajectory, count));
            }
        }
        self
    }

    pub fn build(self) -> Itd {
        let mut trajectories = Vec::with_capacity(self.counts.len());
        let mut ids = HashMap::with_capacity(self.counts.len());
        let mut counts = HashMap::with_capacity(self.counts.len());

        for (id, (trajectory, count)) in self.counts.into_iter().enumerate() {
            ids.insert(trajectory.clone(), id);
            counts.insert(trajectory.clone(), count);
            trajectories.push(trajectory);
        }

        Itd {
            uid: self.uid,
            trajectories,
            ids,
            counts,
        }
    }
}

/// Individual trajectory database: the multiset of trajectories observed
/// for a single user.
///
/// Trajectories keep their first-observation order, and each one gets a
/// small local id equal to its position in that order. Immutable once
/// built.
#[derive(Debug, Clone)]
pub struct Itd {
    uid: Uid,
    trajectories: Vec<Trajectory>,
    ids: HashMap<Trajectory, usize>,
    counts: HashMap<Trajectory, u64>,
}

impl Itd {
    pub fn builder(uid: Uid) -> ItdBuilder {
        ItdBuilder::new(uid)
    }

    /// Convenience constructor from `(trajectory, count)` pairs.
    pub fn from_counts(
        uid: Uid,
        counts: impl IntoIterator<Item = (Trajectory, u64)>,
    ) -> Self {
        let mut builder = ItdBuilder::new(uid);
        for (trajectory, count) in counts {
            builder.add_count(trajectory, count);
        }
        builder.build()
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    /// Local id of `trajectory`. Asking for a trajectory this user never
    /// produced is an error.
    pub fn id(&self, trajectory: &Trajectory) -> Result<usize> {
        self.ids
            .get(trajectory)
            .copied()
            .ok_or_else(|| Error::UnknownTrajectory {
                uid: self.uid,
                trajectory: trajectory.clone(),
            })
    }

    /// Occurrence count of `trajectory`, zero when absent.
    pub fn count(&self, trajectory: &Trajectory) -> u64 {
        self.counts.get(trajectory).copied().unwrap_or(0)
    }

    pub fn contains(&self, trajectory: &Trajectory) -> bool {
        self.counts.contains_key(trajectory)
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }
}

impl fmt::Display for Itd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ITD uid:{}", self.uid)?;
        for (id, trajectory) in self.trajectories.iter().enumerate() {
            write!(
                f,
                "\n     tid:{id} cnt:{} {trajectory}",
                self.count(trajectory)
            )?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates_counts() {
        let mut builder = Itd::builder(7);
        builder
            .add(Trajectory::from([1, 2]))
            .add(Trajectory::from([3]))
            .add(Trajectory::from([1, 2]))
            .add_count(Trajectory::from([4]), 0);
        let itd = builder.build();

        assert_eq!(itd.uid(), 7);
        assert_eq!(itd.len(), 2);
        assert_eq!(itd.count(&Trajectory::from([1, 2])), 2);
        assert_eq!(itd.count(&Trajectory::from([3])), 1);
        assert!(!itd.contains(&Trajectory::from([4])));
    }

    #[test]
    fn test_ids_follow_first_observation() -> Result<(), anyhow::Error> {
        let itd = Itd::from_counts(
            1,
            [
                (Trajectory::from([9]), 1),
                (Trajectory::from([5]), 3),
                (Trajectory::from([9]), 2),
            ],
        );

        assert_eq!(itd.id(&Trajectory::from([9]))?, 0);
        assert_eq!(itd.id(&Trajectory::from([5]))?, 1);
        assert_eq!(itd.count(&Trajectory::from([9])), 3);
        assert_eq!(
            itd.trajectories(),
            &[Trajectory::from([9]), Trajectory::from([5])]
        );

        Ok(())
    }

    #[test]
    fn test_absent_trajectory() {
        let itd = Itd::from_counts(3, [(Trajectory::from([1, 2, 3]), 5)]);
        let absent = Trajectory::from([4, 5, 6]);

        // Counts default to zero, ids do not.
        assert_eq!(itd.count(&absent), 0);
        assert_eq!(
            itd.id(&absent),
            Err(Error::UnknownTrajectory {
                uid: 3,
                trajectory: absent,
            })
        );
    }

    #[test]
    fn test_display() {
        let itd = Itd::from_counts(
            2,
            [(Trajectory::from([1, 2]), 4), (Trajectory::from([3]), 1)],
        );
        assert_eq!(
            itd.to_string(),
            "<ITD uid:2\n     tid:0 cnt:4 (1, 2)\n     tid:1 cnt:1 (3)>"
        );
    }
}
