use crate::{
    correlation::risk::user_risk,
    trajectories::{
        traits::{TrajectoryStore, Uid},
        trajectory::Trajectory,
    },
};

/// A user's risky trajectories, highest risk first, with a cursor marking
/// how many have already been sanitized.
///
/// Only trajectories with a risk at or above the threshold are kept. Equal
/// risks keep the user's trajectory order, so the first one wins, as for
/// [`riskiest_trajectory`](crate::correlation::risk::riskiest_trajectory).
/// This is the earliest of the tied trajectories, not the latest one a
/// stack-style pop off an ascending sort would yield.
/// Popping advances the cursor instead of discarding entries, so the
/// consumed prefix stays available.
#[derive(Debug, Clone, Default)]
pub struct RiskyQueue {
    entries: Vec<(Trajectory, f64)>,
    cursor: usize,
}

impl RiskyQueue {
    pub fn build<S: TrajectoryStore>(uid: Uid, store: &S, threshold: f64) -> Self {
        let mut entries: Vec<(Trajectory, f64)> = store
            .trajectories(uid)
            .iter()
            .map(|trajectory| (trajectory.clone(), user_risk(uid, trajectory, store)))
            .filter(|(_, value)| *value >= threshold)
            .collect();

        // Stable sort, descending risk.
        entries.sort_by(|(_, a), (_, b)| b.total_cmp(a));

        Self { entries, cursor: 0 }
    }

    /// Highest-risk trajectory not sanitized yet.
    pub fn peek(&self) -> Option<&(Trajectory, f64)> {
        self.entries.get(self.cursor)
    }

    /// Returns the highest-risk remaining trajectory and moves past it.
    pub fn pop(&mut self) -> Option<&(Trajectory, f64)> {
        let entry = self.entries.get(self.cursor)?;
        self.cursor += 1;
        Some(entry)
    }

    pub fn remaining(&self) -> &[(Trajectory, f64)] {
        &self.entries[self.cursor..]
    }

    pub fn consumed(&self) -> &[(Trajectory, f64)] {
        &self.entries[..self.cursor]
    }

    pub fn len(&self) -> usize {
        self.entries.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor >= self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        correlation::risk::riskiest_trajectory,
        trajectories::{itd::Itd, population::Population},
    };

    #[test]
    fn test_queue_order_and_cursor() {
        let population = Population::mock();
        let mut queue = RiskyQueue::build(1, &population, 0.5);

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.pop().map(|(t, v)| (t.clone(), *v)),
            Some((Trajectory::from([4, 5, 6]), 1.0))
        );
        assert_eq!(
            queue.peek().map(|(t, _)| t.clone()),
            Some(Trajectory::from([1, 2, 3]))
        );
        assert!(queue.pop().is_some());
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
        assert_eq!(queue.consumed().len(), 2);
        assert!(queue.remaining().is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let population = Population::mock();

        // User 2's only trajectory sits exactly at 0.5.
        let queue = RiskyQueue::build(2, &population, 0.5);
        assert_eq!(queue.len(), 1);

        let queue = RiskyQueue::build(2, &population, 0.51);
        assert!(queue.is_empty());
        assert!(queue.peek().is_none());
    }

    #[test]
    fn test_ties_match_riskiest_trajectory() {
        let population = Population::from_itds([Itd::from_counts(
            3,
            [
                (Trajectory::from([2]), 1),
                (Trajectory::from([7]), 6),
                (Trajectory::from([1]), 2),
            ],
        )]);
        let queue = RiskyQueue::build(3, &population, 0.0);
        let (riskiest, _) = riskiest_trajectory(3, &population).unwrap();

        assert_eq!(queue.peek().map(|(t, _)| t), Some(riskiest));
        let order: Vec<_> = queue.remaining().iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            order,
            vec![Trajectory::from([2]), Trajectory::from([7]), Trajectory::from([1])]
        );
    }

    #[test]
    fn test_equal_risks_pop_earliest_first() {
        let population = Population::from_itds([Itd::from_counts(
            1,
            [(Trajectory::from([8]), 1), (Trajectory::from([2]), 4)],
        )]);
        let mut queue = RiskyQueue::build(1, &population, 0.5);

        assert_eq!(queue.peek().map(|(t, v)| (t.clone(), *v)), Some((Trajectory::from([8]), 1.0)));
        assert!(queue.pop().is_some());
        assert_eq!(queue.peek().map(|(t, _)| t.clone()), Some(Trajectory::from([2])));
    }
}
