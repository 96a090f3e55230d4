use crate::trajectories::trajectory::Trajectory;

/// User identifier. The ascending numeric order of UIDs is the canonical
/// order used wherever users are mapped to matrix indices.
pub type Uid = u64;

/// Interface to a population of per-user trajectory histories.
///
/// Ingestion lives outside this crate; whatever builds the histories only
/// has to expose them through this trait. Counts are non-negative and
/// trajectories compare structurally.
pub trait TrajectoryStore {
    /// UIDs of every user in the population, in ascending order.
    fn uids(&self) -> impl Iterator<Item = Uid> + '_;

    /// Distinct trajectories observed for `uid`, in a stable order. Unknown
    /// users have no trajectories.
    fn trajectories(&self, uid: Uid) -> &[Trajectory];

    /// Number of times `uid` produced `trajectory`, zero if never.
    fn count(&self, uid: Uid, trajectory: &Trajectory) -> u64;

    /// Number of occurrences of `trajectory` over the whole population.
    fn total_count(&self, trajectory: &Trajectory) -> u64 {
        self.uids().map(|uid| self.count(uid, trajectory)).sum()
    }

    fn num_users(&self) -> usize {
        self.uids().count()
    }
}
