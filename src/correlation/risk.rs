use crate::trajectories::{
    traits::{TrajectoryStore, Uid},
    trajectory::Trajectory,
};

/// Risk of releasing `count` occurrences of `trajectory`: the share of all
/// occurrences of that exact trajectory in the population that `count`
/// accounts for.
///
/// `count` must not exceed the true count of the user supplying it. When no
/// user holds the trajectory at all the risk is zero.
pub fn risk<S: TrajectoryStore>(
    count: i64,
    trajectory: &Trajectory,
    store: &S,
) -> f64 {
    let total = store.total_count(trajectory);
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64
}

/// Risk of a user's own trajectory, at its true count.
pub fn user_risk<S: TrajectoryStore>(
    uid: Uid,
    trajectory: &Trajectory,
    store: &S,
) -> f64 {
    risk(store.count(uid, trajectory) as i64, trajectory, store)
}

/// The trajectory of `uid` with the highest risk, or `None` if the user has
/// no trajectories.
///
/// Ties go to the first maximum in the user's trajectory order.
pub fn riskiest_trajectory<S: TrajectoryStore>(
    uid: Uid,
    store: &S,
) -> Option<(&Trajectory, f64)> {
    let mut riskiest: Option<(&Trajectory, f64)> = None;
    for trajectory in store.trajectories(uid) {
        let value = user_risk(uid, trajectory, store);
        match riskiest {
            Some((_, best)) if value <= best => {}
            _ => riskiest = Some((trajectory, value)),
        }
    }
    riskiest
}
