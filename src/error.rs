use thiserror::Error;

use crate::trajectories::{traits::Uid, trajectory::Trajectory};

/// Errors surfaced by the sanitization pipeline. Any of them aborts the
/// current sanitize call; no partial release is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Local id lookup for a trajectory the user never produced. Count
    /// queries do not go through this path, they default to zero.
    #[error("trajectory {trajectory} is not in the ITD of user {uid}")]
    UnknownTrajectory { uid: Uid, trajectory: Trajectory },

    /// The budget search for `uid` did not reach its stopping condition
    /// within the iteration cap.
    #[error(
        "budget search for user {uid} did not converge after {iterations} iterations (last disclosure {disclosure})"
    )]
    NonConvergence {
        uid: Uid,
        iterations: usize,
        disclosure: f64,
    },

    #[error("invalid value {value} for parameter `{name}`")]
    InvalidParameter { name: &'static str, value: f64 },

    /// The optimizer drove a budget to zero or below, so no finite noise
    /// scale can be derived from it.
    #[error("optimized budget {budget} for user {uid} is not positive")]
    InvalidBudget { uid: Uid, budget: f64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
