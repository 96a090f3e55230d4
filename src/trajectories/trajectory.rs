use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a location (e.g. an area code) visited by a trajectory.
pub type LocationId = u64;

/// A movement trajectory: an ordered sequence of visited locations.
///
/// Trajectories are value objects. Two trajectories are equal iff their
/// location sequences are equal element-wise, and hashing follows the same
/// rule, so they can key maps across ITDs. Visit times are not recorded.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Trajectory {
    locations: Vec<LocationId>,
}

impl Trajectory {
    pub fn new(locations: impl IntoIterator<Item = LocationId>) -> Self {
        Self {
            locations: locations.into_iter().collect(),
        }
    }

    pub fn locations(&self) -> &[LocationId] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl<const N: usize> From<[LocationId; N]> for Trajectory {
    fn from(locations: [LocationId; N]) -> Self {
        Self::new(locations)
    }
}

impl From<Vec<LocationId>> for Trajectory {
    fn from(locations: Vec<LocationId>) -> Self {
        Self { locations }
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, location) in self.locations.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{location}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Trajectory {self}>")
    }
}
