use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use rand::RngCore;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    budget::budget_vector::BudgetVector,
    correlation::{idfa::BudgetOptimizer, risk::risk},
    error::{Error, Result},
    mechanisms::LaplaceMechanism,
    sanitizer::{config::SanitizerConfig, context::SanitizationContext},
    trajectories::{
        traits::{TrajectoryStore, Uid},
        trajectory::Trajectory,
    },
};

/// Released (noised) count of every trajectory of every user.
pub type NoisedCounts = BTreeMap<Uid, HashMap<Trajectory, f64>>;

/// Outcome of a sanitize call, with the per-round details that went into
/// the release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedRelease {
    /// Serialized as `uid -> [(trajectory, count)]`, trajectories ascending,
    /// since many formats only accept string map keys.
    #[serde(
        serialize_with = "serialize_noised_counts",
        deserialize_with = "deserialize_noised_counts"
    )]
    pub noised_counts: NoisedCounts,

    /// Number of rounds executed.
    pub rounds: usize,

    /// Noise scales accumulated for each user, one per round in which the
    /// user had a riskiest trajectory.
    pub noise_scales: BTreeMap<Uid, Vec<f64>>,

    /// Optimized budgets of each round, in round order.
    pub budgets: Vec<BudgetVector>,

    /// True when the round cap stopped the run while risky trajectories
    /// were still queued.
    pub truncated: bool,
}

fn serialize_noised_counts<S: Serializer>(
    noised_counts: &NoisedCounts,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let pairs: BTreeMap<Uid, Vec<(&Trajectory, f64)>> = noised_counts
        .iter()
        .map(|(uid, counts)| {
            let mut pairs: Vec<(&Trajectory, f64)> =
                counts.iter().map(|(trajectory, count)| (trajectory, *count)).collect();
            pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
            (*uid, pairs)
        })
        .collect();
    pairs.serialize(serializer)
}

fn deserialize_noised_counts<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<NoisedCounts, D::Error> {
    let pairs = BTreeMap::<Uid, Vec<(Trajectory, f64)>>::deserialize(deserializer)?;
    Ok(pairs
        .into_iter()
        .map(|(uid, pairs)| (uid, pairs.into_iter().collect()))
        .collect())
}

/// Sanitizes trajectory counts round by round.
///
/// Each round takes the riskiest remaining trajectory of every user,
/// optimizes the budgets for that assignment and derives one noise scale
/// per assigned user from the count reduction its trajectory needs. Scales
/// accumulate over rounds, and the release is drawn once all rounds are
/// done, so every count carries the noise of every round its user took
/// part in.
///
/// Budgets shared by a large affected set can be driven to zero by the
/// optimizer, e.g. for a user holding one occurrence of the riskiest
/// trajectory of many others. The run then fails with
/// [`Error::InvalidBudget`] instead of releasing anything.
pub struct Sanitizer<R = ChaCha20Rng> {
    config: SanitizerConfig,
    optimizer: BudgetOptimizer,
    mechanism: LaplaceMechanism<R>,
}

impl Sanitizer<ChaCha20Rng> {
    /// Sanitizer drawing its noise from a generator seeded with
    /// `config.seed`.
    pub fn from_config(config: SanitizerConfig) -> Result<Self> {
        let mechanism = LaplaceMechanism::from_seed(config.seed);
        Self::new(config, mechanism)
    }
}

impl<R: RngCore> Sanitizer<R> {
    pub fn new(config: SanitizerConfig, mechanism: LaplaceMechanism<R>) -> Result<Self> {
        config.validate()?;
        let optimizer = config.optimizer();
        Ok(Self {
            config,
            optimizer,
            mechanism,
        })
    }

    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    pub fn run<S: TrajectoryStore>(&mut self, store: &S) -> Result<SanitizedRelease> {
        let threshold = self.config.risk_threshold;
        let mut context = SanitizationContext::new(store, threshold);

        while context.rounds() < self.config.max_rounds {
            let riskiest = context.next_assignment();
            if riskiest.is_empty() {
                break;
            }
            info!("Sanitization round {}...", context.rounds() + 1);
            debug!("riskiest = {riskiest:?}");

            let budgets = self.optimizer.optimize(store, &riskiest)?;

            for (uid, trajectory) in &riskiest {
                let budget = budgets.get(*uid);
                if !(budget > 0.0) {
                    return Err(Error::InvalidBudget { uid: *uid, budget });
                }
                let loops = reduction_loops(*uid, trajectory, store, threshold);
                context.record_scale(*uid, loops as f64 / budget);
            }
            context.record_budgets(budgets);
        }

        let truncated = context.has_pending();
        if truncated {
            warn!(
                "Stopped after {} rounds with risky trajectories left",
                context.rounds()
            );
        }

        let noised_counts = self.release(store, &context);
        let rounds = context.rounds();
        let (noise_scales, budgets) = context.into_parts();
        info!("noise_scale = {noise_scales:?}");

        Ok(SanitizedRelease {
            noised_counts,
            rounds,
            noise_scales,
            budgets,
            truncated,
        })
    }

    /// Adds one Laplace draw per accumulated scale of the user to the true
    /// count of each of the user's trajectories. Users are visited in
    /// ascending UID order and trajectories in ITD order, which fixes the
    /// sequence of draws for a given seed.
    fn release<S: TrajectoryStore>(
        &mut self,
        store: &S,
        context: &SanitizationContext,
    ) -> NoisedCounts {
        let mut noised_counts = NoisedCounts::new();
        for uid in store.uids() {
            let scales = context.noise_scales(uid);
            let counts = store
                .trajectories(uid)
                .iter()
                .map(|trajectory| {
                    let count = store.count(uid, trajectory) as f64;
                    (trajectory.clone(), self.mechanism.add_noise(count, scales))
                })
                .collect();
            noised_counts.insert(uid, counts);
        }
        noised_counts
    }
}

/// Number of single-occurrence decrements that bring the risk of `uid`'s
/// `trajectory` strictly below `threshold`, starting from its true count.
///
/// The population total is left untouched while the count shrinks, so a
/// zero threshold is only crossed once the count goes negative.
pub fn reduction_loops<S: TrajectoryStore>(
    uid: Uid,
    trajectory: &Trajectory,
    store: &S,
    threshold: f64,
) -> u64 {
    // Nobody holds it, the risk is already zero.
    if store.total_count(trajectory) == 0 {
        return 0;
    }

    let count = store.count(uid, trajectory) as i64;
    let mut reduced = count;
    while risk(reduced, trajectory, store) >= threshold {
        reduced -= 1;
    }
    (count - reduced) as u64
}

/// Sanitizes `store` with the default optimizer parameters and returns the
/// released counts.
///
/// `max_rounds` caps the number of rounds; `seed` seeds the noise
/// generator.
pub fn sanitize<S: TrajectoryStore>(
    store: &S,
    risk_threshold: f64,
    max_rounds: usize,
    seed: u64,
) -> Result<NoisedCounts> {
    let config = SanitizerConfig::new(risk_threshold, max_rounds).with_seed(seed);
    let release = Sanitizer::from_config(config)?.run(store)?;
    Ok(release.noised_counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectories::{itd::Itd, population::Population};

    #[test]
    fn test_reduction_loops() {
        let population = Population::mock();

        // 5 of 10 occurrences: one decrement reaches 0.4 < 0.5.
        assert_eq!(
            reduction_loops(1, &Trajectory::from([1, 2, 3]), &population, 0.5),
            1
        );
        // Sole holder of a single occurrence: 1.0 -> 0.0.
        assert_eq!(
            reduction_loops(1, &Trajectory::from([4, 5, 6]), &population, 0.5),
            1
        );
        // Zero threshold needs a negative count.
        assert_eq!(
            reduction_loops(2, &Trajectory::from([1, 2, 3]), &population, 0.0),
            6
        );
        assert_eq!(
            reduction_loops(2, &Trajectory::from([9]), &population, 0.0),
            0
        );
    }

    #[test]
    fn test_two_user_scenario() -> Result<(), anyhow::Error> {
        log4rs::init_file("logging_config.yaml", Default::default()).unwrap();

        let population = Population::mock();
        let config = SanitizerConfig::default().with_seed(11);
        let release = Sanitizer::from_config(config)?.run(&population)?;

        // Round 1: user 1 -> (4,5,6), user 2 -> (1,2,3).
        // Round 2: user 1 -> (1,2,3).
        assert_eq!(release.rounds, 2);
        assert!(!release.truncated);
        assert_eq!(release.noise_scales[&1].len(), 2);
        assert_eq!(release.noise_scales[&2].len(), 1);

        // In round 1, user 2's riskiest trajectory also sits in user 1's
        // history, so user 1 discloses 0.1 + 0.25 * 0.1 and its search
        // raises both budgets together until 1.25 * eps > 1.
        let round_one = &release.budgets[0];
        assert_eq!(round_one.get(1), round_one.get(2));
        assert!(round_one.get(1) > 0.75 && round_one.get(1) < 0.9);
        assert_eq!(release.noise_scales[&1][0], release.noise_scales[&2][0]);
        assert!((release.noise_scales[&1][0] - 1.0 / round_one.get(1)).abs() < 1e-9);

        // In round 2, user 1 only weakly points at user 2 and discloses
        // exactly its initial budget: 1 decrement / 0.1.
        assert!((release.noise_scales[&1][1] - 10.0).abs() < 1e-9);

        // Every trajectory of every user is released.
        assert_eq!(release.noised_counts[&1].len(), 2);
        assert_eq!(release.noised_counts[&2].len(), 1);
        assert!(release
            .noised_counts
            .values()
            .flat_map(|counts| counts.values())
            .all(|count| count.is_finite()));
        Ok(())
    }

    #[test]
    fn test_same_seed_same_release() -> Result<(), anyhow::Error> {
        let population = Population::mock();
        let a = sanitize(&population, 0.5, 10, 3)?;
        let b = sanitize(&population, 0.5, 10, 3)?;
        let c = sanitize(&population, 0.5, 10, 4)?;

        assert_eq!(a, b);
        assert_ne!(a, c);
        Ok(())
    }

    #[test]
    fn test_round_cap() -> Result<(), anyhow::Error> {
        let population = Population::mock();
        let config = SanitizerConfig::new(0.5, 1);
        let release = Sanitizer::from_config(config)?.run(&population)?;

        assert_eq!(release.rounds, 1);
        assert!(release.truncated);
        assert_eq!(release.budgets.len(), 1);
        Ok(())
    }

    #[test]
    fn test_nothing_risky_releases_true_counts() -> Result<(), anyhow::Error> {
        // Two users with identical histories: every risk is 0.5.
        let population: Population = [1, 2]
            .into_iter()
            .map(|uid| Itd::from_counts(uid, [(Trajectory::from([3]), 4)]))
            .collect();

        let released = sanitize(&population, 0.75, 10, 0)?;

        for uid in [1, 2] {
            assert_eq!(released[&uid][&Trajectory::from([3])], 4.0);
        }
        Ok(())
    }

    #[test]
    fn test_empty_population() -> Result<(), anyhow::Error> {
        let released = sanitize(&Population::new(), 0.5, 10, 0)?;
        assert!(released.is_empty());
        Ok(())
    }

    #[test]
    fn test_hub_user_exhausts_shared_budget() {
        // User 0 holds a trajectory of its own plus one occurrence of the
        // riskiest trajectory of each of 77 other users. All 78 budgets
        // then sit in user 0's affected set, and pulling its disclosure
        // under the bound takes them from 0.1 down to 0.
        let others = 77;
        let hub = Itd::from_counts(
            0,
            std::iter::once((Trajectory::from([0]), 1))
                .chain((1..=others).map(|uid| (Trajectory::from([uid]), 1))),
        );
        let population = Population::from_itds(
            std::iter::once(hub).chain(
                (1..=others).map(|uid| Itd::from_counts(uid, [(Trajectory::from([uid]), 5)])),
            ),
        );

        let result = sanitize(&population, 0.5, 1000, 1);

        match result {
            Err(Error::InvalidBudget { uid, budget }) => {
                assert_eq!(uid, 0);
                assert!(budget <= 0.0);
            }
            other => panic!("expected an invalid budget, got {other:?}"),
        }
    }

    #[test]
    fn test_release_json_roundtrip() -> Result<(), anyhow::Error> {
        let population = Population::mock();
        let release = Sanitizer::from_config(SanitizerConfig::mock())?.run(&population)?;

        let json = serde_json::to_string(&release)?;
        let decoded: SanitizedRelease = serde_json::from_str(&json)?;

        assert_eq!(decoded, release);
        assert_eq!(decoded.noised_counts[&1].len(), 2);
        Ok(())
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = sanitize(&Population::mock(), 2.0, 10, 0);
        assert!(matches!(
            result,
            Err(Error::InvalidParameter {
                name: "risk_threshold",
                ..
            })
        ));
    }
}
