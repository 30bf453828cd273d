// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Weight Adaptation Manager
//!
//! Owns the canonical [`WeightVector`]. Every mutation (rule deltas,
//! exploration, reward update, replacement) runs inside one critical section
//! and ends with a renormalization, so observers only ever see a
//! non-negative vector summing to one.
//!
//! Adaptation is an epsilon-greedy scheme: `explore()` perturbs each weight
//! with probability ε, `update()` pulls every weight toward the observed
//! reward and adds a small jitter so the update is never a fixed point.

use crate::domain::config::AdaptationConfig;
use crate::domain::events::{AdaptationKind, GovernorEvent};
use crate::domain::rules::WeightDelta;
use crate::domain::weights::{normalize, WeightVector};
use crate::infrastructure::event_bus::EventBus;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct ManagerState {
    weights: WeightVector,
    rng: StdRng,
}

pub struct WeightAdaptationManager {
    state: Mutex<ManagerState>,
    learning_rate: f64,
    epsilon: f64,
    exploration_span: f64,
    jitter_span: f64,
    event_bus: Option<EventBus>,
}

impl WeightAdaptationManager {
    pub fn new(initial: WeightVector, config: &AdaptationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            state: Mutex::new(ManagerState {
                weights: normalize(&initial),
                rng,
            }),
            learning_rate: config.learning_rate,
            epsilon: config.epsilon,
            exploration_span: config.exploration_span,
            jitter_span: config.jitter_span,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Snapshot of the canonical weights.
    pub fn current(&self) -> WeightVector {
        self.state.lock().weights.clone()
    }

    /// Swap in a new vector (normalized).
    pub fn replace(&self, weights: WeightVector) -> WeightVector {
        let snapshot = {
            let mut state = self.state.lock();
            state.weights = normalize(&weights);
            state.weights.clone()
        };
        self.announce(AdaptationKind::Replaced, &snapshot);
        snapshot
    }

    /// Apply fired-rule deltas in order, then renormalize.
    ///
    /// A delta for a key that has no weight yet creates it at the mean of the
    /// existing weights (1.0 when the vector is empty). Deltas for the same key
    /// compose.
    pub fn apply_rule_deltas(&self, deltas: &[WeightDelta]) -> WeightVector {
        if deltas.is_empty() {
            return self.current();
        }

        let snapshot = {
            let mut state = self.state.lock();
            let mut working = state.weights.clone();
            for delta in deltas {
                if !working.contains(delta.evaluator_id.as_str()) {
                    let base = working.mean().unwrap_or(1.0);
                    tracing::debug!(
                        evaluator = %delta.evaluator_id,
                        base,
                        "Rule delta targets unweighted evaluator; creating weight"
                    );
                    working.insert(delta.evaluator_id.clone(), base);
                }
                if let Some(weight) = working.entry_mut(&delta.evaluator_id) {
                    *weight = delta.adjustment.apply(*weight);
                }
            }
            state.weights = normalize(&working);
            state.weights.clone()
        };

        self.announce(AdaptationKind::RuleDeltas, &snapshot);
        snapshot
    }

    /// Exploration step of the epsilon-greedy policy.
    pub fn explore(&self) -> WeightVector {
        let snapshot = {
            let mut state = self.state.lock();
            let ManagerState { weights, rng } = &mut *state;
            let mut perturbed = 0usize;
            for weight in weights.values_mut() {
                if rng.random::<f64>() < self.epsilon {
                    let step = rng.random_range(-self.exploration_span..=self.exploration_span);
                    *weight = (*weight + step).max(0.0);
                    perturbed += 1;
                }
            }
            *weights = normalize(weights);
            tracing::debug!(perturbed, "Exploration step applied");
            weights.clone()
        };

        self.announce(AdaptationKind::Exploration, &snapshot);
        snapshot
    }

    /// Reward-driven update: `w ← w + learning_rate·(reward − w)` plus jitter,
    /// clamped at zero and renormalized.
    pub fn update(&self, outcome_signal: f64, reward: f64) -> WeightVector {
        let snapshot = {
            let mut state = self.state.lock();
            let ManagerState { weights, rng } = &mut *state;
            let stepped = reward_step(weights, reward, self.learning_rate, self.jitter_span, rng);
            *weights = normalize(&stepped);
            weights.clone()
        };

        tracing::info!(outcome_signal, reward, "Weights updated from reward");
        self.announce(AdaptationKind::RewardUpdate, &snapshot);
        snapshot
    }

    fn announce(&self, kind: AdaptationKind, weights: &WeightVector) {
        if let Some(bus) = &self.event_bus {
            bus.publish(GovernorEvent::WeightsAdapted {
                kind,
                weights: weights.clone(),
                adapted_at: chrono::Utc::now(),
            });
        }
    }
}

/// The pre-normalization half of a reward update.
pub(crate) fn reward_step(
    weights: &WeightVector,
    reward: f64,
    learning_rate: f64,
    jitter_span: f64,
    rng: &mut impl Rng,
) -> WeightVector {
    let mut stepped = weights.clone();
    stepped.nudge_toward(reward, learning_rate);
    for weight in stepped.values_mut() {
        let jitter = rng.random_range(-jitter_span..=jitter_span);
        *weight = (*weight + jitter).max(0.0);
    }
    stepped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluator::EvaluatorId;
    use crate::domain::rules::Adjustment;

    fn id(s: &str) -> EvaluatorId {
        EvaluatorId::new(s).unwrap()
    }

    fn vector(entries: &[(&str, f64)]) -> WeightVector {
        entries.iter().map(|(k, v)| (id(k), *v)).collect()
    }

    fn seeded(seed: u64) -> AdaptationConfig {
        AdaptationConfig {
            seed: Some(seed),
            ..AdaptationConfig::default()
        }
    }

    fn delta(target: &str, adjustment: Adjustment) -> WeightDelta {
        WeightDelta {
            rule: "test".to_string(),
            evaluator_id: id(target),
            adjustment,
        }
    }

    #[test]
    fn test_initial_weights_are_normalized() {
        let manager = WeightAdaptationManager::new(vector(&[("a", 3.0), ("b", 1.0)]), &seeded(1));
        let weights = manager.current();
        assert!(weights.is_normalized());
        assert_eq!(weights.get("a"), Some(0.75));
    }

    #[test]
    fn test_reward_step_moves_toward_reward_before_normalization() {
        let weights = vector(&[("a", 0.5), ("b", 0.5)]);
        let mut rng = StdRng::seed_from_u64(42);
        let stepped = reward_step(&weights, 1.0, 0.1, 0.001, &mut rng);
        assert!(stepped.get("a").unwrap() > 0.5);
        assert!(stepped.get("b").unwrap() > 0.5);
    }

    #[test]
    fn test_update_keeps_vector_normalized_and_changes_it() {
        let manager = WeightAdaptationManager::new(vector(&[("a", 0.5), ("b", 0.5), ("c", 0.0)]), &seeded(7));
        let before = manager.current();
        let after = manager.update(0.8, 1.0);
        assert!(after.is_normalized());
        assert_ne!(before, after);
    }

    #[test]
    fn test_rule_deltas_compose_in_order() {
        let manager = WeightAdaptationManager::new(vector(&[("a", 0.5), ("b", 0.5)]), &seeded(1));
        let weights = manager.apply_rule_deltas(&[
            delta("a", Adjustment::Multiply(2.0)),
            delta("a", Adjustment::Add(0.5)),
        ]);
        // a: 0.5 * 2 + 0.5 = 1.5, b: 0.5 → a = 0.75
        assert!((weights.get("a").unwrap() - 0.75).abs() < 1e-12);
        assert!(weights.is_normalized());
    }

    #[test]
    fn test_rule_delta_creates_missing_key_at_mean() {
        let manager = WeightAdaptationManager::new(vector(&[("a", 0.25), ("b", 0.75)]), &seeded(1));
        let weights = manager.apply_rule_deltas(&[delta("c", Adjustment::Multiply(1.0))]);
        // c created at mean 0.5, total 1.5
        assert!((weights.get("c").unwrap() - 0.5 / 1.5).abs() < 1e-12);
        assert!(weights.is_normalized());
    }

    #[test]
    fn test_rule_delta_on_empty_vector_uses_unit_base() {
        let manager = WeightAdaptationManager::new(WeightVector::new(), &seeded(1));
        let weights = manager.apply_rule_deltas(&[delta("only", Adjustment::Multiply(0.5))]);
        assert_eq!(weights.get("only"), Some(1.0));
    }

    #[test]
    fn test_negative_delta_clamped_then_equal_shares() {
        let manager = WeightAdaptationManager::new(vector(&[("a", 1.0)]), &seeded(1));
        let weights = manager.apply_rule_deltas(&[delta("a", Adjustment::Add(-5.0))]);
        assert_eq!(weights.get("a"), Some(1.0));
    }

    #[test]
    fn test_explore_with_full_epsilon_perturbs_and_normalizes() {
        let config = AdaptationConfig {
            epsilon: 1.0,
            exploration_span: 0.05,
            seed: Some(3),
            ..AdaptationConfig::default()
        };
        let manager = WeightAdaptationManager::new(vector(&[("a", 0.5), ("b", 0.5)]), &config);
        let weights = manager.explore();
        assert!(weights.is_normalized());
        assert_ne!(weights.get("a"), Some(0.5));
    }

    #[test]
    fn test_explore_with_zero_epsilon_is_identity() {
        let config = AdaptationConfig {
            epsilon: 0.0,
            seed: Some(3),
            ..AdaptationConfig::default()
        };
        let manager = WeightAdaptationManager::new(vector(&[("a", 0.25), ("b", 0.75)]), &config);
        assert_eq!(manager.explore(), vector(&[("a", 0.25), ("b", 0.75)]));
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let run = || {
            let manager = WeightAdaptationManager::new(vector(&[("a", 0.3), ("b", 0.7)]), &seeded(99));
            manager.update(0.0, 0.2);
            manager.update(0.0, 0.9);
            manager.current()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_replace_normalizes_and_announces() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe_kinds(&["weights_adapted"]);
        let manager = WeightAdaptationManager::new(vector(&[("a", 1.0)]), &seeded(1)).with_event_bus(bus);

        let weights = manager.replace(vector(&[("x", 2.0), ("y", 2.0)]));
        assert_eq!(weights.get("x"), Some(0.5));
        assert_eq!(receiver.drain().len(), 1);
    }

    #[test]
    fn test_concurrent_mutations_preserve_invariant() {
        let manager = std::sync::Arc::new(WeightAdaptationManager::new(
            vector(&[("a", 0.2), ("b", 0.3), ("c", 0.5)]),
            &AdaptationConfig {
                epsilon: 1.0,
                seed: Some(5),
                ..AdaptationConfig::default()
            },
        ));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if i % 2 == 0 {
                            manager.update(0.0, 0.7);
                        } else {
                            manager.explore();
                        }
                        assert!(manager.current().is_normalized());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
