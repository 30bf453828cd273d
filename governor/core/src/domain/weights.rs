// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Weight Vector
//!
//! Per-evaluator contribution to the composite score. Outside an in-progress
//! update the vector is non-negative and sums to `1.0` within
//! [`WEIGHT_TOLERANCE`]. Only the weight adaptation manager mutates the
//! canonical vector; everything else reads snapshots.

use crate::domain::evaluator::EvaluatorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Allowed deviation of the weight sum from `1.0`.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(BTreeMap<EvaluatorId, f64>);

impl WeightVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equal shares over the given keys.
    pub fn uniform<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = EvaluatorId>,
    {
        let mut weights: BTreeMap<EvaluatorId, f64> = ids.into_iter().map(|id| (id, 0.0)).collect();
        let share = 1.0 / weights.len().max(1) as f64;
        for value in weights.values_mut() {
            *value = share;
        }
        Self(weights)
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.0.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn insert(&mut self, id: EvaluatorId, weight: f64) {
        self.0.insert(id, weight);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EvaluatorId, &f64)> {
        self.0.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EvaluatorId> {
        self.0.keys()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.0.values_mut()
    }

    pub(crate) fn entry_mut(&mut self, id: &EvaluatorId) -> Option<&mut f64> {
        self.0.get_mut(id)
    }

    /// Mean weight, used as the neutral base for keys created by a rule delta.
    pub fn mean(&self) -> Option<f64> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.sum() / self.0.len() as f64)
        }
    }

    /// Non-negative and summing to one within tolerance (vacuously true when empty).
    pub fn is_normalized(&self) -> bool {
        if self.0.is_empty() {
            return true;
        }
        self.0.values().all(|w| w.is_finite() && *w >= 0.0)
            && (self.sum() - 1.0).abs() <= WEIGHT_TOLERANCE
    }

    /// Move every weight toward `reward` by `learning_rate`:
    /// `w ← w + learning_rate · (reward − w)`.
    pub fn nudge_toward(&mut self, reward: f64, learning_rate: f64) {
        for weight in self.0.values_mut() {
            *weight += learning_rate * (reward - *weight);
        }
    }

    pub fn as_map(&self) -> &BTreeMap<EvaluatorId, f64> {
        &self.0
    }
}

impl FromIterator<(EvaluatorId, f64)> for WeightVector {
    fn from_iter<T: IntoIterator<Item = (EvaluatorId, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Scale a weight vector so it sums to one.
///
/// Negative or non-finite entries count as zero. When the total is zero the
/// result is an equal share over the same key set.
pub fn normalize(weights: &WeightVector) -> WeightVector {
    let cleaned: BTreeMap<EvaluatorId, f64> = weights
        .0
        .iter()
        .map(|(id, w)| (id.clone(), if w.is_finite() && *w > 0.0 { *w } else { 0.0 }))
        .collect();

    let total: f64 = cleaned.values().sum();
    if total <= 0.0 || !total.is_finite() {
        if !cleaned.is_empty() {
            tracing::warn!("Total weight is zero; falling back to equal distribution");
        }
        return WeightVector::uniform(cleaned.into_keys());
    }

    WeightVector(cleaned.into_iter().map(|(id, w)| (id, w / total)).collect())
}
