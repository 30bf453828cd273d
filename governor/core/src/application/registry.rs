// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Evaluator Registry
//!
//! Ordered set of evaluators keyed by [`EvaluatorId`]. Evaluators are either
//! registered directly or discovered from a compiled-in
//! [`EvaluatorCatalog`]. Discovery is fault-isolated per candidate: a
//! constructor that errors (or panics), a duplicate id, or a catalog entry
//! whose evaluator reports a different id is logged and skipped while the
//! remaining candidates load normally.

use crate::domain::evaluator::{Evaluator, EvaluatorCatalog, EvaluatorId};
use crate::domain::events::GovernorEvent;
use crate::infrastructure::event_bus::EventBus;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    #[error("Invalid evaluator '{id}': {reason}")]
    InvalidEvaluator { id: String, reason: String },
}

impl RegistryError {
    fn invalid(id: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::InvalidEvaluator {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    pub loaded: Vec<EvaluatorId>,
    pub skipped: Vec<RegistryError>,
}

#[derive(Default)]
pub struct EvaluatorRegistry {
    evaluators: Vec<Arc<dyn Evaluator>>,
    event_bus: Option<EventBus>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Add an evaluator. Ids are well-formed by construction; duplicates are rejected.
    pub fn register(&mut self, evaluator: Arc<dyn Evaluator>) -> Result<(), RegistryError> {
        let id = evaluator.id().clone();
        if self.get(id.as_str()).is_some() {
            return Err(RegistryError::invalid(id.as_str(), "already registered"));
        }

        tracing::debug!(evaluator = %id, "Evaluator registered");
        self.evaluators.push(evaluator);
        Ok(())
    }

    /// Load evaluators from `catalog`.
    ///
    /// With an empty `enabled` list every catalog entry is a candidate, in
    /// catalog order; otherwise only the listed ids, in the listed order.
    pub fn discover(&mut self, catalog: &EvaluatorCatalog, enabled: &[String]) -> DiscoveryReport {
        let candidates: Vec<&str> = if enabled.is_empty() {
            catalog.entries().iter().map(|e| e.id).collect()
        } else {
            enabled.iter().map(String::as_str).collect()
        };

        let mut report = DiscoveryReport::default();
        for candidate in candidates {
            match self.load_candidate(catalog, candidate) {
                Ok(id) => report.loaded.push(id),
                Err(e) => {
                    tracing::warn!("Skipping evaluator during discovery: {}", e);
                    if let Some(bus) = &self.event_bus {
                        bus.publish(GovernorEvent::EvaluatorSkipped {
                            evaluator_id: candidate.to_string(),
                            reason: e.to_string(),
                            skipped_at: chrono::Utc::now(),
                        });
                    }
                    report.skipped.push(e);
                }
            }
        }

        tracing::info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "Evaluator discovery complete"
        );
        report
    }

    fn load_candidate(&mut self, catalog: &EvaluatorCatalog, candidate: &str) -> Result<EvaluatorId, RegistryError> {
        let entry = catalog
            .find(candidate)
            .ok_or_else(|| RegistryError::invalid(candidate, "not present in the evaluator catalog"))?;

        let evaluator = match catch_unwind(AssertUnwindSafe(entry.factory)) {
            Ok(Ok(evaluator)) => evaluator,
            Ok(Err(e)) => return Err(RegistryError::invalid(candidate, e.to_string())),
            Err(_) => return Err(RegistryError::invalid(candidate, "constructor panicked")),
        };

        if evaluator.id().as_str() != candidate {
            return Err(RegistryError::invalid(
                candidate,
                format!("constructed evaluator reports id '{}'", evaluator.id()),
            ));
        }

        let id = evaluator.id().clone();
        self.register(evaluator)?;
        Ok(id)
    }

    /// Registered evaluators in registration order.
    pub fn all(&self) -> &[Arc<dyn Evaluator>] {
        &self.evaluators
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Evaluator>> {
        self.evaluators.iter().find(|e| e.id().as_str() == id)
    }

    pub fn ids(&self) -> Vec<EvaluatorId> {
        self.evaluators.iter().map(|e| e.id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}
