// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Causal Model Service
//!
//! Concurrent front end of the causal model. Queries read an immutable
//! [`CausalModel`] snapshot behind an `Arc`; installs are serialized by a
//! writer lock, validate each CPD on its own, merge the valid ones over the
//! current snapshot's CPDs, and only replace the snapshot if the merged set
//! passes the model-wide consistency check. A query in flight during an
//! install sees either the complete old snapshot or the complete new one.

use crate::domain::causal::{
    CausalError, CausalGraph, CausalModel, CpdError, Evidence, ModelState, OutcomeDistribution, TabularCpd,
};
use crate::domain::events::GovernorEvent;
use crate::infrastructure::event_bus::EventBus;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-CPD rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCpd {
    pub variable: String,
    pub error: CpdError,
}

/// Result of one `update_causal_model` call.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallReport {
    /// Variables whose CPD passed structural validation.
    pub installed: Vec<String>,
    pub rejected: Vec<RejectedCpd>,
    /// Why the merged set did not become live, if it did not.
    pub consistency_error: Option<CpdError>,
    pub state: ModelState,
}

impl InstallReport {
    /// Whether this call replaced the live snapshot.
    pub fn applied(&self) -> bool {
        self.consistency_error.is_none() && !self.installed.is_empty()
    }
}

pub struct CausalModelService {
    graph: Arc<CausalGraph>,
    outcome: String,
    snapshot: RwLock<Option<Arc<CausalModel>>>,
    install_lock: Mutex<()>,
    event_bus: Option<EventBus>,
}

impl CausalModelService {
    pub fn new(graph: CausalGraph, outcome: impl Into<String>) -> Result<Self, CausalError> {
        let outcome = outcome.into();
        if !graph.contains(&outcome) {
            return Err(CausalError::UnknownOutcome(outcome));
        }
        Ok(Self {
            graph: Arc::new(graph),
            outcome,
            snapshot: RwLock::new(None),
            install_lock: Mutex::new(()),
            event_bus: None,
        })
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn graph(&self) -> &CausalGraph {
        &self.graph
    }

    pub fn outcome_variable(&self) -> &str {
        &self.outcome
    }

    pub fn state(&self) -> ModelState {
        if self.snapshot.read().is_some() {
            ModelState::Ready
        } else {
            ModelState::Uninitialized
        }
    }

    /// The live model, if any.
    pub fn snapshot(&self) -> Option<Arc<CausalModel>> {
        self.snapshot.read().clone()
    }

    /// CPDs of the live model, in variable order.
    pub fn installed_cpds(&self) -> Option<Vec<TabularCpd>> {
        self.snapshot()
            .map(|model| model.cpds().values().cloned().collect())
    }

    /// Validate and install a batch of CPDs.
    ///
    /// Invalid CPDs are rejected one by one and never block valid ones. The
    /// valid ones are merged over the live CPD set (or an empty set) and the
    /// result goes live only if it is complete and normalized.
    pub fn update_causal_model<I>(&self, cpds: I) -> InstallReport
    where
        I: IntoIterator<Item = TabularCpd>,
    {
        let _writer = self.install_lock.lock();

        let mut candidate: BTreeMap<String, TabularCpd> = self
            .snapshot()
            .map(|model| model.cpds().clone())
            .unwrap_or_default();

        let mut installed = Vec::new();
        let mut rejected = Vec::new();
        for cpd in cpds {
            match cpd.validate(&self.graph) {
                Ok(()) => {
                    installed.push(cpd.variable.clone());
                    candidate.insert(cpd.variable.clone(), cpd);
                }
                Err(error) => {
                    tracing::warn!(variable = %cpd.variable, "Rejected CPD: {}", error);
                    metrics::counter!("governor_cpd_rejections_total").increment(1);
                    self.publish(GovernorEvent::CpdRejected {
                        variable: cpd.variable.clone(),
                        reason: error.to_string(),
                        rejected_at: chrono::Utc::now(),
                    });
                    rejected.push(RejectedCpd {
                        variable: cpd.variable,
                        error,
                    });
                }
            }
        }

        let consistency_error = if installed.is_empty() {
            None
        } else {
            match CausalModel::assemble(self.graph.clone(), self.outcome.clone(), candidate) {
                Ok(model) => {
                    *self.snapshot.write() = Some(Arc::new(model));
                    tracing::info!(
                        variables = self.graph.len(),
                        updated = installed.len(),
                        "Causal model installed"
                    );
                    self.publish(GovernorEvent::CausalModelInstalled {
                        variables: self.graph.len(),
                        installed_at: chrono::Utc::now(),
                    });
                    None
                }
                Err(error) => {
                    tracing::warn!(
                        "Causal model consistency check failed; keeping previous state: {}",
                        error
                    );
                    Some(error)
                }
            }
        };

        InstallReport {
            installed,
            rejected,
            consistency_error,
            state: self.state(),
        }
    }

    /// `P(outcome | evidence)` on the live snapshot.
    pub fn query(&self, evidence: &Evidence) -> Result<OutcomeDistribution, CausalError> {
        let model = self.snapshot().ok_or(CausalError::ModelNotReady)?;
        model.query(evidence).inspect_err(|e| {
            tracing::warn!("Causal query failed: {}", e);
        })
    }

    fn publish(&self, event: GovernorEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}
