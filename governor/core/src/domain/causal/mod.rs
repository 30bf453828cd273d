// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Causal Model
//!
//! Discrete Bayesian network over evaluator outputs and one terminal outcome
//! variable. The model answers `P(outcome | evidence)` by exact variable
//! elimination once a complete CPD set has been installed.
//!
//! ```text
//! Uninitialized ──(valid CPDs + consistency check)──▶ Ready
//!       ▲                                              │
//!       └── failed install leaves state unchanged ─────┘ (Ready → Ready on reinstall)
//! ```

pub mod cpd;
pub mod graph;
pub mod inference;
pub mod model;

pub use cpd::{CpdError, TabularCpd, PROBABILITY_TOLERANCE};
pub use graph::{CausalGraph, GraphError};
pub use inference::{discretize, Evidence, OutcomeDistribution};
pub use model::CausalModel;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Uninitialized,
    Ready,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CausalError {
    #[error("Causal model not ready: no valid CPD set installed")]
    ModelNotReady,

    #[error("Causal inference failed: {0}")]
    InferenceError(String),

    #[error("Outcome variable '{0}' is not declared in the causal graph")]
    UnknownOutcome(String),
}
