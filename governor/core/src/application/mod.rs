// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod registry;
pub mod aggregation;
pub mod weight_manager;
pub mod causal_model;
pub mod model_fitting;
pub mod pipeline;

// Re-export services for convenience
pub use registry::{DiscoveryReport, EvaluatorRegistry, RegistryError};
pub use aggregation::{aggregate, route_input, AggregationError, AggregationOutcome, EvaluatorFailure};
pub use weight_manager::WeightAdaptationManager;
pub use causal_model::{CausalModelService, InstallReport, RejectedCpd};
pub use model_fitting::fit_cpds;
pub use pipeline::{Governor, GovernorBuilder, GovernorError, LoadSummary};
