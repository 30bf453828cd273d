// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Pipeline Orchestrator
//!
//! [`Governor`] is the explicit context object that owns every component of
//! one governor instance. It is assembled once by [`GovernorBuilder`], loads
//! its persisted state through [`Governor::load`], and persists the causal
//! model through [`Governor::save_model`]; nothing touches the filesystem
//! implicitly.
//!
//! One `evaluate` call:
//!
//! ```text
//! input ─▶ scenario ─▶ rules ─▶ weight deltas ─▶ (explore) ─▶ aggregate
//!        ─▶ causal query ─▶ history append ─▶ report ─▶ action controller
//! ```
//!
//! Plugin, rule and CPD failures stay local and are logged. The only errors
//! that reach the caller are failed preconditions: no evaluators at all, no
//! applicable evaluators, or a history write that did not complete.

use crate::application::aggregation::{aggregate, AggregationError};
use crate::application::causal_model::{CausalModelService, InstallReport};
use crate::application::model_fitting::fit_cpds;
use crate::application::registry::{DiscoveryReport, EvaluatorRegistry};
use crate::application::weight_manager::WeightAdaptationManager;
use crate::domain::causal::{discretize, Evidence, ModelState, TabularCpd};
use crate::domain::collaborators::{ActionController, ScenarioDetector};
use crate::domain::config::GovernorConfigManifest;
use crate::domain::evaluator::{Evaluator, EvaluatorCatalog, EvaluatorId, InputData};
use crate::domain::events::GovernorEvent;
use crate::domain::history::DecisionRecord;
use crate::domain::report::{CausalAnalysis, EvaluationReport, FullReport, ReportSummary};
use crate::domain::repository::{CausalModelRepository, DecisionHistoryRepository, RepositoryError};
use crate::domain::rules::{ContextFact, RuleEngine};
use crate::domain::weights::WeightVector;
use crate::infrastructure::collaborators::FieldScenarioDetector;
use crate::infrastructure::event_bus::{EventBus, EventReceiver};
use crate::infrastructure::history_store::{FileDecisionHistoryRepository, InMemoryDecisionHistoryRepository};
use crate::infrastructure::model_store::{FileCausalModelRepository, InMemoryCausalModelRepository};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernorError {
    #[error("No evaluators registered")]
    NoEvaluatorsRegistered,

    #[error("No applicable evaluators: none of the evaluator results carries a positive weight")]
    NoApplicableEvaluators,

    #[error("Decision history unavailable: {0}")]
    History(#[source] RepositoryError),

    #[error("Causal model store unavailable: {0}")]
    ModelStore(#[source] RepositoryError),
}

impl From<AggregationError> for GovernorError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::NoApplicableEvaluators => GovernorError::NoApplicableEvaluators,
        }
    }
}

/// What [`Governor::load`] restored.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub history_records: usize,
    pub causal_state: ModelState,
    pub causal_install: Option<InstallReport>,
}

pub struct Governor {
    registry: EvaluatorRegistry,
    weights: WeightAdaptationManager,
    rules: RuleEngine,
    causal: CausalModelService,
    history: Arc<dyn DecisionHistoryRepository>,
    model_store: Arc<dyn CausalModelRepository>,
    scenario_detector: Arc<dyn ScenarioDetector>,
    action_controller: Option<Arc<dyn ActionController>>,
    event_bus: EventBus,
    explore_each_run: bool,
    discovery: DiscoveryReport,
}

impl Governor {
    pub fn builder() -> GovernorBuilder {
        GovernorBuilder::new()
    }

    /// Restore persisted history and CPD set. Missing files are not errors.
    pub async fn load(&self) -> Result<LoadSummary, GovernorError> {
        let history_records = self
            .history
            .load()
            .await
            .map_err(GovernorError::History)?
            .len();

        let causal_install = match self.model_store.load().await.map_err(GovernorError::ModelStore)? {
            Some(cpds) => Some(self.causal.update_causal_model(cpds)),
            None => None,
        };

        let summary = LoadSummary {
            history_records,
            causal_state: self.causal.state(),
            causal_install,
        };
        tracing::info!(
            history_records = summary.history_records,
            causal_state = ?summary.causal_state,
            "Governor state loaded"
        );
        Ok(summary)
    }

    /// Persist the live CPD set. Returns `false` when no model is installed.
    pub async fn save_model(&self) -> Result<bool, GovernorError> {
        match self.causal.installed_cpds() {
            Some(cpds) => {
                self.model_store
                    .save(&cpds)
                    .await
                    .map_err(GovernorError::ModelStore)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run the full pipeline for one proposed action.
    pub async fn evaluate(&self, input: &InputData) -> Result<EvaluationReport, GovernorError> {
        if self.registry.is_empty() {
            return Err(GovernorError::NoEvaluatorsRegistered);
        }

        let scenario = self.scenario_detector.detect_scenario(input);

        let fact = ContextFact::from_input(input);
        let deltas = self.rules.run(&fact);
        for delta in &deltas {
            self.event_bus.publish(GovernorEvent::RuleFired {
                rule: delta.rule.clone(),
                evaluator_id: delta.evaluator_id.clone(),
                adjustment: delta.adjustment,
                fired_at: chrono::Utc::now(),
            });
        }
        let mut weights = self.weights.apply_rule_deltas(&deltas);
        if self.explore_each_run {
            weights = self.weights.explore();
        }

        let outcome = aggregate(input, self.registry.all(), &weights).await?;

        let (evidence, observed) = self.causal_evidence(&outcome.results);
        let prediction = self.causal.query(&evidence);
        let impact_predictions = prediction
            .as_ref()
            .map(|dist| dist.to_map())
            .unwrap_or_default();
        let causal_analysis = CausalAnalysis::from_query(observed, &prediction);

        let record = DecisionRecord::new(
            scenario.clone(),
            weights.clone(),
            outcome.results.clone(),
            outcome.composite_score,
        );
        self.history
            .append(&record)
            .await
            .map_err(GovernorError::History)?;

        let report = EvaluationReport {
            summary: ReportSummary {
                final_score: outcome.composite_score,
                scenario,
                impact_predictions,
            },
            full_report: FullReport {
                prism_results: outcome.results,
                weight_adjustments: weights,
                causal_analysis,
            },
        };

        metrics::histogram!("governor_final_score").record(report.summary.final_score);
        tracing::info!(
            decision_id = %record.id,
            scenario = %report.summary.scenario,
            final_score = report.summary.final_score,
            rules_fired = deltas.len(),
            "Evaluation completed"
        );
        self.event_bus.publish(GovernorEvent::EvaluationCompleted {
            decision_id: record.id,
            scenario: report.summary.scenario.clone(),
            final_score: report.summary.final_score,
            completed_at: chrono::Utc::now(),
        });

        if let Some(controller) = &self.action_controller {
            if let Err(e) = controller.apply_decision(&report).await {
                tracing::error!(decision_id = %record.id, "Action controller failed: {:#}", e);
                self.event_bus.publish(GovernorEvent::ActionDispatchFailed {
                    decision_id: record.id,
                    error: format!("{:#}", e),
                    failed_at: chrono::Utc::now(),
                });
            }
        }

        Ok(report)
    }

    /// Discretized evaluator scores for every evaluator that is a graph
    /// variable, as state indices and as state names.
    fn causal_evidence(
        &self,
        results: &BTreeMap<EvaluatorId, crate::domain::evaluator::EvaluatorResult>,
    ) -> (Evidence, BTreeMap<String, String>) {
        let graph = self.causal.graph();
        let mut evidence = Evidence::new();
        let mut observed = BTreeMap::new();
        for (id, result) in results {
            let name = id.as_str();
            if name == self.causal.outcome_variable() {
                continue;
            }
            let Some(states) = graph.states(name) else {
                continue;
            };
            let state = discretize(result.score, states.len());
            evidence.insert(name.to_string(), state);
            observed.insert(name.to_string(), states[state].clone());
        }
        (evidence, observed)
    }

    /// Reward-driven weight update for a past decision's observed outcome.
    pub fn refine(&self, outcome_signal: f64, reward: f64) -> WeightVector {
        self.weights.update(outcome_signal, reward)
    }

    /// One exploration step on the canonical weights.
    pub fn explore(&self) -> WeightVector {
        self.weights.explore()
    }

    /// Install CPDs and, if the live model changed, persist it.
    pub async fn install_cpds(&self, cpds: Vec<TabularCpd>) -> Result<InstallReport, GovernorError> {
        let report = self.causal.update_causal_model(cpds);
        if report.applied() {
            self.save_model().await?;
        }
        Ok(report)
    }

    /// Refit every CPD from the stored decision history and install the result.
    pub async fn refit_causal_model(&self, pseudo_count: f64) -> Result<InstallReport, GovernorError> {
        let records = self.history().await?;
        let cpds = fit_cpds(
            self.causal.graph(),
            self.causal.outcome_variable(),
            &records,
            pseudo_count,
        );
        tracing::info!(records = records.len(), cpds = cpds.len(), "Causal model refitted from history");
        self.install_cpds(cpds).await
    }

    pub async fn history(&self) -> Result<Vec<DecisionRecord>, GovernorError> {
        self.history.load().await.map_err(GovernorError::History)
    }

    pub fn weights(&self) -> WeightVector {
        self.weights.current()
    }

    pub fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    pub fn discovery(&self) -> &DiscoveryReport {
        &self.discovery
    }

    pub fn causal_model(&self) -> &CausalModelService {
        &self.causal
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

/// Startup assembly of a [`Governor`].
pub struct GovernorBuilder {
    config: GovernorConfigManifest,
    catalog: Option<EvaluatorCatalog>,
    evaluators: Vec<Arc<dyn Evaluator>>,
    history: Option<Arc<dyn DecisionHistoryRepository>>,
    model_store: Option<Arc<dyn CausalModelRepository>>,
    scenario_detector: Option<Arc<dyn ScenarioDetector>>,
    action_controller: Option<Arc<dyn ActionController>>,
    event_bus: Option<EventBus>,
}

impl Default for GovernorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GovernorBuilder {
    pub fn new() -> Self {
        Self {
            config: GovernorConfigManifest::default(),
            catalog: None,
            evaluators: Vec::new(),
            history: None,
            model_store: None,
            scenario_detector: None,
            action_controller: None,
            event_bus: None,
        }
    }

    pub fn with_config(mut self, config: GovernorConfigManifest) -> Self {
        self.config = config;
        self
    }

    /// Discover evaluators from `catalog` (filtered by `spec.evaluators.enabled`).
    pub fn with_catalog(mut self, catalog: EvaluatorCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Register an evaluator directly, ahead of catalog discovery.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluators.push(evaluator);
        self
    }

    pub fn with_history_repository(mut self, repository: Arc<dyn DecisionHistoryRepository>) -> Self {
        self.history = Some(repository);
        self
    }

    pub fn with_model_repository(mut self, repository: Arc<dyn CausalModelRepository>) -> Self {
        self.model_store = Some(repository);
        self
    }

    pub fn with_scenario_detector(mut self, detector: Arc<dyn ScenarioDetector>) -> Self {
        self.scenario_detector = Some(detector);
        self
    }

    pub fn with_action_controller(mut self, controller: Arc<dyn ActionController>) -> Self {
        self.action_controller = Some(controller);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> anyhow::Result<Governor> {
        self.config.validate()?;
        let spec = &self.config.spec;
        let event_bus = self.event_bus.unwrap_or_default();

        let mut registry = EvaluatorRegistry::new().with_event_bus(event_bus.clone());
        let mut discovery = DiscoveryReport::default();
        for evaluator in self.evaluators {
            let id = evaluator.id().clone();
            match registry.register(evaluator) {
                Ok(()) => discovery.loaded.push(id),
                Err(e) => {
                    tracing::warn!("Skipping evaluator: {}", e);
                    discovery.skipped.push(e);
                }
            }
        }
        if let Some(catalog) = &self.catalog {
            let report = registry.discover(catalog, &spec.evaluators.enabled);
            discovery.loaded.extend(report.loaded);
            discovery.skipped.extend(report.skipped);
        }

        let initial = if spec.weights.initial.is_empty() {
            WeightVector::uniform(registry.ids())
        } else {
            spec.weights
                .initial
                .iter()
                .map(|(id, weight)| Ok((EvaluatorId::new(id.as_str())?, *weight)))
                .collect::<anyhow::Result<WeightVector>>()?
        };
        let weights =
            WeightAdaptationManager::new(initial, &spec.adaptation).with_event_bus(event_bus.clone());

        let causal = CausalModelService::new(
            spec.causal.build_graph()?,
            spec.causal.outcome_variable.clone(),
        )?
        .with_event_bus(event_bus.clone());

        let history: Arc<dyn DecisionHistoryRepository> = match (self.history, &spec.persistence.history_path) {
            (Some(repository), _) => repository,
            (None, Some(path)) => Arc::new(FileDecisionHistoryRepository::new(path.clone())),
            (None, None) => Arc::new(InMemoryDecisionHistoryRepository::new()),
        };
        let model_store: Arc<dyn CausalModelRepository> =
            match (self.model_store, &spec.persistence.causal_model_path) {
                (Some(repository), _) => repository,
                (None, Some(path)) => Arc::new(FileCausalModelRepository::new(path.clone())),
                (None, None) => Arc::new(InMemoryCausalModelRepository::new()),
            };

        if registry.is_empty() {
            tracing::warn!("Governor built without evaluators; evaluate() will fail until one is registered");
        }

        Ok(Governor {
            registry,
            weights,
            rules: RuleEngine::new(spec.rules.clone()),
            causal,
            history,
            model_store,
            scenario_detector: self
                .scenario_detector
                .unwrap_or_else(|| Arc::new(FieldScenarioDetector::default())),
            action_controller: self.action_controller,
            event_bus,
            explore_each_run: spec.adaptation.explore_each_run,
            discovery,
        })
    }
}
