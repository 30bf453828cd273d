// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Governor Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing:
// - which compiled-in evaluators to enable
// - initial weights and adaptation parameters
// - contextual weight rules
// - causal graph structure
// - persistence locations

use crate::domain::causal::CausalGraph;
use crate::domain::rules::{default_rules, Rule};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "prism-governor/v1";
pub const KIND: &str = "GovernorConfig";

/// Top-level governor configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfigManifest {
    /// API version (must be "prism-governor/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "GovernorConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: GovernorConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfigSpec {
    #[serde(default)]
    pub evaluators: EvaluatorsConfig,

    #[serde(default)]
    pub weights: WeightsConfig,

    #[serde(default)]
    pub adaptation: AdaptationConfig,

    /// Ordered contextual rules; omitted means the built-in rule set.
    #[serde(default = "default_rules")]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub causal: CausalConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluatorsConfig {
    /// Catalog ids to load, in order. Empty loads the whole catalog.
    #[serde(default)]
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightsConfig {
    /// Initial weights, normalized on load. Empty means equal shares over the
    /// loaded evaluators.
    #[serde(default)]
    pub initial: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationConfig {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Per-key probability of an exploration perturbation.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    #[serde(default = "default_exploration_span")]
    pub exploration_span: f64,

    #[serde(default = "default_jitter_span")]
    pub jitter_span: f64,

    /// Run `explore()` on every evaluation before aggregating.
    #[serde(default)]
    pub explore_each_run: bool,

    /// Fixed RNG seed for reproducible adaptation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalConfig {
    #[serde(default = "default_outcome_variable")]
    pub outcome_variable: String,

    /// Variable → ordered state names. An empty list means `["low", "high"]`.
    #[serde(default)]
    pub variables: BTreeMap<String, Vec<String>>,

    /// `[parent, child]` pairs.
    #[serde(default)]
    pub edges: Vec<[String; 2]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// JSON Lines decision history. Unset keeps history in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_path: Option<PathBuf>,

    /// Installed CPD set. Unset keeps the model in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causal_model_path: Option<PathBuf>,
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_epsilon() -> f64 {
    0.1
}

fn default_exploration_span() -> f64 {
    0.01
}

fn default_jitter_span() -> f64 {
    0.001
}

fn default_outcome_variable() -> String {
    "final_score".to_string()
}

/// States used for a variable declared without an explicit state list.
pub fn default_states() -> Vec<String> {
    vec!["low".to_string(), "high".to_string()]
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            epsilon: default_epsilon(),
            exploration_span: default_exploration_span(),
            jitter_span: default_jitter_span(),
            explore_each_run: false,
            seed: None,
        }
    }
}

impl Default for CausalConfig {
    fn default() -> Self {
        Self {
            outcome_variable: default_outcome_variable(),
            variables: BTreeMap::new(),
            edges: vec![],
        }
    }
}

impl Default for GovernorConfigSpec {
    fn default() -> Self {
        Self {
            evaluators: EvaluatorsConfig::default(),
            weights: WeightsConfig::default(),
            adaptation: AdaptationConfig::default(),
            rules: default_rules(),
            causal: CausalConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl Default for GovernorConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "prism-governor".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: GovernorConfigSpec::default(),
        }
    }
}

impl CausalConfig {
    /// Declared states for `name`, falling back to the default binary states.
    fn states_of(&self, name: &str) -> Vec<String> {
        match self.variables.get(name) {
            Some(states) if !states.is_empty() => states.clone(),
            _ => default_states(),
        }
    }

    /// Build the causal DAG. The outcome variable is always present.
    pub fn build_graph(&self) -> anyhow::Result<CausalGraph> {
        let mut graph = CausalGraph::new();
        for name in self.variables.keys() {
            graph.add_variable(name.clone(), self.states_of(name))?;
        }
        if !graph.contains(&self.outcome_variable) {
            graph.add_variable(self.outcome_variable.clone(), default_states())?;
        }
        for [parent, child] in &self.edges {
            graph.add_edge(parent, child)?;
        }
        Ok(graph)
    }
}

impl GovernorConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. PRISM_GOVERNOR_CONFIG_PATH environment variable
    /// 2. ./prism-governor.yaml (working directory)
    /// 3. ~/.prism-governor/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("PRISM_GOVERNOR_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./prism-governor.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".prism-governor").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        let mut config = if let Some(path) = explicit_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PRISM_GOVERNOR_LEARNING_RATE") {
            match val.parse::<f64>() {
                Ok(rate) => {
                    tracing::info!("Environment override: PRISM_GOVERNOR_LEARNING_RATE={}", rate);
                    self.spec.adaptation.learning_rate = rate;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for PRISM_GOVERNOR_LEARNING_RATE: '{}'. Expected a number. Ignoring.",
                    val
                ),
            }
        }

        if let Ok(val) = std::env::var("PRISM_GOVERNOR_EPSILON") {
            match val.parse::<f64>() {
                Ok(epsilon) => {
                    tracing::info!("Environment override: PRISM_GOVERNOR_EPSILON={}", epsilon);
                    self.spec.adaptation.epsilon = epsilon;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for PRISM_GOVERNOR_EPSILON: '{}'. Expected a number. Ignoring.",
                    val
                ),
            }
        }

        if let Ok(val) = std::env::var("PRISM_GOVERNOR_HISTORY_PATH") {
            if !val.is_empty() {
                tracing::info!("Environment override: PRISM_GOVERNOR_HISTORY_PATH={}", val);
                self.spec.persistence.history_path = Some(PathBuf::from(val));
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let adaptation = &self.spec.adaptation;
        for (name, value) in [
            ("learning_rate", adaptation.learning_rate),
            ("epsilon", adaptation.epsilon),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("spec.adaptation.{} must be within [0, 1], got {}", name, value);
            }
        }
        for (name, value) in [
            ("exploration_span", adaptation.exploration_span),
            ("jitter_span", adaptation.jitter_span),
        ] {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("spec.adaptation.{} must be non-negative, got {}", name, value);
            }
        }

        for (id, weight) in &self.spec.weights.initial {
            if !weight.is_finite() || *weight < 0.0 {
                anyhow::bail!("spec.weights.initial.{} must be non-negative, got {}", id, weight);
            }
        }

        let causal = &self.spec.causal;
        if !causal.variables.is_empty() && !causal.variables.contains_key(&causal.outcome_variable) {
            anyhow::bail!(
                "Outcome variable '{}' is not declared in spec.causal.variables",
                causal.outcome_variable
            );
        }
        causal
            .build_graph()
            .map_err(|e| anyhow::anyhow!("Invalid spec.causal: {}", e))?;

        Ok(())
    }
}
