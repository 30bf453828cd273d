// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Contextual Weight Rules
//!
//! A single forward-chaining pass over an ordered list of declarative rules.
//! Each rule is a conjunction of threshold conditions over named fields of a
//! [`ContextFact`]; when it holds it produces one [`WeightDelta`] for the
//! weight adaptation manager.
//!
//! - Every holding rule fires exactly once per run, in declaration order.
//! - Deltas produced by one rule never feed back into another rule's conditions.
//! - A rule whose condition references a missing (or wrongly typed) field is
//!   skipped with [`RuleError::MalformedFact`]; the run continues.
//!
//! Rules are plain data (`serde`), so new rules come from configuration
//! without touching the firing loop.

use crate::domain::evaluator::{EvaluatorId, InputData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// One observation in the decision context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Number(f64),
    Text(String),
}

impl FactValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(FactValue::Number),
            Value::Bool(b) => Some(FactValue::Number(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => Some(FactValue::Text(s.clone())),
            _ => None,
        }
    }
}

/// Immutable snapshot of the named observations describing one scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextFact(BTreeMap<String, FactValue>);

impl ContextFact {
    pub fn get(&self, field: &str) -> Option<&FactValue> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten a nested per-dimension input into one fact namespace.
    ///
    /// Top-level scalars keep their name. Scalars inside a dimension object
    /// are reachable both as `dimension.field` and as the bare `field`; on a
    /// bare-name collision the first dimension (in key order) wins.
    pub fn from_input(input: &InputData) -> Self {
        let mut facts = BTreeMap::new();
        let mut bare = BTreeMap::new();

        for (key, value) in input {
            match value {
                Value::Object(fields) => {
                    for (field, inner) in fields {
                        if let Some(fact) = FactValue::from_json(inner) {
                            facts.insert(format!("{key}.{field}"), fact.clone());
                            bare.entry(field.clone()).or_insert(fact);
                        }
                    }
                }
                other => {
                    if let Some(fact) = FactValue::from_json(other) {
                        facts.insert(key.clone(), fact);
                    }
                }
            }
        }

        for (field, fact) in bare {
            facts.entry(field).or_insert(fact);
        }

        Self(facts)
    }
}

impl FromIterator<(String, FactValue)> for ContextFact {
    fn from_iter<T: IntoIterator<Item = (String, FactValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

/// `field <op> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: Comparison,
    pub value: FactValue,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Comparison, value: f64) -> Self {
        Self {
            field: field.into(),
            op,
            value: FactValue::Number(value),
        }
    }

    /// Whether the condition holds for `fact`.
    ///
    /// A missing field or an ordering comparison against text is a malformed
    /// fact for this rule, not a false condition.
    pub fn holds(&self, rule: &str, fact: &ContextFact) -> Result<bool, RuleError> {
        let observed = fact.get(&self.field).ok_or_else(|| RuleError::MalformedFact {
            rule: rule.to_string(),
            field: self.field.clone(),
            reason: "field missing from context".to_string(),
        })?;

        match (observed, &self.value) {
            (FactValue::Number(lhs), FactValue::Number(rhs)) => Ok(match self.op {
                Comparison::Gt => lhs > rhs,
                Comparison::Ge => lhs >= rhs,
                Comparison::Lt => lhs < rhs,
                Comparison::Le => lhs <= rhs,
                Comparison::Eq => lhs == rhs,
                Comparison::Ne => lhs != rhs,
            }),
            (FactValue::Text(lhs), FactValue::Text(rhs)) => match self.op {
                Comparison::Eq => Ok(lhs == rhs),
                Comparison::Ne => Ok(lhs != rhs),
                op => Err(RuleError::MalformedFact {
                    rule: rule.to_string(),
                    field: self.field.clone(),
                    reason: format!("{op:?} is not defined for text values"),
                }),
            },
            _ => Err(RuleError::MalformedFact {
                rule: rule.to_string(),
                field: self.field.clone(),
                reason: "observed value type does not match condition".to_string(),
            }),
        }
    }
}

/// How a delta changes its target weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    Multiply(f64),
    Add(f64),
}

impl Adjustment {
    pub fn apply(&self, weight: f64) -> f64 {
        match self {
            Adjustment::Multiply(factor) => weight * factor,
            Adjustment::Add(amount) => weight + amount,
        }
    }
}

/// Weight change produced by a fired rule. Consumed once, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDelta {
    pub rule: String,
    pub evaluator_id: EvaluatorId,
    pub adjustment: Adjustment,
}

/// Declarative production rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    /// All conditions must hold.
    pub when: Vec<Condition>,
    pub target: EvaluatorId,
    pub adjustment: Adjustment,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuleError {
    #[error("Rule '{rule}' skipped, malformed fact at '{field}': {reason}")]
    MalformedFact {
        rule: String,
        field: String,
        reason: String,
    },
}

/// Ordered rule set with a single-pass firing algorithm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Fire every rule whose conditions hold against `fact`, in declaration order.
    pub fn run(&self, fact: &ContextFact) -> Vec<WeightDelta> {
        let mut deltas = Vec::new();

        for rule in &self.rules {
            match Self::rule_holds(rule, fact) {
                Ok(true) => {
                    tracing::debug!(rule = %rule.name, target = %rule.target, "Rule fired");
                    metrics::counter!("governor_rules_fired_total").increment(1);
                    deltas.push(WeightDelta {
                        rule: rule.name.clone(),
                        evaluator_id: rule.target.clone(),
                        adjustment: rule.adjustment,
                    });
                }
                Ok(false) => {}
                Err(e) => tracing::warn!("{}", e),
            }
        }

        deltas
    }

    fn rule_holds(rule: &Rule, fact: &ContextFact) -> Result<bool, RuleError> {
        for condition in &rule.when {
            if !condition.holds(&rule.name, fact)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Built-in contextual rules.
pub fn default_rules() -> Vec<Rule> {
    fn target(id: &str) -> EvaluatorId {
        // Literal ids below all satisfy the id pattern.
        EvaluatorId::new(id).unwrap_or_else(|_| unreachable!("built-in rule target '{id}' is valid"))
    }

    vec![
        Rule {
            name: "increase_human_centric_weight".to_string(),
            when: vec![
                Condition::new("bias_reduction", Comparison::Gt, 0.7),
                Condition::new("fairness_score", Comparison::Gt, 0.8),
            ],
            target: target("human_centric"),
            adjustment: Adjustment::Multiply(1.1),
        },
        Rule {
            name: "decrease_sentient_first_weight".to_string(),
            when: vec![Condition::new("sentient_welfare", Comparison::Lt, 0.5)],
            target: target("sentient_first"),
            adjustment: Adjustment::Multiply(0.9),
        },
        Rule {
            name: "increase_equity_focused_weight".to_string(),
            when: vec![Condition::new("equity_score", Comparison::Gt, 0.8)],
            target: target("equity_focused"),
            adjustment: Adjustment::Multiply(1.2),
        },
        Rule {
            name: "decrease_innovation_focused_weight".to_string(),
            when: vec![Condition::new("financial_risk", Comparison::Gt, 0.7)],
            target: target("innovation_focused"),
            adjustment: Adjustment::Multiply(0.8),
        },
        Rule {
            name: "increase_ecocentric_weight".to_string(),
            when: vec![Condition::new("carbon_footprint", Comparison::Lt, 0.3)],
            target: target("ecocentric"),
            adjustment: Adjustment::Multiply(1.2),
        },
    ]
}
