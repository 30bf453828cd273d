// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Indicator Prisms
//!
//! A prism scores one ethical dimension from a fixed set of indicator fields,
//! each a number in `[0.0, 1.0]`:
//!
//! ```text
//! score = mean(v_i)   over present indicators, with v_i ← 1 − v_i for negative polarity
//! ```
//!
//! A missing required indicator is [`EvaluatorError::MissingInput`]; a
//! present indicator that is not a number in range is
//! [`EvaluatorError::InvalidInput`]. Every present indicator is reported back
//! as a `{value, narrative}` metric carrying the raw input value.

use governor_core::domain::evaluator::{Evaluator, EvaluatorError, EvaluatorId, EvaluatorResult, InputData};
use serde_json::{json, Value};

/// Whether a high indicator value is good or bad for the dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub field: &'static str,
    /// Human-readable subject used in the metric narrative.
    pub label: &'static str,
    pub polarity: Polarity,
    pub required: bool,
    /// Alternate input key read when `field` is absent.
    pub alias: Option<&'static str>,
}

impl Indicator {
    pub const fn required(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            polarity: Polarity::Positive,
            required: true,
            alias: None,
        }
    }

    pub const fn optional(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            polarity: Polarity::Positive,
            required: false,
            alias: None,
        }
    }

    pub const fn negative(mut self) -> Self {
        self.polarity = Polarity::Negative;
        self
    }

    pub const fn with_alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    fn contribution(&self, value: f64) -> f64 {
        match self.polarity {
            Polarity::Positive => value,
            Polarity::Negative => 1.0 - value,
        }
    }

    fn narrative(&self, value: f64) -> String {
        let direction = match self.polarity {
            Polarity::Positive => "higher is better",
            Polarity::Negative => "lower is better",
        };
        format!("{} is {:.2} ({}).", self.label, value, direction)
    }

    /// The indicator's value in `input`, if present.
    fn read(&self, input: &InputData) -> Result<Option<f64>, EvaluatorError> {
        let raw = input
            .get(self.field)
            .or_else(|| self.alias.and_then(|alias| input.get(alias)));
        let Some(raw) = raw else {
            return if self.required {
                Err(EvaluatorError::MissingInput(self.field.to_string()))
            } else {
                Ok(None)
            };
        };

        match raw.as_f64() {
            Some(value) if (0.0..=1.0).contains(&value) => Ok(Some(value)),
            Some(value) => Err(EvaluatorError::InvalidInput {
                field: self.field.to_string(),
                reason: format!("{value} is outside [0, 1]"),
            }),
            None => Err(EvaluatorError::InvalidInput {
                field: self.field.to_string(),
                reason: format!("expected a number, got {}", kind_of(raw)),
            }),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorPrism {
    id: EvaluatorId,
    indicators: Vec<Indicator>,
}

impl IndicatorPrism {
    pub fn new(id: &str, indicators: Vec<Indicator>) -> Result<Self, EvaluatorError> {
        if indicators.is_empty() {
            return Err(EvaluatorError::Construction(format!(
                "prism '{id}' declares no indicators"
            )));
        }
        Ok(Self {
            id: EvaluatorId::new(id)?,
            indicators,
        })
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }
}

impl Evaluator for IndicatorPrism {
    fn id(&self) -> &EvaluatorId {
        &self.id
    }

    fn evaluate(&self, input: &InputData) -> Result<EvaluatorResult, EvaluatorError> {
        let mut total = 0.0;
        let mut present = 0usize;
        let mut result = EvaluatorResult::new(0.0);

        for indicator in &self.indicators {
            let Some(value) = indicator.read(input)? else {
                continue;
            };
            total += indicator.contribution(value);
            present += 1;
            result = result.with_metric(
                indicator.field,
                json!({"value": value, "narrative": indicator.narrative(value)}),
            );
        }

        if present == 0 {
            let first = self.indicators.first().map(|i| i.field).unwrap_or_default();
            return Err(EvaluatorError::MissingInput(first.to_string()));
        }

        result.score = total / present as f64;
        tracing::debug!(prism = %self.id, score = result.score, indicators = present, "Prism evaluated");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prism() -> IndicatorPrism {
        IndicatorPrism::new(
            "test_prism",
            vec![
                Indicator::required("benefit", "Benefit"),
                Indicator::optional("harm", "Harm").negative(),
            ],
        )
        .unwrap()
    }

    fn input(value: Value) -> InputData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_mean_with_inverted_negative_indicator() {
        let result = prism().evaluate(&input(json!({"benefit": 0.8, "harm": 0.4}))).unwrap();
        // (0.8 + (1 - 0.4)) / 2
        assert!((result.score - 0.7).abs() < 1e-12);
        assert_eq!(result.metrics["harm"]["value"], json!(0.4));
        assert!(result.metrics["harm"]["narrative"]
            .as_str()
            .unwrap()
            .contains("lower is better"));
    }

    #[test]
    fn test_optional_indicator_may_be_absent() {
        let result = prism().evaluate(&input(json!({"benefit": 0.3}))).unwrap();
        assert_eq!(result.score, 0.3);
        assert!(!result.metrics.contains_key("harm"));
    }

    #[test]
    fn test_missing_required_indicator() {
        let err = prism().evaluate(&input(json!({"harm": 0.1}))).unwrap_err();
        assert_eq!(err, EvaluatorError::MissingInput("benefit".to_string()));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let out_of_range = prism().evaluate(&input(json!({"benefit": 1.5}))).unwrap_err();
        assert!(matches!(out_of_range, EvaluatorError::InvalidInput { ref field, .. } if field == "benefit"));

        let text = prism()
            .evaluate(&input(json!({"benefit": 0.5, "harm": "high"})))
            .unwrap_err();
        assert!(matches!(text, EvaluatorError::InvalidInput { ref reason, .. } if reason.contains("string")));
    }

    #[test]
    fn test_alias_read_when_field_absent() {
        let prism = IndicatorPrism::new(
            "aliased",
            vec![Indicator::required("ethics", "Ethics").with_alias("Ethics_Score")],
        )
        .unwrap();

        let result = prism.evaluate(&input(json!({"Ethics_Score": 0.6}))).unwrap();
        assert_eq!(result.score, 0.6);
        assert_eq!(result.metrics["ethics"]["value"], json!(0.6));

        let both = prism
            .evaluate(&input(json!({"ethics": 0.2, "Ethics_Score": 0.6})))
            .unwrap();
        assert_eq!(both.score, 0.2);
    }

    #[test]
    fn test_prism_without_indicators_cannot_be_built() {
        assert!(matches!(
            IndicatorPrism::new("empty", vec![]),
            Err(EvaluatorError::Construction(_))
        ));
        assert!(matches!(
            IndicatorPrism::new("Bad Id", vec![Indicator::required("x", "X")]),
            Err(EvaluatorError::InvalidId(_))
        ));
    }
}
