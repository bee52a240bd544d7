//! Declarative workflow configuration document, grounded on
//! `configuration/reader.go`'s `Layer`/`Configuration`/`ReadConfigFile`/
//! `ConfigToWorkflow`/`Configuration::Test`. Uses `serde`/`serde_json`
//! (already teacher dependencies) instead of hand-rolled JSON parsing.

use serde::{Deserialize, Serialize};

use crate::errors::{FatalError, PropertyStoreError};
use crate::workflow::{self, backoff, Condition, Procedure, Workflow};

/// One layer's configuration: which condition gates it, which backoff
/// procedure runs when it fires, and that backoff's parameters. Field names
/// match `configuration.Layer`'s JSON tags one-to-one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub condition: String,
    pub backoff: String,
    #[serde(default)]
    pub threshold: i64,
    #[serde(default)]
    pub threshold_float: f64,
    #[serde(default)]
    pub merger: Option<String>,
    #[serde(default)]
    pub splitter: Option<String>,
    #[serde(default)]
    pub stepsize: Option<String>,
    #[serde(default)]
    pub parallel_executions: i64,
}

/// A whole workflow configuration document: an ordered list of layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub testset: Option<String>,
    pub layers: Vec<LayerConfig>,
}

impl Configuration {
    pub fn from_json(text: &str) -> Result<Self, FatalError> {
        serde_json::from_str(text).map_err(|e| {
            FatalError(PropertyStoreError::ConfigurationInvalid(format!(
                "malformed configuration JSON: {e}"
            )))
        })
    }

    /// Validates the exact rules from `Configuration.Test()`:
    /// an empty layer list, a missing backoff name, `splitProperty` without
    /// both merger and splitter, or `deleteLowFrequency` without both
    /// stepsize and a positive parallelism are all rejected.
    pub fn validate(&self) -> Result<(), FatalError> {
        if self.layers.is_empty() {
            return Err(configuration_invalid("no layers specified"));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.backoff.is_empty() {
                return Err(configuration_invalid(&format!(
                    "layer {i} backoff strategy is empty"
                )));
            }
            if layer.backoff == "splitProperty"
                && (layer.merger.as_deref().unwrap_or("").is_empty()
                    || layer.splitter.as_deref().unwrap_or("").is_empty())
            {
                return Err(configuration_invalid(&format!(
                    "layer {i} needs splitter and merger"
                )));
            }
            if layer.backoff == "deleteLowFrequency"
                && (layer.stepsize.as_deref().unwrap_or("").is_empty()
                    || layer.parallel_executions == 0)
            {
                return Err(configuration_invalid(&format!(
                    "layer {i} needs stepsize function and #parallel executions"
                )));
            }
        }
        Ok(())
    }
}

fn configuration_invalid(message: &str) -> FatalError {
    FatalError(PropertyStoreError::ConfigurationInvalid(message.to_string()))
}

/// Builds a [`Workflow`] from a validated [`Configuration`], resolving each
/// layer's condition/backoff name to the matching constructor — the Rust
/// analogue of `ConfigToWorkflow`'s switch statements.
pub fn to_workflow(config: &Configuration) -> Result<Workflow, FatalError> {
    config.validate()?;

    let mut wf = Workflow::new();
    for (i, layer) in config.layers.iter().enumerate() {
        let condition = resolve_condition(layer)?;
        let procedure = resolve_backoff(layer)?;
        wf.push(condition, procedure, format!("layer {i}"));
    }
    Ok(wf)
}

fn resolve_condition(layer: &LayerConfig) -> Result<Condition, FatalError> {
    match layer.condition.as_str() {
        "aboveThreshold" => Ok(workflow::above_threshold(layer.threshold.max(0) as usize)),
        "tooUnlikelyRecommendationsCondition" => {
            Ok(workflow::too_unlikely_recommendations(layer.threshold_float))
        }
        "tooFewRecommendations" => Ok(workflow::too_few_recommendations(layer.threshold.max(0) as usize)),
        "always" | "" => Ok(workflow::always()),
        other => Err(configuration_invalid(&format!("condition not found: {other}"))),
    }
}

fn resolve_backoff(layer: &LayerConfig) -> Result<Procedure, FatalError> {
    match layer.backoff.as_str() {
        "deleteLowFrequency" => {
            let stepsize = match layer.stepsize.as_deref() {
                Some("stepsizeLinear") => backoff::stepsize_linear as backoff::StepsizeFn,
                Some("stepsizeProportional") => backoff::stepsize_proportional,
                other => {
                    return Err(configuration_invalid(&format!(
                        "stepsize not found: {other:?}"
                    )))
                }
            };
            Ok(workflow::delete_low_frequency_procedure(
                layer.parallel_executions.max(1) as usize,
                stepsize,
                layer.threshold.max(0) as u64,
            ))
        }
        "standard" => Ok(workflow::direct()),
        "splitProperty" => {
            let merger = match layer.merger.as_deref() {
                Some("max") => backoff::max_merger as backoff::MergerFn,
                Some("avg") => backoff::avg_merger,
                other => return Err(configuration_invalid(&format!("merger not found: {other:?}"))),
            };
            let splitter = match layer.splitter.as_deref() {
                Some("everySecondItem") => {
                    backoff::every_second_item_splitter as backoff::SplitterFn
                }
                Some("twoSupportRanges") => backoff::two_support_ranges_splitter,
                other => {
                    return Err(configuration_invalid(&format!("splitter not found: {other:?}")))
                }
            };
            Ok(workflow::split_property_procedure(splitter, merger))
        }
        other => Err(configuration_invalid(&format!("backoff not found: {other}"))),
    }
}
