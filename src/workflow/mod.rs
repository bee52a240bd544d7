//! Layered fallback strategy: a priority-ordered list of (condition, backoff
//! procedure) pairs, each condition tested against one fixed direct
//! recommendation. The first one whose condition fires runs its procedure
//! and that result is returned immediately — later layers are never
//! consulted. Grounded on `configuration/reader.go`'s `ConfigToWorkflow`
//! (`workflow.Push(cond, back, name)`), `strategy/condition_test.go`'s
//! condition constructors, and `instance.go`'s cached-`Instance` pattern of
//! checking every condition against one fixed result rather than an
//! evolving one — no `strategy.go` source itself is present in the
//! retrieval pack, so the `Workflow`/`Condition`/`Procedure` shapes are
//! reconstructed from their call sites rather than copied from a body.

pub mod backoff;
pub mod merge;

use crate::dictionary::Pid;
use crate::recommend::{recommend, top10_avg_probability, Recommendations};
use crate::tree::SchemaTree;

/// Decides whether a layer's backoff procedure should replace the current
/// recommendation result.
pub type Condition = Box<dyn Fn(&[Pid], &Recommendations) -> bool + Send + Sync>;

/// Produces a (possibly better) recommendation result for `query`.
pub type Procedure = Box<dyn Fn(&SchemaTree, &[Pid], bool) -> Recommendations + Send + Sync>;

/// Never fires — excluded deliberately: `TooManyRecommendationsCondition`
/// additionally triggered a *truncating* backoff this crate deliberately
/// doesn't carry (see `DESIGN.md`).
pub fn always() -> Condition {
    Box::new(|_query, _current| true)
}

/// Fires once the query has at least `threshold` properties.
pub fn above_threshold(threshold: usize) -> Condition {
    Box::new(move |query, _current| query.len() >= threshold)
}

/// Fires while the current recommendation list has fewer than `threshold`
/// entries.
pub fn too_few_recommendations(threshold: usize) -> Condition {
    Box::new(move |_query, current| current.len() < threshold)
}

/// Fires while the top-10 average recommendation probability is below
/// `threshold`.
pub fn too_unlikely_recommendations(threshold: f64) -> Condition {
    Box::new(move |_query, current| top10_avg_probability(current) < threshold)
}

/// The unconditional direct recommendation, with no backoff at all — used as
/// a layer's procedure when only its condition is interesting (e.g. the
/// first layer in a chain).
pub fn direct() -> Procedure {
    Box::new(|tree, query, include_types| recommend(tree, query, include_types))
}

/// Wraps [`backoff::split_property`] as a layer procedure.
pub fn split_property_procedure(
    splitter: backoff::SplitterFn,
    merger: backoff::MergerFn,
) -> Procedure {
    Box::new(move |tree, query, include_types| {
        backoff::split_property(tree, query, include_types, splitter, merger)
    })
}

/// Wraps [`backoff::delete_low_frequency`] as a layer procedure, gated by
/// [`backoff::more_than_internal`] over the remaining query's aggregate
/// support.
pub fn delete_low_frequency_procedure(
    parallel_executions: usize,
    stepsize: backoff::StepsizeFn,
    threshold: u64,
) -> Procedure {
    Box::new(move |tree, query, include_types| {
        backoff::delete_low_frequency(
            tree,
            query,
            include_types,
            parallel_executions,
            stepsize,
            backoff::more_than_internal(threshold),
        )
    })
}

struct Layer {
    condition: Condition,
    procedure: Procedure,
    name: String,
}

/// An ordered chain of fallback layers, each tested against one fixed direct
/// recommendation result. The first layer whose condition fires runs its
/// procedure and its output is returned immediately; if none fire, an empty
/// list is returned.
#[derive(Default)]
pub struct Workflow {
    layers: Vec<Layer>,
}

impl Workflow {
    pub fn new() -> Self {
        Workflow { layers: Vec::new() }
    }

    pub fn push(&mut self, condition: Condition, procedure: Procedure, name: impl Into<String>) {
        self.layers.push(Layer {
            condition,
            procedure,
            name: name.into(),
        });
    }

    /// Computes the direct recommendation once, then walks the layers in
    /// push order. The first layer whose condition matches the direct
    /// result runs its procedure and that result is returned immediately —
    /// later layers are not consulted. Returns an empty list if no layer's
    /// condition ever fires.
    pub fn recommend(&self, tree: &SchemaTree, query: &[Pid], include_types: bool) -> Recommendations {
        let direct_result = recommend(tree, query, include_types);
        for layer in &self.layers {
            if (layer.condition)(query, &direct_result) {
                log::debug!("workflow layer '{}' triggered", layer.name);
                return (layer.procedure)(tree, query, include_types);
            }
        }
        Recommendations::new()
    }
}
