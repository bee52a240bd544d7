//! Pure wire-shape types for the HTTP embedding collaborator.
//! No HTTP framework is pulled in — only the JSON shapes themselves, plus
//! the two small translations between them and this crate's own `Pid`/
//! `Recommendations` types, grounded on `server/server.go`'s
//! `RecommenderRequest`/`RecommenderResponse`/`RecommendationOutputEntry`
//! and `setupLeanRecommender`'s request handling (minus its `hardLimit`
//! truncation, which belongs to that out-of-scope transport layer).

use serde::{Deserialize, Serialize};

use crate::builder::TYPE_PREFIX;
use crate::dictionary::Pid;
use crate::recommend::Recommendations;
use crate::tree::SchemaTree;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommenderRequest {
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationOutputEntry {
    pub property: String,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderResponse {
    pub recommendations: Vec<RecommendationOutputEntry>,
}

/// Resolves a request's property and type names to PIDs, prefixing each
/// type string with `t#` before lookup and silently dropping any name the
/// dictionary has never seen.
pub fn resolve_query(tree: &SchemaTree, request: &RecommenderRequest) -> Vec<Pid> {
    let properties = request.properties.iter().filter_map(|name| tree.dictionary().get(name));
    let types = request
        .types
        .iter()
        .filter_map(|name| tree.dictionary().get(&format!("{TYPE_PREFIX}{name}")));
    properties.chain(types).collect()
}

/// Renders a ranked result as the wire response shape, ordered by
/// descending probability (the order [`crate::recommend::recommend`]
/// already produces).
pub fn to_response(tree: &SchemaTree, recommendations: &Recommendations) -> RecommenderResponse {
    RecommenderResponse {
        recommendations: recommendations
            .iter()
            .map(|r| RecommendationOutputEntry {
                property: tree.dictionary().record(r.pid).name().to_string(),
                probability: r.probability,
            })
            .collect(),
    }
}
