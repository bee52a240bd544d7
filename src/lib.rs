#![allow(clippy::type_complexity)]

//! A prefix-tree ("SchemaTree") store and recommender for co-occurring
//! entity properties, built over a two-pass frequency-ordered FP-tree.

pub mod builder;
pub mod config;
pub mod dictionary;
pub mod errors;
pub mod recommend;
pub mod serialize;
pub mod stats;
pub mod transactions;
pub mod tree;
pub mod wire;
pub mod workflow;

pub use builder::{build_tree, BuildOptions};
pub use config::Configuration;
pub use dictionary::{Pid, PropertyDictionary, PropertyRecord};
pub use errors::{FatalError, PropertyStoreError};
pub use recommend::{recommend, RankedCandidate, Recommendations};
pub use serialize::{load, save};
pub use stats::SchemaTreeStats;
pub use tree::SchemaTree;
pub use workflow::Workflow;
