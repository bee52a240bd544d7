//! Build/tree statistics, generalized from `StrideStats`/`CreatedNodes`'s
//! per-depth-level node counting idiom to the schema tree's own notion of
//! depth (number of properties on the path from the root).

use std::fmt::{self, Debug, Display};

use crate::tree::{NodeId, SchemaTree};

/// Node count at one depth level (depth 0 = the root's direct children).
#[derive(Debug, Copy, Clone)]
pub struct DepthLevelCount {
    pub depth_level: usize,
    pub count: usize,
}

/// Aggregate counts over a built [`SchemaTree`], mirroring `StrideStats`'s
/// idiom: a running per-depth-level node count plus whole-tree totals,
/// computed by a single breadth-first walk.
pub struct SchemaTreeStats {
    pub node_count: usize,
    pub transaction_count: u32,
    pub property_count: usize,
    pub type_count: usize,
    pub nodes_by_depth: Vec<DepthLevelCount>,
}

impl SchemaTreeStats {
    /// Walks `tree` breadth-first from the root, tallying node counts per
    /// depth level. `tree` must already have had its sort order finalized.
    pub fn collect(tree: &SchemaTree) -> Self {
        let (property_count, type_count) = tree.dictionary().counts(tree.root_pid());

        let mut nodes_by_depth: Vec<DepthLevelCount> = Vec::new();
        let mut frontier: Vec<NodeId> = tree.node(tree.root()).children();
        let mut depth = 0usize;
        let mut node_count = 1; // the root itself

        while !frontier.is_empty() {
            nodes_by_depth.push(DepthLevelCount {
                depth_level: depth,
                count: frontier.len(),
            });
            node_count += frontier.len();
            let mut next = Vec::new();
            for id in frontier {
                next.extend(tree.node(id).children());
            }
            frontier = next;
            depth += 1;
        }

        SchemaTreeStats {
            node_count,
            transaction_count: tree.support(),
            property_count,
            type_count,
            nodes_by_depth,
        }
    }

    /// Rough resident-memory estimate for the node arena, mirroring
    /// `StrideStats::mem_usage`'s `stride_size * total_created_nodes`.
    pub fn approx_node_bytes(&self) -> usize {
        self.node_count * std::mem::size_of::<crate::tree::TreeNodeData>()
    }
}

impl Debug for SchemaTreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} transactions, {} properties, {} types, {:?} ({}k)",
            self.node_count,
            self.transaction_count,
            self.property_count,
            self.type_count,
            self.nodes_by_depth,
            self.approx_node_bytes() / 1024
        )
    }
}

impl Display for SchemaTreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}
