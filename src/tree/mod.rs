//! The `SchemaTree` aggregate: dictionary, root, and the arena-backed prefix
//! tree

pub mod node;

use rand::Rng;

pub use node::{NodeId, TreeNodeData};
use node::NodeArena;

use crate::dictionary::{Pid, PropertyDictionary};

/// Aggregate root: the property dictionary, the sentinel root node, and the
/// arena-backed tree built on top of it.
pub struct SchemaTree {
    dict: PropertyDictionary,
    arena: NodeArena,
    root: NodeId,
    root_pid: Pid,
    min_sup: u32,
    typed: bool,
}

impl SchemaTree {
    /// Creates an empty tree. `min_sup` is retained for on-disk compatibility
    /// with the original format but is not enforced by this core.
    pub fn new(min_sup: u32, typed: bool) -> Self {
        let dict = PropertyDictionary::new();
        let tag: u64 = rand::rng().random();
        let root_pid = dict.get_or_create(&format!("root{tag:016x}"), false);
        dict.record(root_pid).set_sort_order(u32::MAX);
        let arena = NodeArena::new();
        let root = arena.push(root_pid, None);
        dict.link_traversal_head(root_pid, root.raw());

        SchemaTree {
            dict,
            arena,
            root,
            root_pid,
            min_sup,
            typed,
        }
    }

    pub fn dictionary(&self) -> &PropertyDictionary {
        &self.dict
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_pid(&self) -> Pid {
        self.root_pid
    }

    pub fn min_sup(&self) -> u32 {
        self.min_sup
    }

    pub fn typed(&self) -> bool {
        self.typed
    }

    pub fn node(&self, id: NodeId) -> &TreeNodeData {
        self.arena.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Root's support: the number of transactions inserted.
    pub fn support(&self) -> u32 {
        self.node(self.root).support()
    }

    /// Inserts one transaction's already-deduplicated PID set. `pid_set` is
    /// sorted ascending by `SortOrder` (most frequent first) and the path
    /// `root → child(L[0]) → child(L[1]) → …` is created as needed,
    /// incrementing `Support` on every visited node including the root.
    pub fn insert(&self, pid_set: &[Pid]) {
        let mut sorted: Vec<Pid> = pid_set.to_vec();
        sorted.sort_by_key(|&pid| self.dict.record(pid).sort_order());
        sorted.dedup();

        let mut cur = self.root;
        self.node(cur).increment_support();
        for &pid in &sorted {
            let (child, created) = self.arena.get_or_create_child(cur, pid);
            if created {
                let previous_head = self.dict.link_traversal_head(pid, child.raw());
                self.node(child).set_next_same_id(previous_head.map(NodeId::new));
            }
            self.node(child).increment_support();
            cur = child;
        }
    }

    /// Rebuilds a tree shell from a deserialized dictionary, with only the
    /// root node created (support not yet set) — used solely by
    /// [`crate::serialize::load`], which then replays the pre-order child
    /// stream through [`Self::insert_decoded_child`].
    pub(crate) fn from_decoded_dictionary(
        dict: PropertyDictionary,
        root_pid: Pid,
        min_sup: u32,
        typed: bool,
    ) -> Self {
        let arena = NodeArena::new();
        let root = arena.push(root_pid, None);
        dict.link_traversal_head(root_pid, root.raw());
        SchemaTree {
            dict,
            arena,
            root,
            root_pid,
            min_sup,
            typed,
        }
    }

    pub(crate) fn set_node_support(&self, node: NodeId, support: u32) {
        self.node(node).set_support(support);
    }

    /// Appends a freshly-decoded child under `parent` with the given PID and
    /// support, linking it into that PID's traversal chain.
    pub(crate) fn insert_decoded_child(&self, parent: NodeId, pid: Pid, support: u32) -> NodeId {
        let child = self.arena.push_decoded_child(parent, pid, support);
        let previous_head = self.dict.link_traversal_head(pid, child.raw());
        self.node(child).set_next_same_id(previous_head.map(NodeId::new));
        child
    }

    /// Finalizes `SortOrder` across the whole dictionary before pass 2
    /// begins. Must not be called again afterward — tree
    /// ordering depends on sort orders being stable from this point on.
    pub fn finalize_sort_order(&self) {
        self.dict.finalize_sort_order(self.root_pid);
    }

    /// Walks from `node` toward the root testing a prefix-contains
    /// predicate against `query` (sorted ascending `SortOrder`, i.e. the
    /// rarest element last). Returns `true` iff every member of `query` is
    /// found among `node` and its (strict) ancestors.
    pub(crate) fn prefix_contains(&self, node: NodeId, query: &[Pid]) -> bool {
        let mut k = query.len();
        if k == 0 {
            return true;
        }
        k -= 1;
        let mut cur = Some(node);
        while let Some(id) = cur {
            // The root is never a candidate match (its PID is never a
            // member of a query); stop before testing it, mirroring the
            // original's `for cur := node; cur.parent != nil; ...`.
            if id == self.root {
                break;
            }
            let data = self.node(id);
            let sort_order = self.dict.record(data.pid()).sort_order();
            let expected_order = self.dict.record(query[k]).sort_order();
            if sort_order < expected_order {
                return false;
            }
            if data.pid() == query[k] {
                if k == 0 {
                    return true;
                }
                k -= 1;
            }
            cur = data.parent();
        }
        false
    }

    /// All strict ancestors of `node`, nearest first, excluding the root.
    pub(crate) fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.node(node).parent();
        while let Some(id) = cur {
            if id == self.root {
                break;
            }
            out.push(id);
            cur = self.node(id).parent();
        }
        out
    }

    /// All descendants of `node` (every depth), in no particular order.
    pub(crate) fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.node(node).children();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_names(tree: &SchemaTree, names: &[&str]) {
        let pids: Vec<Pid> = names
            .iter()
            .map(|n| tree.dictionary().get_or_create(n, false))
            .collect();
        for &pid in &pids {
            tree.dictionary().increment(pid);
        }
        tree.insert(&pids);
    }

    #[test]
    fn root_support_equals_transactions_inserted() {
        let tree = SchemaTree::new(1, false);
        for names in [&["a", "b"][..], &["a"][..], &["b", "c"][..]] {
            insert_names(&tree, names);
        }
        tree.finalize_sort_order();
        assert_eq!(tree.support(), 3);
    }

    #[test]
    fn sort_order_strictly_increases_root_to_leaf() {
        let tree = SchemaTree::new(1, false);
        let pa = tree.dictionary().get_or_create("a", false);
        let pb = tree.dictionary().get_or_create("b", false);
        let pc = tree.dictionary().get_or_create("c", false);
        for _ in 0..5 {
            tree.dictionary().increment(pa);
        }
        for _ in 0..7 {
            tree.dictionary().increment(pb);
        }
        for _ in 0..2 {
            tree.dictionary().increment(pc);
        }
        tree.finalize_sort_order();
        tree.insert(&[pa, pb, pc]);

        let mut cur = tree.root();
        let mut last_order = u32::MAX;
        loop {
            let children = tree.node(cur).children();
            if children.is_empty() {
                break;
            }
            assert_eq!(children.len(), 1);
            cur = children[0];
            let order = tree.dictionary().record(tree.node(cur).pid()).sort_order();
            assert!(
                order > last_order || last_order == u32::MAX,
                "expected sort order to increase root-to-leaf"
            );
            last_order = order;
        }
    }

    #[test]
    fn children_support_sum_never_exceeds_parent() {
        let tree = SchemaTree::new(1, false);
        insert_names(&tree, &["a", "b", "c"]);
        insert_names(&tree, &["a", "b"]);
        insert_names(&tree, &["a", "d"]);
        tree.finalize_sort_order();

        fn check(tree: &SchemaTree, node: NodeId) {
            let children = tree.node(node).children();
            let sum: u32 = children.iter().map(|&c| tree.node(c).support()).sum();
            assert!(sum <= tree.node(node).support());
            for c in children {
                check(tree, c);
            }
        }
        check(&tree, tree.root());
    }

    #[test]
    fn traversal_chain_enumerates_exactly_the_nodes_with_that_pid() {
        let tree = SchemaTree::new(1, false);
        insert_names(&tree, &["a", "b"]);
        insert_names(&tree, &["a", "c"]);
        insert_names(&tree, &["b", "a"]);
        tree.finalize_sort_order();

        let pa = tree.dictionary().get("a").unwrap();
        let mut chain_nodes = Vec::new();
        let mut cur = tree.dictionary().record(pa).traversal_head();
        while let Some(raw) = cur {
            let id = NodeId::new(raw);
            chain_nodes.push(id);
            cur = tree.node(id).next_same_id().map(NodeId::raw);
        }

        let mut all_a_nodes = Vec::new();
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            if tree.node(id).pid() == pa {
                all_a_nodes.push(id);
            }
            stack.extend(tree.node(id).children());
        }

        chain_nodes.sort_by_key(|n| n.index());
        all_a_nodes.sort_by_key(|n| n.index());
        assert_eq!(chain_nodes, all_a_nodes);
    }
}
