//! Arena-allocated tree nodes.
//!
//! The append-only, individually-boxed arena with lock-free reads after
//! insertion mirrors `cht::oncebox::OnceBox`/`OnceBoxSlice`'s leaked-pointer
//! pattern: once a node is pushed it never moves, so handing out a raw
//! pointer to its boxed storage is sound for the arena's lifetime.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use crate::dictionary::Pid;

const NONE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: u32) -> Self {
        NodeId(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }
}

/// One tree node: its PID, parent link, ordered children, the PID's own
/// next-same-id link, and a support count.
#[derive(Debug)]
pub struct TreeNodeData {
    pid: Pid,
    parent: Option<NodeId>,
    /// Kept sorted by `Pid` index, a stable total order on PID identity that
    /// holds for the life of the process, chosen for reproducibility over an
    /// insertion-order tiebreak.
    children: RwLock<Vec<(Pid, NodeId)>>,
    next_same_id: AtomicU32,
    support: AtomicU32,
}

impl TreeNodeData {
    fn new(pid: Pid, parent: Option<NodeId>) -> Self {
        TreeNodeData {
            pid,
            parent,
            children: RwLock::new(Vec::new()),
            next_same_id: AtomicU32::new(NONE),
            support: AtomicU32::new(0),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn support(&self) -> u32 {
        self.support.load(Ordering::Relaxed)
    }

    pub(crate) fn increment_support(&self) {
        self.support.fetch_add(1, Ordering::Relaxed);
    }

    /// Used only by the deserializer, which reads a node's support directly
    /// off the wire instead of rebuilding it one `insert` at a time.
    pub(crate) fn set_support(&self, value: u32) {
        self.support.store(value, Ordering::Relaxed);
    }

    pub fn children(&self) -> Vec<NodeId> {
        self.children.read().unwrap().iter().map(|&(_, n)| n).collect()
    }

    pub(crate) fn next_same_id(&self) -> Option<NodeId> {
        let next = self.next_same_id.load(Ordering::Acquire);
        (next != NONE).then(|| NodeId::new(next))
    }

    pub(crate) fn set_next_same_id(&self, next: Option<NodeId>) {
        self.next_same_id
            .store(next.map_or(NONE, NodeId::raw), Ordering::Release);
    }

    fn find_child(&self, pid: Pid) -> Option<NodeId> {
        let children = self.children.read().unwrap();
        children
            .binary_search_by_key(&pid, |&(p, _)| p)
            .ok()
            .map(|i| children[i].1)
    }

}

/// Append-only node storage. `push` takes a brief write lock; `get` never
/// blocks on it once a node exists, since each element is an individually
/// boxed, never-moved allocation.
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    slots: RwLock<Vec<Box<TreeNodeData>>>,
}

impl NodeArena {
    pub(crate) fn new() -> Self {
        NodeArena {
            slots: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, pid: Pid, parent: Option<NodeId>) -> NodeId {
        let mut slots = self.slots.write().unwrap();
        let id = NodeId::new(slots.len() as u32);
        slots.push(Box::new(TreeNodeData::new(pid, parent)));
        id
    }

    pub(crate) fn get(&self, id: NodeId) -> &TreeNodeData {
        let slots = self.slots.read().unwrap();
        let ptr: *const TreeNodeData = &**slots.get(id.index()).expect("valid NodeId");
        // SAFETY: see module doc comment — the arena never moves or drops
        // an entry once pushed, so this reference remains valid as long as
        // `self` does.
        unsafe { &*ptr }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.read().unwrap().len()
    }

    /// Finds `pid`'s child under `parent`, creating it if absent. Returns
    /// the child's `NodeId` and whether it was freshly created.
    pub(crate) fn get_or_create_child(&self, parent: NodeId, pid: Pid) -> (NodeId, bool) {
        let parent_data = self.get(parent);
        if let Some(existing) = parent_data.find_child(pid) {
            return (existing, false);
        }
        // Double-check under the (implicit) write path: `insert_child` holds
        // the write lock for the whole check-then-insert, so a concurrent
        // creator either wins the race and we're about to no-op, or we do.
        let candidate = self.push(pid, Some(parent));
        let mut children = parent_data.children.write().unwrap();
        match children.binary_search_by_key(&pid, |&(p, _)| p) {
            Ok(i) => (children[i].1, false),
            Err(idx) => {
                children.insert(idx, (pid, candidate));
                (candidate, true)
            }
        }
    }

    /// Appends a single freshly-decoded child with a known `pid`/`support`,
    /// used only while rebuilding a tree from its serialized pre-order
    /// stream, where each child is seen exactly once and in no
    /// particular relation to its eventual sibling order.
    pub(crate) fn push_decoded_child(&self, parent: NodeId, pid: Pid, support: u32) -> NodeId {
        let id = self.push(pid, Some(parent));
        self.get(id).set_support(support);
        let parent_data = self.get(parent);
        let mut children = parent_data.children.write().unwrap();
        let idx = children
            .binary_search_by_key(&pid, |&(p, _)| p)
            .unwrap_or_else(|idx| idx);
        children.insert(idx, (pid, id));
        id
    }
}
