//! The property dictionary: name interning with frequency and sort order.
//!
//! Grounded on the 97-stripe lock arrays in `schemaNode.go`
//! (`lockPrime = 97`) and on the fixed-size shard table in
//! `cht::Cht<V, ROOT_SIZE, STRIDES_PER_BUCKET>`, built with
//! `std::array::from_fn` the same way.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};

use crossbeam_utils::CachePadded;

/// Number of shards backing the name→PID map and the traversal-chain stripe
/// locks. Matches `schemaNode.go`'s `lockPrime`.
const SHARDS: usize = 97;

/// Sentinel value for "no node yet" in a traversal head, and for "no PID"
/// generally. `u32::MAX` is reserved and never assigned to a real [`Pid`].
const NONE: u32 = u32::MAX;

/// An interned property identifier: an index into a [`PropertyDictionary`]'s
/// backing record vector. Cheap to copy, comparable by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(u32);

impl Pid {
    /// Sentinel meaning "no PID" — used only for the root's own encoding and
    /// for absent traversal heads, never returned from dictionary lookups.
    pub const NONE: Pid = Pid(NONE);

    pub(crate) fn new(index: u32) -> Self {
        Pid(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_none(self) -> bool {
        self.0 == NONE
    }
}

/// A single interned property: its name, running totals, and the head of its
/// traversal chain through the tree.
#[derive(Debug)]
pub struct PropertyRecord {
    name: Box<str>,
    is_type: bool,
    total_count: AtomicU32,
    sort_order: AtomicU32,
    /// NodeId of the head of this PID's traversal chain, or `NONE`.
    traversal_head: AtomicU32,
}

impl PropertyRecord {
    fn new(name: Box<str>, is_type: bool, sort_order: u32) -> Self {
        PropertyRecord {
            name,
            is_type,
            total_count: AtomicU32::new(0),
            sort_order: AtomicU32::new(sort_order),
            traversal_head: AtomicU32::new(NONE),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type tokens are distinguished by a fixed `t#` prefix (set at
    /// creation), matching `IItem.IsProp()`/`IsType()`.
    pub fn is_type(&self) -> bool {
        self.is_type
    }

    pub fn is_prop(&self) -> bool {
        !self.is_type
    }

    pub fn total_count(&self) -> u32 {
        self.total_count.load(Ordering::Relaxed)
    }

    pub fn sort_order(&self) -> u32 {
        self.sort_order.load(Ordering::Relaxed)
    }

    pub(crate) fn set_sort_order(&self, order: u32) {
        self.sort_order.store(order, Ordering::Relaxed);
    }

    /// Used only by the deserializer, which reads `TotalCount` directly off
    /// the wire instead of replaying every increment.
    pub(crate) fn set_total_count(&self, value: u32) {
        self.total_count.store(value, Ordering::Relaxed);
    }

    pub(crate) fn traversal_head(&self) -> Option<u32> {
        let head = self.traversal_head.load(Ordering::Acquire);
        (head != NONE).then_some(head)
    }

    pub(crate) fn set_traversal_head(&self, node_id: u32) {
        self.traversal_head.store(node_id, Ordering::Release);
    }
}

/// Name→PID interner plus the backing record storage. Shards the name map
/// into a fixed number of `RwLock<HashMap<...>>` stripes rather than pulling
/// in a concurrent-map crate — `dashmap` is not an active dependency here.
pub struct PropertyDictionary {
    shards: [CachePadded<RwLock<HashMap<Box<str>, Pid>>>; SHARDS],
    records: RwLock<Vec<Box<PropertyRecord>>>,
    /// Stripe locks serializing traversal-chain head updates per PID:
    /// updates to a traversal chain take a stripe lock keyed on the PID.
    pid_stripes: [CachePadded<Mutex<()>>; SHARDS],
}

impl Default for PropertyDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyDictionary {
    pub fn new() -> Self {
        PropertyDictionary {
            shards: std::array::from_fn(|_| CachePadded::new(RwLock::new(HashMap::new()))),
            records: RwLock::new(Vec::new()),
            pid_stripes: std::array::from_fn(|_| CachePadded::new(Mutex::new(()))),
        }
    }

    fn shard_for(&self, name: &str) -> &RwLock<HashMap<Box<str>, Pid>> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::hash::Hash::hash(&name, &mut hasher);
        let idx = (std::hash::Hasher::finish(&hasher) as usize) % SHARDS;
        &self.shards[idx]
    }

    /// Returns the existing PID for `name`, or interns a fresh one with
    /// `TotalCount = 0` and `SortOrder = dict.size()` at the time of
    /// insertion (later overwritten by the builder's sort step). Two
    /// concurrent calls for the same name are guaranteed to return the same
    /// PID.
    pub fn get_or_create(&self, name: &str, is_type: bool) -> Pid {
        let shard = self.shard_for(name);
        if let Some(&pid) = shard.read().unwrap().get(name) {
            return pid;
        }
        let mut shard = shard.write().unwrap();
        if let Some(&pid) = shard.get(name) {
            return pid;
        }
        let mut records = self.records.write().unwrap();
        let pid = Pid::new(records.len() as u32);
        records.push(Box::new(PropertyRecord::new(
            name.into(),
            is_type,
            pid.0,
        )));
        shard.insert(name.into(), pid);
        pid
    }

    /// Non-mutating look-up; returns `None` if `name` was never interned.
    pub fn get(&self, name: &str) -> Option<Pid> {
        self.shard_for(name).read().unwrap().get(name).copied()
    }

    /// Atomically adds 1 to `pid`'s total count.
    pub fn increment(&self, pid: Pid) {
        self.record(pid).total_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, pid: Pid) -> &PropertyRecord {
        // SAFETY: `records` is append-only for the life of the dictionary, so
        // a `Box<PropertyRecord>` handed out once never moves; the borrow
        // below outlives the read guard by construction of the boxed
        // indirection, matching the `OnceBox` leaked-pointer idiom used
        // elsewhere in this tree.
        let records = self.records.read().unwrap();
        let ptr: *const PropertyRecord = &**records.get(pid.index()).expect("valid Pid");
        unsafe { &*ptr }
    }

    /// Number of interned PIDs, including the root (if already created).
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerates all PIDs (order unspecified).
    pub fn list(&self) -> Vec<Pid> {
        (0..self.len() as u32).map(Pid::new).collect()
    }

    /// `(#non-type-props, #type-props)` excluding `root_pid`.
    pub fn counts(&self, root_pid: Pid) -> (usize, usize) {
        let records = self.records.read().unwrap();
        let mut props = 0;
        let mut types = 0;
        for (i, rec) in records.iter().enumerate() {
            if i as u32 == root_pid.0 {
                continue;
            }
            if rec.is_type {
                types += 1;
            } else {
                props += 1;
            }
        }
        (props, types)
    }

    /// Re-assigns every non-root PID's `SortOrder` to a permutation of
    /// `[0, N)`, ordered by descending `TotalCount` with a lexicographic
    /// tie-break on name. `root_pid` keeps
    /// `u32::MAX`.
    pub(crate) fn finalize_sort_order(&self, root_pid: Pid) {
        let records = self.records.read().unwrap();
        let mut indices: Vec<u32> = (0..records.len() as u32)
            .filter(|&i| i != root_pid.0)
            .collect();
        indices.sort_by(|&a, &b| {
            let ra = &records[a as usize];
            let rb = &records[b as usize];
            rb.total_count()
                .cmp(&ra.total_count())
                .then_with(|| ra.name.cmp(&rb.name))
        });
        for (order, idx) in indices.into_iter().enumerate() {
            records[idx as usize].set_sort_order(order as u32);
        }
    }

    /// Takes the PID's traversal-chain stripe lock and prepends `node_id` to
    /// the head of `pid`'s traversal chain, returning the previous head (the
    /// new node's `nextSameID`).
    pub(crate) fn link_traversal_head(&self, pid: Pid, node_id: u32) -> Option<u32> {
        let stripe = &self.pid_stripes[pid.index() % SHARDS];
        let _guard = stripe.lock().unwrap();
        let record = self.record(pid);
        let previous = record.traversal_head();
        record.set_traversal_head(node_id);
        previous
    }
}
