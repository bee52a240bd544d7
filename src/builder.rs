//! Two-pass builder: counts frequencies, finalizes sort order, then inserts
//! sorted transactions. Grounded on `building.go`'s `firstPass`/
//! `updateSortOrder`/`secondPass`, including its fixed pool of 10 workers;
//! the pool itself is a plain `std::thread::scope` + bounded `mpsc` channel
//! (no pack example shows a worker-pool idiom to imitate directly, so this
//! is this crate's own construction over `building.go`'s goroutine-plus-
//! channel shape — see `DESIGN.md`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use log::{info, warn};

use crate::errors::{FatalError, PropertyStoreError};
use crate::tree::SchemaTree;
use crate::transactions::{Transaction, TransactionSource};

const WORKER_COUNT: usize = 10;
const CHANNEL_BOUND: usize = 1024;
const PROGRESS_INTERVAL: u64 = 10_000;

/// Type-prefix applied to type tokens before interning
pub const TYPE_PREFIX: &str = "t#";

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub min_sup: u32,
    pub typed: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            min_sup: 1,
            typed: false,
        }
    }
}

/// Runs the full two-pass build over `source`, returning a fresh, immutable
/// [`SchemaTree`]. Calls `source.open()` exactly twice, per the
/// `TransactionSource` restartability contract.
pub fn build_tree(
    source: &dyn TransactionSource,
    options: BuildOptions,
) -> Result<SchemaTree, FatalError> {
    let tree = SchemaTree::new(options.min_sup, options.typed);

    first_pass(&tree, source, options.typed)?;
    tree.finalize_sort_order();
    second_pass(&tree, source, options.typed)?;

    Ok(tree)
}

fn first_pass(
    tree: &SchemaTree,
    source: &dyn TransactionSource,
    typed: bool,
) -> Result<(), FatalError> {
    let item_count = Arc::new(AtomicU64::new(0));
    run_workers(source, WORKER_COUNT, |transaction| {
        for name in names_in(&transaction, typed) {
            let pid = tree.dictionary().get_or_create(&name, is_type_name(&name));
            tree.dictionary().increment(pid);
        }
        let amount = item_count.fetch_add(1, Ordering::Relaxed) + 1;
        if amount % PROGRESS_INTERVAL == 0 {
            info!("processed {amount} entities");
        }
    });

    let total = item_count.load(Ordering::Relaxed);
    if total > u64::from(u32::MAX) {
        warn!("transaction count {total} overflows a u32 support counter");
        return Err(FatalError(PropertyStoreError::OverflowAborted));
    }
    let (props, types) = tree.dictionary().counts(tree.root_pid());
    info!("{total} subjects, {props} properties, {types} types");
    Ok(())
}

fn second_pass(
    tree: &SchemaTree,
    source: &dyn TransactionSource,
    typed: bool,
) -> Result<(), FatalError> {
    let miss = Arc::new(std::sync::Mutex::new(None));
    run_workers(source, WORKER_COUNT, |transaction| {
        if miss.lock().unwrap().is_some() {
            return;
        }
        let mut pids = Vec::with_capacity(transaction.len());
        for name in names_in(&transaction, typed) {
            match tree.dictionary().get(&name) {
                Some(pid) => pids.push(pid),
                None => {
                    *miss.lock().unwrap() = Some(name);
                    return;
                }
            }
        }
        tree.insert(&pids);
    });

    if let Some(name) = miss.lock().unwrap().take() {
        return Err(FatalError(PropertyStoreError::DictionaryMiss(name)));
    }
    info!("second pass complete: {} nodes", tree.node_count());
    Ok(())
}

fn names_in(transaction: &Transaction, typed: bool) -> Vec<String> {
    if typed {
        transaction.clone()
    } else {
        transaction
            .iter()
            .filter(|n| !n.starts_with(TYPE_PREFIX))
            .cloned()
            .collect()
    }
}

fn is_type_name(name: &str) -> bool {
    name.starts_with(TYPE_PREFIX)
}

/// Spawns `worker_count` threads draining `source.open()` through a bounded
/// channel and running `handle` on each transaction, joining all of them
/// before returning — mirroring `firstPass`/`secondPass`'s `sync.WaitGroup`.
fn run_workers<F>(source: &dyn TransactionSource, worker_count: usize, handle: F)
where
    F: Fn(Transaction) + Send + Sync,
{
    thread::scope(|scope| {
        let (tx, rx) = mpsc::sync_channel::<Transaction>(CHANNEL_BOUND);
        let rx = Arc::new(std::sync::Mutex::new(rx));
        let handle = &handle;

        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let rx = Arc::clone(&rx);
            workers.push(scope.spawn(move || loop {
                let transaction = rx.lock().unwrap().recv();
                match transaction {
                    Ok(t) => handle(t),
                    Err(_) => break,
                }
            }));
        }

        for transaction in source.open() {
            tx.send(transaction).expect("worker pool disconnected early");
        }
        drop(tx);

        for worker in workers {
            worker.join().expect("build worker panicked");
        }
    });
}
