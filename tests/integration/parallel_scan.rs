//! Parallel batch scans: every visible entity exactly once across workers.

#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::{Arc, Once};
use std::thread;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sombra_kernel::{
    CounterMetrics, Cursor, Kernel, KernelError, KernelOptions, NodeCursor,
    RelationshipScanCursor, Result, Scan, Transaction, TypeId,
};
use tracing_subscriber::EnvFilter;

const COMMITTED_NODES: usize = 2_000;
const WORKERS: usize = 4;

struct Fixture {
    kernel: Kernel,
    metrics: Arc<CounterMetrics>,
    nodes: Vec<i64>,
    link: TypeId,
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sombra_kernel=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

fn fixture(batch_size: usize) -> Result<Fixture> {
    init_tracing();
    let metrics = Arc::new(CounterMetrics::default());
    let kernel = Kernel::open(
        KernelOptions::new()
            .parallel_batch_size(batch_size)
            .metrics(metrics.clone()),
    )?;
    let link = kernel.tokens().relationship_type_get_or_create("LINK")?;
    let mut tx = kernel.begin_transaction()?;
    let nodes = {
        let mut w = tx.data_write()?;
        let nodes: Vec<i64> = (0..COMMITTED_NODES)
            .map(|_| w.node_create())
            .collect::<Result<_>>()?;
        for pair in nodes.windows(2).step_by(3) {
            w.relationship_create(pair[0], link, pair[1])?;
        }
        nodes
    };
    tx.commit()?;
    Ok(Fixture {
        kernel,
        metrics,
        nodes,
        link,
    })
}

/// Transaction that deletes every seventh committed node and creates a few.
fn churned(fx: &Fixture) -> Result<(Transaction, BTreeSet<i64>)> {
    let mut tx = fx.kernel.begin_transaction()?;
    let mut expected: BTreeSet<i64> = fx.nodes.iter().copied().collect();
    {
        let mut w = tx.data_write()?;
        for node in fx.nodes.iter().step_by(7) {
            w.node_detach_delete(*node)?;
            expected.remove(node);
        }
        for _ in 0..50 {
            expected.insert(w.node_create()?);
        }
    }
    Ok((tx, expected))
}

fn sequential_nodes(tx: &Transaction) -> Result<Vec<i64>> {
    let mut cursor = NodeCursor::new();
    tx.data_read()?.all_nodes_scan(&mut cursor)?;
    let mut seen = Vec::new();
    while cursor.next() {
        seen.push(cursor.node_reference());
    }
    Ok(seen)
}

fn drain_parallel(scan: &Scan<NodeCursor>, seed: u64) -> Result<Vec<i64>> {
    let results: Vec<Result<Vec<i64>>> = thread::scope(|s| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                s.spawn(move || -> Result<Vec<i64>> {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed + worker as u64);
                    let mut cursor = NodeCursor::new();
                    let mut seen = Vec::new();
                    while scan.reserve_batch(&mut cursor, rng.gen_range(1..=97))? {
                        while cursor.next() {
                            seen.push(cursor.node_reference());
                        }
                    }
                    Ok(seen)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    });
    let mut all = Vec::new();
    for result in results {
        all.extend(result?);
    }
    Ok(all)
}

#[test]
fn workers_partition_the_node_scan() -> Result<()> {
    let fx = fixture(64)?;
    let (tx, expected) = churned(&fx)?;
    let scan = tx.data_read()?.all_nodes_scan_parallel()?;
    assert_eq!(
        scan.total_positions(),
        (COMMITTED_NODES + 50) as u64,
        "committed slots plus created nodes"
    );

    for seed in [1, 7, 42] {
        let scan = tx.data_read()?.all_nodes_scan_parallel()?;
        let all = drain_parallel(&scan, seed)?;
        let unique: BTreeSet<i64> = all.iter().copied().collect();
        assert_eq!(unique.len(), all.len(), "seed {seed}: node yielded twice");
        assert_eq!(unique, expected, "seed {seed}");
        assert_eq!(scan.remaining(), 0);
    }

    let sequential: BTreeSet<i64> = sequential_nodes(&tx)?.into_iter().collect();
    assert_eq!(sequential, expected);
    drop(scan);
    Ok(())
}

#[test]
fn default_batches_cover_the_relationship_scan() -> Result<()> {
    let fx = fixture(10)?;
    let mut tx = fx.kernel.begin_transaction()?;
    let created = tx
        .data_write()?
        .relationship_create(fx.nodes[1], fx.link, fx.nodes[0])?;

    let mut expected = BTreeSet::new();
    let mut cursor = RelationshipScanCursor::new();
    tx.data_read()?.all_relationships_scan(&mut cursor)?;
    while cursor.next() {
        expected.insert(cursor.relationship_reference());
    }
    assert!(expected.contains(&created));

    let scan = tx.data_read()?.all_relationships_scan_parallel()?;
    let mut seen = BTreeSet::new();
    let mut batches = 0;
    while scan.reserve_next(&mut cursor)? {
        batches += 1;
        while cursor.next() {
            assert!(seen.insert(cursor.relationship_reference()));
            assert_eq!(cursor.type_id(), fx.link);
        }
    }
    assert_eq!(seen, expected);
    assert_eq!(batches as u64, scan.total_positions().div_ceil(10));
    assert!(fx.metrics.scan_batches.load(std::sync::atomic::Ordering::Relaxed) >= batches);
    Ok(())
}

#[test]
fn zero_hint_reserves_nothing() -> Result<()> {
    let fx = fixture(100)?;
    let tx = fx.kernel.begin_transaction()?;
    let scan = tx.data_read()?.all_nodes_scan_parallel()?;
    let mut cursor = NodeCursor::new();

    assert!(scan.reserve_batch(&mut cursor, 0)?);
    assert!(!cursor.next());
    assert_eq!(scan.remaining(), COMMITTED_NODES as u64);

    assert!(scan.reserve_batch(&mut cursor, usize::MAX)?);
    let mut count = 0;
    while cursor.next() {
        count += 1;
    }
    assert_eq!(count, COMMITTED_NODES);
    assert!(!scan.reserve_batch(&mut cursor, 0)?);
    assert!(!scan.reserve_batch(&mut cursor, 5)?);
    assert!(!cursor.next());
    Ok(())
}

#[test]
fn scan_ignores_changes_made_after_it_began() -> Result<()> {
    let fx = fixture(100)?;
    let mut tx = fx.kernel.begin_transaction()?;
    let scan = tx.data_read()?.all_nodes_scan_parallel()?;
    let late = tx.data_write()?.node_create()?;
    assert!(tx.data_write()?.node_delete(fx.nodes[2])?);

    let all = drain_parallel(&scan, 3)?;
    assert_eq!(all.len(), COMMITTED_NODES);
    assert!(!all.contains(&late));
    assert!(all.contains(&fx.nodes[2]));
    Ok(())
}

#[test]
fn termination_stops_reservation() -> Result<()> {
    let fx = fixture(16)?;
    let tx = fx.kernel.begin_transaction()?;
    let scan = tx.data_read()?.all_nodes_scan_parallel()?;
    let mut cursor = NodeCursor::new();
    assert!(scan.reserve_next(&mut cursor)?);

    let handle = tx.termination_handle();
    thread::spawn(move || assert!(handle.terminate()))
        .join()
        .expect("terminator panicked");

    assert!(matches!(
        scan.reserve_next(&mut cursor),
        Err(KernelError::TransactionTerminated)
    ));
    assert!(matches!(tx.data_read(), Err(KernelError::TransactionTerminated)));
    Ok(())
}
