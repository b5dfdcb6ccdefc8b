//! Overlapping transactions: commits that conflict with an earlier commit.

#![allow(missing_docs)]

use std::sync::atomic::Ordering;
use std::sync::Arc;

use sombra_kernel::{
    CommitOutcome, CounterMetrics, Cursor, EntityType, Kernel, KernelError, KernelOptions,
    LabelId, PropertyKeyId, RelationshipScanCursor, Result, TypeId, Value,
};

struct Pair {
    kernel: Kernel,
    metrics: Arc<CounterMetrics>,
    a: i64,
    b: i64,
    link: TypeId,
    key: PropertyKeyId,
}

fn pair() -> Result<Pair> {
    let metrics = Arc::new(CounterMetrics::default());
    let kernel = Kernel::open(KernelOptions::new().metrics(metrics.clone()))?;
    let link = kernel.tokens().relationship_type_get_or_create("LINK")?;
    let key = kernel.tokens().property_key_get_or_create("weight")?;
    let mut tx = kernel.begin_transaction()?;
    let (a, b) = {
        let mut w = tx.data_write()?;
        (w.node_create()?, w.node_create()?)
    };
    tx.commit()?;
    Ok(Pair {
        kernel,
        metrics,
        a,
        b,
        link,
        key,
    })
}

fn relationships(kernel: &Kernel) -> Result<Vec<(i64, i64, i64)>> {
    let tx = kernel.begin_transaction()?;
    let mut cursor = RelationshipScanCursor::new();
    tx.data_read()?.all_relationships_scan(&mut cursor)?;
    let mut seen = Vec::new();
    while cursor.next() {
        seen.push((
            cursor.relationship_reference(),
            cursor.source_node_reference(),
            cursor.target_node_reference(),
        ));
    }
    Ok(seen)
}

#[test]
fn link_to_concurrently_deleted_node_fails() -> Result<()> {
    let p = pair()?;
    let mut linker = p.kernel.begin_transaction()?;
    linker.data_write()?.relationship_create(p.a, p.link, p.b)?;

    let mut deleter = p.kernel.begin_transaction()?;
    assert!(deleter.data_write()?.node_delete(p.b)?);
    deleter.commit()?;

    assert!(matches!(
        linker.commit(),
        Err(KernelError::Conflict {
            entity: EntityType::Node,
            id
        }) if id == p.b
    ));
    assert_eq!(p.metrics.tx_rolled_back.load(Ordering::Relaxed), 1);

    let tx = p.kernel.begin_transaction()?;
    let read = tx.data_read()?;
    assert!(!read.node_exists(p.b)?);
    assert!(read.node_exists(p.a)?);
    assert_eq!(read.counts_for_node(LabelId::ANY)?, 1);
    assert_eq!(
        read.counts_for_relationship(LabelId::ANY, TypeId::ANY, LabelId::ANY)?,
        0
    );
    assert!(relationships(&p.kernel)?.is_empty());
    Ok(())
}

#[test]
fn delete_of_concurrently_linked_node_fails() -> Result<()> {
    let p = pair()?;
    let mut deleter = p.kernel.begin_transaction()?;
    assert!(deleter.data_write()?.node_delete(p.b)?);

    let mut linker = p.kernel.begin_transaction()?;
    let rel = linker.data_write()?.relationship_create(p.a, p.link, p.b)?;
    linker.commit()?;

    assert!(matches!(
        deleter.commit(),
        Err(KernelError::Conflict {
            entity: EntityType::Relationship,
            id
        }) if id == rel
    ));
    assert_eq!(relationships(&p.kernel)?, vec![(rel, p.a, p.b)]);
    let tx = p.kernel.begin_transaction()?;
    assert!(tx.data_read()?.node_exists(p.b)?);
    Ok(())
}

#[test]
fn writes_to_concurrently_deleted_entities_fail() -> Result<()> {
    let p = pair()?;
    let mut tx = p.kernel.begin_transaction()?;
    let rel = tx.data_write()?.relationship_create(p.a, p.link, p.b)?;
    tx.commit()?;

    let mut writer = p.kernel.begin_transaction()?;
    writer
        .data_write()?
        .relationship_set_property(rel, p.key, Value::Int(3))?;
    let mut remover = p.kernel.begin_transaction()?;
    assert!(remover.data_write()?.relationship_delete(rel)?);
    remover.commit()?;
    assert!(matches!(
        writer.commit(),
        Err(KernelError::Conflict {
            entity: EntityType::Relationship,
            ..
        })
    ));

    let mut labeller = p.kernel.begin_transaction()?;
    let label = p.kernel.tokens().label_get_or_create("Tagged")?;
    labeller.data_write()?.node_add_label(p.a, label)?;
    let mut remover = p.kernel.begin_transaction()?;
    assert!(remover.data_write()?.node_delete(p.a)?);
    remover.commit()?;
    assert!(matches!(
        labeller.commit(),
        Err(KernelError::Conflict {
            entity: EntityType::Node,
            ..
        })
    ));
    let tx = p.kernel.begin_transaction()?;
    assert_eq!(tx.data_read()?.counts_for_node(label)?, 0);
    Ok(())
}

#[test]
fn deleting_twice_across_transactions_conflicts() -> Result<()> {
    let p = pair()?;
    let mut first = p.kernel.begin_transaction()?;
    let mut second = p.kernel.begin_transaction()?;
    assert!(first.data_write()?.node_delete(p.a)?);
    assert!(second.data_write()?.node_delete(p.a)?);
    first.commit()?;
    assert!(second.commit().is_err());
    let tx = p.kernel.begin_transaction()?;
    assert_eq!(tx.data_read()?.counts_for_node(LabelId::ANY)?, 1);
    Ok(())
}

#[test]
fn disjoint_overlapping_commits_both_apply() -> Result<()> {
    let p = pair()?;
    let mut left = p.kernel.begin_transaction()?;
    let mut right = p.kernel.begin_transaction()?;
    left.data_write()?.node_set_property(p.a, p.key, Value::Int(1))?;
    let rel = right.data_write()?.relationship_create(p.b, p.link, p.a)?;
    assert!(matches!(left.commit()?, CommitOutcome::Committed(_)));
    assert!(matches!(right.commit()?, CommitOutcome::Committed(_)));

    assert_eq!(relationships(&p.kernel)?, vec![(rel, p.b, p.a)]);
    assert_eq!(p.metrics.tx_committed.load(Ordering::Relaxed), 3);
    assert_eq!(p.metrics.tx_rolled_back.load(Ordering::Relaxed), 0);
    Ok(())
}
