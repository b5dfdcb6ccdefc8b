//! Begin/commit/rollback, termination, isolation, counts and kernel plumbing.

#![allow(missing_docs)]

use std::sync::atomic::Ordering;
use std::sync::Arc;

use sombra_kernel::{
    CommitOutcome, ConstraintDescriptor, ConstraintValidator, CounterMetrics, Cursor, Kernel,
    KernelError, KernelOptions, LabelId, NodeCursor, PropertyKeyId, Result, TransactionStatus,
    TxStateMode, TypeId, Value,
};

fn counted() -> Result<(Kernel, Arc<CounterMetrics>)> {
    let metrics = Arc::new(CounterMetrics::default());
    let kernel = Kernel::open(KernelOptions::new().metrics(metrics.clone()))?;
    Ok((kernel, metrics))
}

#[test]
fn commit_without_changes_is_read_only() -> Result<()> {
    let (kernel, metrics) = counted()?;
    let mut tx = kernel.begin_transaction()?;
    assert_eq!(tx.status(), TransactionStatus::Active);
    let label = kernel.tokens().label_get_or_create("L")?;
    {
        let mut w = tx.data_write()?;
        let node = w.node_create()?;
        w.node_add_label(node, label)?;
        w.node_delete(node)?;
    }
    assert_eq!(tx.commit()?, CommitOutcome::ReadOnly);
    assert_eq!(metrics.tx_read_only.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.tx_committed.load(Ordering::Relaxed), 0);
    Ok(())
}

#[test]
fn redundant_writes_leave_transaction_read_only() -> Result<()> {
    let (kernel, metrics) = counted()?;
    let label = kernel.tokens().label_get_or_create("L")?;
    let other = kernel.tokens().label_get_or_create("M")?;
    let key = kernel.tokens().property_key_get_or_create("k")?;
    let absent = kernel.tokens().property_key_get_or_create("absent")?;

    let mut tx = kernel.begin_transaction()?;
    let (node, gone) = {
        let mut w = tx.data_write()?;
        let node = w.node_create_with_labels(&[label])?;
        w.node_set_property(node, key, Value::Int(7))?;
        (node, w.node_create()?)
    };
    tx.commit()?;

    let mut tx = kernel.begin_transaction()?;
    {
        let mut w = tx.data_write()?;
        assert_eq!(w.node_set_property(node, key, Value::Int(7))?, Value::Int(7));
        assert!(!w.node_add_label(node, label)?);
        assert!(!w.node_remove_label(node, other)?);
        assert_eq!(w.node_remove_property(node, absent)?, Value::NoValue);
    }
    assert!(!tx.has_data_changes());
    assert_eq!(tx.commit()?, CommitOutcome::ReadOnly);

    let mut tx = kernel.begin_transaction()?;
    {
        let mut w = tx.data_write()?;
        assert!(w.node_delete(gone)?);
        assert!(!w.node_delete(gone)?);
        assert!(matches!(
            w.node_set_property(gone, key, Value::Int(1)),
            Err(KernelError::EntityNotFound { .. })
        ));
    }
    assert!(matches!(tx.commit()?, CommitOutcome::Committed(_)));
    assert_eq!(metrics.tx_read_only.load(Ordering::Relaxed), 1);
    Ok(())
}

#[test]
fn commit_reports_what_it_wrote() -> Result<()> {
    let (kernel, metrics) = counted()?;
    let rel_type = kernel.tokens().relationship_type_get_or_create("R")?;
    let mut tx = kernel.begin_transaction()?;
    {
        let mut w = tx.data_write()?;
        let a = w.node_create()?;
        let b = w.node_create()?;
        w.relationship_create(a, rel_type, b)?;
    }
    let CommitOutcome::Committed(summary) = tx.commit()? else {
        panic!("expected a committing transaction");
    };
    assert_eq!(summary.nodes_created, 2);
    assert_eq!(summary.relationships_created, 1);
    assert_eq!(summary.nodes_deleted, 0);
    assert_eq!(metrics.tx_committed.load(Ordering::Relaxed), 1);
    Ok(())
}

#[test]
fn rollback_and_drop_discard_changes() -> Result<()> {
    let (kernel, metrics) = counted()?;

    let mut tx = kernel.begin_transaction()?;
    let rolled_back = tx.data_write()?.node_create()?;
    tx.rollback()?;

    let mut tx = kernel.begin_transaction()?;
    let dropped = tx.data_write()?.node_create()?;
    drop(tx);

    let mut tx = kernel.begin_transaction()?;
    let closed = tx.data_write()?.node_create()?;
    tx.close();

    assert_eq!(metrics.tx_rolled_back.load(Ordering::Relaxed), 3);
    let tx = kernel.begin_transaction()?;
    let read = tx.data_read()?;
    for node in [rolled_back, dropped, closed] {
        assert!(!read.node_exists(node)?);
    }
    assert_eq!(read.counts_for_node(LabelId::ANY)?, 0);
    Ok(())
}

#[test]
fn ids_are_not_reused_after_rollback() -> Result<()> {
    let (kernel, _) = counted()?;
    let mut tx = kernel.begin_transaction()?;
    let first = tx.data_write()?.node_create()?;
    tx.rollback()?;

    let mut tx = kernel.begin_transaction()?;
    let second = tx.data_write()?.node_create()?;
    assert_ne!(first, second);
    Ok(())
}

#[test]
fn terminated_transaction_fails_every_operation() -> Result<()> {
    let (kernel, metrics) = counted()?;
    let mut tx = kernel.begin_transaction()?;
    let node = tx.data_write()?.node_create()?;
    let handle = tx.termination_handle();
    assert!(!handle.is_terminated());
    assert!(handle.terminate());
    assert!(!handle.terminate());
    assert!(handle.is_terminated());
    assert_eq!(metrics.tx_terminated.load(Ordering::Relaxed), 1);

    assert!(matches!(tx.data_read(), Err(KernelError::TransactionTerminated)));
    assert!(matches!(tx.data_write(), Err(KernelError::TransactionTerminated)));
    assert!(matches!(tx.commit(), Err(KernelError::TransactionTerminated)));

    let tx = kernel.begin_transaction()?;
    assert!(!tx.data_read()?.node_exists(node)?);
    Ok(())
}

#[test]
fn read_handle_fails_after_termination() -> Result<()> {
    let (kernel, _) = counted()?;
    let tx = kernel.begin_transaction()?;
    let read = tx.data_read()?;
    tx.termination_handle().terminate();
    let mut cursor = NodeCursor::new();
    assert!(matches!(
        read.all_nodes_scan(&mut cursor),
        Err(KernelError::TransactionTerminated)
    ));
    Ok(())
}

#[test]
fn transactions_read_the_snapshot_they_began_with() -> Result<()> {
    let (kernel, _) = counted()?;
    let reader = kernel.begin_transaction()?;

    let mut writer = kernel.begin_transaction()?;
    let node = writer.data_write()?.node_create()?;
    writer.commit()?;

    assert!(!reader.data_read()?.node_exists(node)?);
    let mut cursor = NodeCursor::new();
    reader.data_read()?.all_nodes_scan(&mut cursor)?;
    assert!(!cursor.next());

    let late = kernel.begin_transaction()?;
    assert!(late.data_read()?.node_exists(node)?);
    assert!(reader.id() < late.id());
    Ok(())
}

#[test]
fn counts_merge_transaction_changes() -> Result<()> {
    let (kernel, _) = counted()?;
    let tokens = kernel.tokens();
    let person = tokens.label_get_or_create("Person")?;
    let city = tokens.label_get_or_create("City")?;
    let lives_in = tokens.relationship_type_get_or_create("LIVES_IN")?;

    let mut tx = kernel.begin_transaction()?;
    let (ada, paris) = {
        let mut w = tx.data_write()?;
        let ada = w.node_create_with_labels(&[person])?;
        let paris = w.node_create_with_labels(&[city])?;
        w.relationship_create(ada, lives_in, paris)?;
        (ada, paris)
    };
    tx.commit()?;

    let mut tx = kernel.begin_transaction()?;
    {
        let mut w = tx.data_write()?;
        let bob = w.node_create_with_labels(&[person])?;
        w.relationship_create(bob, lives_in, paris)?;
        w.node_remove_label(ada, person)?;
    }
    let read = tx.data_read()?;
    assert_eq!(read.counts_for_node(person)?, 1);
    assert_eq!(read.counts_for_node_without_tx_state(person)?, 1);
    assert_eq!(read.counts_for_node(LabelId::ANY)?, 3);
    assert_eq!(read.counts_for_node(city)?, 1);

    assert_eq!(read.counts_for_relationship(LabelId::ANY, lives_in, LabelId::ANY)?, 2);
    assert_eq!(read.counts_for_relationship(person, lives_in, LabelId::ANY)?, 1);
    assert_eq!(read.counts_for_relationship(LabelId::ANY, TypeId::ANY, city)?, 2);
    assert_eq!(
        read.counts_for_relationship_without_tx_state(person, lives_in, LabelId::ANY)?,
        1
    );
    assert!(matches!(
        read.counts_for_relationship(person, lives_in, city),
        Err(KernelError::Unsupported(_))
    ));
    tx.commit()?;

    let tx = kernel.begin_transaction()?;
    let read = tx.data_read()?;
    assert_eq!(read.counts_for_node_without_tx_state(person)?, 1);
    assert_eq!(read.counts_for_relationship(person, lives_in, LabelId::ANY)?, 1);
    assert_eq!(read.counts_for_relationship(LabelId::ANY, lives_in, city)?, 2);
    Ok(())
}

struct NoNegativeAges {
    age: PropertyKeyId,
}

impl ConstraintValidator for NoNegativeAges {
    fn validate_node_property(
        &self,
        node: i64,
        _labels: &[LabelId],
        key: PropertyKeyId,
        value: &Value,
    ) -> Result<()> {
        match value {
            Value::Int(v) if key == self.age && *v < 0 => Err(KernelError::ConstraintViolation(
                format!("node {node} cannot have a negative age"),
            )),
            _ => Ok(()),
        }
    }
}

#[test]
fn validator_rejects_writes_before_they_are_recorded() -> Result<()> {
    let age = PropertyKeyId(0);
    let kernel = Kernel::open(
        KernelOptions::new().constraint_validator(Arc::new(NoNegativeAges { age })),
    )?;
    assert_eq!(kernel.tokens().property_key_get_or_create("age")?, age);

    let mut tx = kernel.begin_transaction()?;
    let mut w = tx.data_write()?;
    let node = w.node_create()?;
    assert!(matches!(
        w.node_set_property(node, age, Value::Int(-1)),
        Err(KernelError::ConstraintViolation(_))
    ));
    w.node_set_property(node, age, Value::Int(1))?;
    drop(w);

    let mut cursor = NodeCursor::new();
    tx.data_read()?.single_node(node, &mut cursor)?;
    assert!(cursor.next());
    assert_eq!(cursor.property_value(age), Some(&Value::Int(1)));
    Ok(())
}

#[test]
fn constraints_are_registered_once() -> Result<()> {
    let (kernel, _) = counted()?;
    let person = kernel.tokens().label_get_or_create("Person")?;
    let email = kernel.tokens().property_key_get_or_create("email")?;
    let unique = ConstraintDescriptor::uniqueness(person, &[email]);
    assert!(!kernel.constraint_exists(&unique));
    kernel.create_constraint(unique.clone())?;
    assert!(kernel.constraint_exists(&unique));
    assert!(kernel.create_constraint(unique).is_err());
    assert!(kernel
        .create_constraint(ConstraintDescriptor::existence(LabelId::ANY, &[email]))
        .is_err());
    Ok(())
}

#[test]
fn tokens_are_dense_and_stable() -> Result<()> {
    let (kernel, _) = counted()?;
    let labels = kernel.tokens().labels();
    let a = labels.get_or_create_for_name("A")?;
    let b = labels.get_or_create_for_name("B")?;
    assert_eq!((a, b), (LabelId(0), LabelId(1)));
    assert_eq!(labels.get_or_create_for_name("A")?, a);
    assert_eq!(labels.id_for_name("B"), Some(b));
    assert_eq!(labels.name_of(b).as_deref(), Some("B"));
    assert_eq!(labels.id_for_name("C"), None);
    assert!(matches!(
        labels.get_or_create_for_name("  "),
        Err(KernelError::IllegalTokenName(_))
    ));
    let stats = labels.stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.hits, 1);
    Ok(())
}

#[test]
fn pooled_cursors_are_returned_closed() -> Result<()> {
    let (kernel, _) = counted()?;
    let mut tx = kernel.begin_transaction()?;
    let node = tx.data_write()?.node_create()?;
    {
        let mut cursor = kernel.cursors().allocate_node_cursor();
        tx.data_read()?.single_node(node, &mut cursor)?;
        assert!(cursor.next());
    }
    let cursor = kernel.cursors().allocate_node_cursor();
    assert!(!cursor.is_positioned());
    Ok(())
}

#[test]
fn options_load_from_toml() -> Result<()> {
    let options = KernelOptions::from_toml_str(
        "dense_node_threshold = 8\nparallel_batch_size = 32\ntx_state_mode = \"two-layer\"\n",
    )?;
    let kernel = Kernel::open(options)?;
    assert_eq!(kernel.options().dense_node_threshold, 8);
    assert_eq!(kernel.options().parallel_batch_size, 32);
    assert_eq!(kernel.begin_transaction()?.mode(), TxStateMode::TwoLayer);
    assert!(KernelOptions::from_toml_str("unknown = 1").is_err());
    Ok(())
}
