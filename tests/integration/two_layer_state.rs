//! Two-layer transactions: a stable generation frozen next to the active one.

#![allow(missing_docs)]

use sombra_kernel::{
    Cursor, Kernel, KernelError, KernelOptions, LabelId, NodeCursor, PropertyKeyId, Result,
    Transaction, TxStateMode, Value,
};

fn setup() -> Result<(Kernel, LabelId, PropertyKeyId, i64)> {
    let kernel = Kernel::open(KernelOptions::new().tx_state_mode(TxStateMode::TwoLayer))?;
    let label = kernel.tokens().label_get_or_create("Doc")?;
    let key = kernel.tokens().property_key_get_or_create("rev")?;
    let mut tx = kernel.begin_transaction_with(TxStateMode::Single)?;
    let node = {
        let mut w = tx.data_write()?;
        let node = w.node_create_with_labels(&[label])?;
        w.node_set_property(node, key, Value::Int(0))?;
        node
    };
    tx.commit()?;
    Ok((kernel, label, key, node))
}

fn rev(tx: &Transaction, stable: bool, node: i64, key: PropertyKeyId) -> Result<Option<Value>> {
    let read = if stable {
        tx.stable_data_read()?
    } else {
        tx.data_read()?
    };
    let mut cursor = NodeCursor::new();
    read.single_node(node, &mut cursor)?;
    Ok(if cursor.next() {
        cursor.property_value(key).cloned()
    } else {
        None
    })
}

#[test]
fn stable_reads_start_at_committed_state() -> Result<()> {
    let (kernel, _, key, node) = setup()?;
    let mut tx = kernel.begin_transaction()?;
    assert_eq!(tx.mode(), TxStateMode::TwoLayer);
    tx.data_write()?.node_set_property(node, key, Value::Int(1))?;

    assert_eq!(rev(&tx, false, node, key)?, Some(Value::Int(1)));
    assert_eq!(rev(&tx, true, node, key)?, Some(Value::Int(0)));
    Ok(())
}

#[test]
fn mark_as_stable_freezes_current_changes() -> Result<()> {
    let (kernel, label, key, node) = setup()?;
    let mut tx = kernel.begin_transaction()?;
    tx.data_write()?.node_set_property(node, key, Value::Int(1))?;
    tx.mark_as_stable()?;
    tx.data_write()?.node_set_property(node, key, Value::Int(2))?;
    let fresh = tx.data_write()?.node_create_with_labels(&[label])?;

    assert_eq!(rev(&tx, true, node, key)?, Some(Value::Int(1)));
    assert_eq!(rev(&tx, false, node, key)?, Some(Value::Int(2)));
    assert!(tx.data_read()?.node_exists(fresh)?);
    assert!(!tx.stable_data_read()?.node_exists(fresh)?);
    assert_eq!(tx.stable_data_read()?.counts_for_node(label)?, 1);
    assert_eq!(tx.data_read()?.counts_for_node(label)?, 2);

    tx.mark_as_stable()?;
    assert!(tx.stable_data_read()?.node_exists(fresh)?);
    assert_eq!(rev(&tx, true, node, key)?, Some(Value::Int(2)));
    Ok(())
}

#[test]
fn commit_writes_the_active_layer() -> Result<()> {
    let (kernel, _, key, node) = setup()?;
    let mut tx = kernel.begin_transaction()?;
    tx.data_write()?.node_set_property(node, key, Value::Int(1))?;
    tx.mark_as_stable()?;
    tx.data_write()?.node_set_property(node, key, Value::Int(2))?;
    tx.commit()?;

    let tx = kernel.begin_transaction()?;
    assert_eq!(rev(&tx, false, node, key)?, Some(Value::Int(2)));
    assert_eq!(rev(&tx, true, node, key)?, Some(Value::Int(2)));
    Ok(())
}

#[test]
fn stable_cursor_outlives_later_marks() -> Result<()> {
    let (kernel, _, key, node) = setup()?;
    let mut tx = kernel.begin_transaction()?;
    let mut cursor = NodeCursor::new();
    tx.stable_data_read()?.single_node(node, &mut cursor)?;

    tx.data_write()?.node_set_property(node, key, Value::Int(5))?;
    tx.mark_as_stable()?;

    assert!(cursor.next());
    assert_eq!(cursor.property_value(key), Some(&Value::Int(0)));
    Ok(())
}

#[test]
fn single_layer_transactions_reject_stable_operations() -> Result<()> {
    let (kernel, _, _, _) = setup()?;
    let mut tx = kernel.begin_transaction_with(TxStateMode::Single)?;
    assert!(matches!(tx.stable_data_read(), Err(KernelError::Unsupported(_))));
    assert!(matches!(tx.mark_as_stable(), Err(KernelError::Unsupported(_))));
    Ok(())
}
