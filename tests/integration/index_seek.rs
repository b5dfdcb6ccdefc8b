//! Value index seeks and scans merged with transaction changes.

#![allow(missing_docs)]

use sombra_kernel::{
    Crs, Cursor, IndexOrder, IndexQuery, IndexQueryConstraints, IndexReference, Kernel,
    KernelError, KernelOptions, LabelId, NodeCursor, NodeValueIndexCursor, Point, PropertyKeyId,
    Result, Transaction, Value, ValueCategory,
};

struct People {
    kernel: Kernel,
    person: LabelId,
    name: PropertyKeyId,
    age: PropertyKeyId,
    by_age: IndexReference,
    /// Committed people, ordered by age: 25, 30, 40.
    young: i64,
    middle: i64,
    old: i64,
    /// Person with a text age.
    text_age: i64,
    /// Person without an age.
    ageless: i64,
}

impl People {
    fn build() -> Result<Self> {
        let kernel = Kernel::open(KernelOptions::default())?;
        let tokens = kernel.tokens();
        let person = tokens.label_get_or_create("Person")?;
        let name = tokens.property_key_get_or_create("name")?;
        let age = tokens.property_key_get_or_create("age")?;

        let mut tx = kernel.begin_transaction()?;
        let (middle, young, old, text_age, ageless) = {
            let mut w = tx.data_write()?;
            let mut person_with = |n: &str, a: Value| -> Result<i64> {
                let node = w.node_create_with_labels(&[person])?;
                w.node_set_property(node, name, Value::from(n))?;
                if !a.is_no_value() {
                    w.node_set_property(node, age, a)?;
                }
                Ok(node)
            };
            (
                person_with("mia", Value::Int(30))?,
                person_with("ann", Value::Int(25))?,
                person_with("ola", Value::Float(40.0))?,
                person_with("tex", Value::from("forty"))?,
                person_with("nil", Value::NoValue)?,
            )
        };
        tx.commit()?;
        let by_age = kernel.create_index(person, &[age])?;
        Ok(Self {
            kernel,
            person,
            name,
            age,
            by_age,
            young,
            middle,
            old,
            text_age,
            ageless,
        })
    }
}

fn seek(
    tx: &Transaction,
    index: &IndexReference,
    constraints: IndexQueryConstraints,
    queries: &[IndexQuery],
) -> Result<Vec<i64>> {
    let mut cursor = NodeValueIndexCursor::new();
    tx.data_read()?
        .node_index_seek(index, &mut cursor, constraints, queries)?;
    let mut nodes = Vec::new();
    while cursor.next() {
        nodes.push(cursor.node_reference());
    }
    Ok(nodes)
}

fn sorted(mut nodes: Vec<i64>) -> Vec<i64> {
    nodes.sort_unstable();
    nodes
}

#[test]
fn exact_and_range_seeks_on_committed_data() -> Result<()> {
    let p = People::build()?;
    let tx = p.kernel.begin_transaction()?;
    let any = IndexQueryConstraints::unconstrained();

    assert_eq!(seek(&tx, &p.by_age, any, &[IndexQuery::exact(p.age, 30)])?, vec![p.middle]);
    assert_eq!(seek(&tx, &p.by_age, any, &[IndexQuery::exact(p.age, 40)])?, vec![p.old]);

    let range = IndexQuery::range(p.age, 25, false, 40, true)?;
    let asc = IndexQueryConstraints::ordered(IndexOrder::Ascending, false);
    assert_eq!(seek(&tx, &p.by_age, asc, &[range.clone()])?, vec![p.middle, p.old]);
    let desc = IndexQueryConstraints::ordered(IndexOrder::Descending, false);
    assert_eq!(seek(&tx, &p.by_age, desc, &[range])?, vec![p.old, p.middle]);

    let numbers = IndexQuery::range_over_category(p.age, ValueCategory::Number)?;
    assert_eq!(
        seek(&tx, &p.by_age, asc, &[numbers])?,
        vec![p.young, p.middle, p.old]
    );

    let exists = seek(&tx, &p.by_age, any, &[IndexQuery::exists(p.age)])?;
    assert_eq!(sorted(exists), sorted(vec![p.young, p.middle, p.old, p.text_age]));
    assert!(!seek(&tx, &p.by_age, any, &[IndexQuery::exists(p.age)])?.contains(&p.ageless));
    Ok(())
}

#[test]
fn string_predicates() -> Result<()> {
    let p = People::build()?;
    let tx = p.kernel.begin_transaction()?;
    let any = IndexQueryConstraints::unconstrained();
    assert_eq!(
        seek(&tx, &p.by_age, any, &[IndexQuery::string_prefix(p.age, "for")])?,
        vec![p.text_age]
    );
    assert_eq!(
        seek(&tx, &p.by_age, any, &[IndexQuery::string_suffix(p.age, "ty")])?,
        vec![p.text_age]
    );
    assert_eq!(
        seek(&tx, &p.by_age, any, &[IndexQuery::string_contains(p.age, "rt")])?,
        vec![p.text_age]
    );
    assert!(seek(&tx, &p.by_age, any, &[IndexQuery::string_prefix(p.age, "x")])?.is_empty());
    Ok(())
}

#[test]
fn seeks_see_transaction_changes() -> Result<()> {
    let p = People::build()?;
    let mut tx = p.kernel.begin_transaction()?;
    let newcomer = {
        let mut w = tx.data_write()?;
        w.node_set_property(p.old, p.age, Value::Int(20))?;
        w.node_remove_label(p.young, p.person)?;
        let newcomer = w.node_create_with_labels(&[p.person])?;
        w.node_set_property(newcomer, p.age, Value::Int(33))?;
        let unlabelled = w.node_create()?;
        w.node_set_property(unlabelled, p.age, Value::Int(31))?;
        newcomer
    };

    let range = IndexQuery::range(p.age, 0, true, 35, true)?;
    let asc = IndexQueryConstraints::ordered(IndexOrder::Ascending, true);
    let mut cursor = NodeValueIndexCursor::new();
    tx.data_read()?
        .node_index_seek(&p.by_age, &mut cursor, asc, &[range])?;
    let mut seen = Vec::new();
    while cursor.next() {
        assert!(cursor.has_value());
        assert_eq!(cursor.num_keys(), 1);
        assert_eq!(cursor.property_key(0), p.age);
        let value = cursor.property_value(0).cloned().unwrap_or_default();
        seen.push((cursor.node_reference(), value));
    }
    assert_eq!(
        seen,
        vec![
            (p.old, Value::Int(20)),
            (p.middle, Value::Int(30)),
            (newcomer, Value::Int(33)),
        ]
    );

    let any = IndexQueryConstraints::unordered(false);
    assert!(seek(&tx, &p.by_age, any, &[IndexQuery::exact(p.age, 25)])?.is_empty());
    Ok(())
}

#[test]
fn unordered_seek_lists_committed_entries_before_changed_ones() -> Result<()> {
    let p = People::build()?;
    let mut tx = p.kernel.begin_transaction()?;
    let newcomer = {
        let mut w = tx.data_write()?;
        w.node_set_property(p.young, p.age, Value::Int(26))?;
        let newcomer = w.node_create_with_labels(&[p.person])?;
        w.node_set_property(newcomer, p.age, Value::Int(1))?;
        newcomer
    };
    let numbers = IndexQuery::range_over_category(p.age, ValueCategory::Number)?;
    let seen = seek(&tx, &p.by_age, IndexQueryConstraints::unordered(false), &[numbers])?;
    assert_eq!(seen, vec![p.middle, p.old, p.young, newcomer]);
    Ok(())
}

#[test]
fn deleted_nodes_leave_the_index() -> Result<()> {
    let p = People::build()?;
    let mut tx = p.kernel.begin_transaction()?;
    tx.data_write()?.node_delete(p.middle)?;
    let any = IndexQueryConstraints::unconstrained();
    assert!(seek(&tx, &p.by_age, any, &[IndexQuery::exact(p.age, 30)])?.is_empty());
    tx.commit()?;

    let tx = p.kernel.begin_transaction()?;
    assert!(seek(&tx, &p.by_age, any, &[IndexQuery::exact(p.age, 30)])?.is_empty());
    Ok(())
}

#[test]
fn committed_changes_update_the_index() -> Result<()> {
    let p = People::build()?;
    let mut tx = p.kernel.begin_transaction()?;
    tx.data_write()?
        .node_set_property(p.ageless, p.age, Value::Int(50))?;
    tx.commit()?;

    let tx = p.kernel.begin_transaction()?;
    let any = IndexQueryConstraints::unconstrained();
    assert_eq!(seek(&tx, &p.by_age, any, &[IndexQuery::exact(p.age, 50)])?, vec![p.ageless]);
    Ok(())
}

#[test]
fn index_scan_returns_every_entry() -> Result<()> {
    let p = People::build()?;
    let tx = p.kernel.begin_transaction()?;
    let mut cursor = NodeValueIndexCursor::new();
    tx.data_read()?.node_index_scan(
        &p.by_age,
        &mut cursor,
        IndexQueryConstraints::ordered(IndexOrder::Ascending, true),
    )?;
    let mut values = Vec::new();
    while cursor.next() {
        values.push(cursor.property_value(0).cloned().unwrap_or_default());
    }
    assert_eq!(values.len(), 4);
    assert!(values.contains(&Value::from("forty")));

    let mut node = NodeCursor::new();
    tx.data_read()?.node_index_scan(
        &p.by_age,
        &mut cursor,
        IndexQueryConstraints::unconstrained(),
    )?;
    assert!(cursor.next());
    assert_eq!(cursor.property_value(0), None);
    cursor.node(&mut node);
    assert!(node.next());
    assert!(node.has_label(p.person));
    Ok(())
}

#[test]
fn composite_index_applies_predicates_per_key() -> Result<()> {
    let p = People::build()?;
    let composite = p.kernel.create_index(p.person, &[p.name, p.age])?;
    assert_eq!(p.kernel.index_lookup(p.person, &[p.name, p.age]), Some(composite.clone()));

    let tx = p.kernel.begin_transaction()?;
    let any = IndexQueryConstraints::unconstrained();
    let found = seek(
        &tx,
        &composite,
        any,
        &[
            IndexQuery::string_prefix(p.name, "m"),
            IndexQuery::range(p.age, 18, true, Value::NoValue, false)?,
        ],
    )?;
    assert_eq!(found, vec![p.middle]);
    let found = seek(
        &tx,
        &composite,
        any,
        &[IndexQuery::exists(p.name), IndexQuery::exists(p.age)],
    )?;
    assert_eq!(found.len(), 4);
    Ok(())
}

#[test]
fn malformed_seeks_are_rejected() -> Result<()> {
    let p = People::build()?;
    let tx = p.kernel.begin_transaction()?;
    let any = IndexQueryConstraints::unconstrained();

    let err = seek(&tx, &p.by_age, any, &[]).unwrap_err();
    assert!(matches!(err, KernelError::InvalidArgument(_)));

    let err = seek(&tx, &p.by_age, any, &[IndexQuery::exact(p.name, 1)]).unwrap_err();
    assert!(matches!(err, KernelError::InvalidArgument(_)));

    let spatial = IndexQuery::range_over_crs(p.age, Crs::Cartesian);
    let asc = IndexQueryConstraints::ordered(IndexOrder::Ascending, false);
    let err = seek(&tx, &p.by_age, asc, &[spatial.clone()]).unwrap_err();
    assert!(matches!(err, KernelError::InvalidArgument(_)));
    assert!(seek(&tx, &p.by_age, any, &[spatial])?.is_empty());

    assert!(IndexQuery::range(p.age, 1, true, "z", true).is_err());
    assert!(IndexQuery::range(p.age, Value::NoValue, true, Value::NoValue, true).is_err());
    assert!(IndexQuery::range(
        p.age,
        Point::cartesian(0.0, 0.0),
        true,
        Point::wgs84(1.0, 1.0),
        true
    )
    .is_err());
    Ok(())
}

#[test]
fn index_created_after_begin_is_not_visible() -> Result<()> {
    let p = People::build()?;
    let tx = p.kernel.begin_transaction()?;
    let by_name = p.kernel.create_index(p.person, &[p.name])?;
    let err = seek(
        &tx,
        &by_name,
        IndexQueryConstraints::unconstrained(),
        &[IndexQuery::exact(p.name, "mia")],
    )
    .unwrap_err();
    assert!(matches!(err, KernelError::InvalidArgument(_)));

    let tx = p.kernel.begin_transaction()?;
    assert_eq!(
        seek(
            &tx,
            &by_name,
            IndexQueryConstraints::unconstrained(),
            &[IndexQuery::exact(p.name, "mia")],
        )?,
        vec![p.middle]
    );
    assert!(matches!(
        p.kernel.create_index(p.person, &[p.name]),
        Err(KernelError::InvalidArgument(_))
    ));
    Ok(())
}
