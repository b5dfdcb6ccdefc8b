//! Relationship reads merging committed data with the transaction's changes.

#![allow(missing_docs)]

use std::collections::BTreeSet;

use sombra_kernel::{
    Cursor, Kernel, KernelError, KernelOptions, NodeCursor, PropertyKeyId, RelationshipDirection,
    RelationshipScanCursor, RelationshipSelection, RelationshipTraversalCursor, Result, TypeId,
    Value,
};

struct Graph {
    kernel: Kernel,
    knows: TypeId,
    likes: TypeId,
    since: PropertyKeyId,
}

impl Graph {
    fn new(options: KernelOptions) -> Result<Self> {
        let kernel = Kernel::open(options)?;
        let tokens = kernel.tokens();
        Ok(Self {
            knows: tokens.relationship_type_get_or_create("KNOWS")?,
            likes: tokens.relationship_type_get_or_create("LIKES")?,
            since: tokens.property_key_get_or_create("since")?,
            kernel,
        })
    }

    /// Commits `count` nodes and returns their references.
    fn nodes(&self, count: usize) -> Result<Vec<i64>> {
        let mut tx = self.kernel.begin_transaction()?;
        let ids = {
            let mut write = tx.data_write()?;
            (0..count).map(|_| write.node_create()).collect::<Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(ids)
    }

    fn relate(&self, source: i64, ty: TypeId, target: i64) -> Result<i64> {
        let mut tx = self.kernel.begin_transaction()?;
        let rel = tx.data_write()?.relationship_create(source, ty, target)?;
        tx.commit()?;
        Ok(rel)
    }
}

fn traverse(
    tx: &sombra_kernel::Transaction,
    node: i64,
    selection: &RelationshipSelection,
) -> Result<Vec<i64>> {
    let mut nodes = NodeCursor::new();
    let mut rels = RelationshipTraversalCursor::new();
    tx.data_read()?.single_node(node, &mut nodes)?;
    assert!(nodes.next());
    nodes.relationships(&mut rels, selection);
    let mut seen = Vec::new();
    while rels.next() {
        assert_eq!(rels.origin_node_reference(), node);
        seen.push(rels.relationship_reference());
    }
    Ok(seen)
}

#[test]
fn created_relationships_come_before_committed_ones() -> Result<()> {
    let g = Graph::new(KernelOptions::default())?;
    let n = g.nodes(3)?;
    let committed = g.relate(n[0], g.knows, n[1])?;

    let mut tx = g.kernel.begin_transaction()?;
    let created = tx.data_write()?.relationship_create(n[0], g.likes, n[2])?;

    let seen = traverse(&tx, n[0], &RelationshipSelection::all())?;
    assert_eq!(seen, vec![created, committed]);

    let mut rels = RelationshipScanCursor::new();
    tx.data_read()?.single_relationship(created, &mut rels)?;
    assert!(rels.next());
    assert_eq!(rels.type_id(), g.likes);
    assert_eq!(rels.source_node_reference(), n[0]);
    assert_eq!(rels.target_node_reference(), n[2]);
    assert!(rels.properties_reference().is_none());
    assert!(!rels.next());
    Ok(())
}

#[test]
fn deleted_relationships_are_skipped_everywhere() -> Result<()> {
    let g = Graph::new(KernelOptions::default())?;
    let n = g.nodes(2)?;
    let keep = g.relate(n[0], g.knows, n[1])?;
    let gone = g.relate(n[1], g.knows, n[0])?;

    let mut tx = g.kernel.begin_transaction()?;
    assert!(tx.data_write()?.relationship_delete(gone)?);
    assert!(!tx.data_write()?.relationship_delete(gone)?);

    assert_eq!(traverse(&tx, n[0], &RelationshipSelection::all())?, vec![keep]);
    assert_eq!(traverse(&tx, n[1], &RelationshipSelection::all())?, vec![keep]);

    let read = tx.data_read()?;
    assert!(!read.relationship_exists(gone)?);
    let mut scan = RelationshipScanCursor::new();
    read.all_relationships_scan(&mut scan)?;
    let mut all = Vec::new();
    while scan.next() {
        all.push(scan.relationship_reference());
    }
    assert_eq!(all, vec![keep]);
    Ok(())
}

#[test]
fn traversal_reports_direction_and_other_node() -> Result<()> {
    let g = Graph::new(KernelOptions::default())?;
    let n = g.nodes(2)?;
    let out = g.relate(n[0], g.knows, n[1])?;
    let inc = g.relate(n[1], g.knows, n[0])?;
    let looped = g.relate(n[0], g.knows, n[0])?;

    let tx = g.kernel.begin_transaction()?;
    let mut nodes = NodeCursor::new();
    let mut rels = RelationshipTraversalCursor::new();
    tx.data_read()?.single_node(n[0], &mut nodes)?;
    assert!(nodes.next());
    nodes.relationships(&mut rels, &RelationshipSelection::all());

    let mut seen = BTreeSet::new();
    while rels.next() {
        let expected = match rels.relationship_reference() {
            id if id == out => (RelationshipDirection::Outgoing, n[1]),
            id if id == inc => (RelationshipDirection::Incoming, n[1]),
            id if id == looped => (RelationshipDirection::Loop, n[0]),
            other => panic!("unexpected relationship {other}"),
        };
        assert_eq!((rels.direction(), rels.other_node_reference()), expected);
        seen.insert(rels.relationship_reference());
    }
    assert_eq!(seen, BTreeSet::from([out, inc, looped]));
    Ok(())
}

#[test]
fn other_node_follows_to_the_neighbour() -> Result<()> {
    let g = Graph::new(KernelOptions::default())?;
    let n = g.nodes(2)?;
    g.relate(n[0], g.knows, n[1])?;

    let tx = g.kernel.begin_transaction()?;
    let mut nodes = NodeCursor::new();
    let mut rels = RelationshipTraversalCursor::new();
    let mut neighbour = NodeCursor::new();
    tx.data_read()?.single_node(n[0], &mut nodes)?;
    assert!(nodes.next());
    nodes.relationships(&mut rels, &RelationshipSelection::all());
    assert!(rels.next());
    rels.other_node(&mut neighbour);
    assert!(neighbour.next());
    assert_eq!(neighbour.node_reference(), n[1]);
    Ok(())
}

#[test]
fn relationship_properties_merge() -> Result<()> {
    let g = Graph::new(KernelOptions::default())?;
    let n = g.nodes(2)?;
    let rel = g.relate(n[0], g.knows, n[1])?;
    {
        let mut tx = g.kernel.begin_transaction()?;
        tx.data_write()?
            .relationship_set_property(rel, g.since, Value::Int(2001))?;
        tx.commit()?;
    }

    let mut tx = g.kernel.begin_transaction()?;
    let previous = tx
        .data_write()?
        .relationship_set_property(rel, g.since, Value::Int(2010))?;
    assert_eq!(previous, Value::Int(2001));

    let mut scan = RelationshipScanCursor::new();
    tx.data_read()?.single_relationship(rel, &mut scan)?;
    assert!(scan.next());
    assert!(scan.has_properties());
    assert_eq!(scan.property_value(g.since), Some(&Value::Int(2010)));

    let removed = tx.data_write()?.relationship_remove_property(rel, g.since)?;
    assert_eq!(removed, Value::Int(2010));
    tx.data_read()?.single_relationship(rel, &mut scan)?;
    assert!(scan.next());
    assert!(!scan.has_properties());
    assert_eq!(scan.property_value(g.since), None);
    Ok(())
}

#[test]
fn relationship_endpoints_must_exist() -> Result<()> {
    let g = Graph::new(KernelOptions::default())?;
    let n = g.nodes(1)?;
    let mut tx = g.kernel.begin_transaction()?;
    let mut write = tx.data_write()?;
    assert!(matches!(
        write.relationship_create(n[0], g.knows, 99),
        Err(KernelError::EntityNotFound { id: 99, .. })
    ));
    assert!(matches!(
        write.relationship_create(n[0], TypeId::ANY, n[0]),
        Err(KernelError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn node_delete_requires_detached_node() -> Result<()> {
    let g = Graph::new(KernelOptions::default())?;
    let n = g.nodes(3)?;
    g.relate(n[0], g.knows, n[1])?;
    g.relate(n[2], g.likes, n[0])?;
    g.relate(n[0], g.likes, n[0])?;

    let mut tx = g.kernel.begin_transaction()?;
    let extra = tx.data_write()?.relationship_create(n[1], g.knows, n[0])?;
    assert!(matches!(
        tx.data_write()?.node_delete(n[0]),
        Err(KernelError::ConstraintViolation(_))
    ));

    let deleted = tx.data_write()?.node_detach_delete(n[0])?;
    assert_eq!(deleted, 4);
    let read = tx.data_read()?;
    assert!(!read.node_exists(n[0])?);
    assert!(!read.relationship_exists(extra)?);
    assert!(traverse(&tx, n[1], &RelationshipSelection::all())?.is_empty());
    assert!(traverse(&tx, n[2], &RelationshipSelection::all())?.is_empty());
    tx.commit()?;

    let tx = g.kernel.begin_transaction()?;
    let read = tx.data_read()?;
    assert_eq!(read.counts_for_relationship(
        sombra_kernel::LabelId::ANY,
        TypeId::ANY,
        sombra_kernel::LabelId::ANY
    )?, 0);
    assert_eq!(read.counts_for_node(sombra_kernel::LabelId::ANY)?, 2);
    Ok(())
}

#[test]
fn deleting_a_created_relationship_cancels_it() -> Result<()> {
    let g = Graph::new(KernelOptions::default())?;
    let n = g.nodes(2)?;
    let mut tx = g.kernel.begin_transaction()?;
    {
        let mut write = tx.data_write()?;
        let rel = write.relationship_create(n[0], g.knows, n[1])?;
        write.relationship_set_property(rel, g.since, Value::Int(1))?;
        assert!(write.relationship_delete(rel)?);
    }
    assert!(!tx.has_data_changes());
    assert!(traverse(&tx, n[0], &RelationshipSelection::all())?.is_empty());
    Ok(())
}
