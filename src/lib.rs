//! Property-graph kernel access layer.
//!
//! A [`Kernel`] holds committed graph data in memory and hands out
//! [`Transaction`]s. Reads go through reusable cursors that see committed
//! data merged with the transaction's own uncommitted changes; writes are
//! recorded in a per-transaction mutation log and applied on commit.
//! Node and relationship scans can be split across threads with [`Scan`].
//!
//! ```
//! use sombra_kernel::{Cursor, Kernel, KernelOptions, NodeCursor, Value};
//!
//! let kernel = Kernel::open(KernelOptions::default())?;
//! let person = kernel.tokens().label_get_or_create("Person")?;
//! let name = kernel.tokens().property_key_get_or_create("name")?;
//!
//! let mut tx = kernel.begin_transaction()?;
//! let node = {
//!     let mut write = tx.data_write()?;
//!     let node = write.node_create_with_labels(&[person])?;
//!     write.node_set_property(node, name, Value::from("Ada"))?;
//!     node
//! };
//!
//! let mut nodes = NodeCursor::new();
//! tx.data_read()?.single_node(node, &mut nodes)?;
//! assert!(nodes.next());
//! assert!(nodes.has_label(person));
//! assert_eq!(nodes.property_value(name), Some(&Value::from("Ada")));
//! tx.commit()?;
//! # Ok::<(), sombra_kernel::KernelError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cursor;
mod error;
pub mod index;
mod kernel;
mod metrics;
mod options;
mod scan;
mod schema;
mod store;
mod token;
mod txstate;
mod types;
pub mod values;

pub use cursor::{
    Cursor, CursorFactory, CursorPool, CursorState, Degrees, Direction, NodeCursor,
    NodeLabelIndexCursor, NodeValueIndexCursor, PooledCursor, PropertiesReference,
    PropertyCursor, PropertySelection, RelationshipGroupCursor, RelationshipScanCursor,
    RelationshipSelection, RelationshipTraversalCursor, RelationshipsReference, TypeDegrees,
};
pub use error::{EntityType, KernelError, Result};
pub use index::{
    IndexCapability, IndexOrder, IndexQuery, IndexQueryType, RangePredicate,
    SortedIndexCapability, ValueCapability,
};
pub use kernel::{
    CommitOutcome, DataRead, DataWrite, IndexQueryConstraints, Kernel, TerminationHandle,
    Transaction, TransactionStatus, TxId,
};
pub use metrics::{default_metrics, CounterMetrics, KernelMetrics, NoopMetrics};
pub use options::{KernelConfigFile, KernelOptions, TxStateMode};
pub use scan::{Scan, ScanBatch, ScanCursor};
pub use schema::{
    ConstraintDescriptor, ConstraintKind, ConstraintValidator, IndexReference, NoConstraints,
    SchemaRegistry,
};
pub use store::CommitSummary;
pub use token::{TokenHolders, TokenRegistry, TokenStats};
pub use txstate::view::ReadView;
pub use types::{is_reference, LabelId, PropertyKeyId, RelationshipDirection, TypeId, NO_ID};
pub use values::{ArrayValue, Crs, DurationValue, Point, Value, ValueCategory};
