//! Token name ↔ id registries for labels, property keys and relationship
//! types.
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{KernelError, Result};
use crate::types::{LabelId, PropertyKeyId, TypeId};

#[derive(Default)]
struct Tokens {
    by_name: FxHashMap<String, i32>,
    names: Vec<String>,
}

/// Lookup counters of one registry.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TokenStats {
    /// Names resolved to an existing id.
    pub hits: u64,
    /// Names that created a new id.
    pub created: u64,
}

/// Dense id space for one token kind. Ids are handed out in creation order
/// starting at zero and are never reused.
pub struct TokenRegistry<T> {
    kind: &'static str,
    inner: RwLock<Tokens>,
    hits: AtomicU64,
    created: AtomicU64,
    wrap: fn(i32) -> T,
}

impl<T: Copy + Into<i32>> TokenRegistry<T> {
    fn new(kind: &'static str, wrap: fn(i32) -> T) -> Self {
        Self {
            kind,
            inner: RwLock::new(Tokens::default()),
            hits: AtomicU64::new(0),
            created: AtomicU64::new(0),
            wrap,
        }
    }

    fn check(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(KernelError::IllegalTokenName(format!(
                "{} name must not be empty",
                self.kind
            )));
        }
        Ok(())
    }

    /// Id for `name`, creating it on first use.
    pub fn get_or_create_for_name(&self, name: &str) -> Result<T> {
        self.check(name)?;
        if let Some(id) = self.inner.read().by_name.get(name) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((self.wrap)(*id));
        }
        let mut tokens = self.inner.write();
        if let Some(id) = tokens.by_name.get(name) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((self.wrap)(*id));
        }
        let id = i32::try_from(tokens.names.len()).map_err(|_| {
            KernelError::InvalidArgument(format!("{} id space exhausted", self.kind))
        })?;
        tokens.names.push(name.to_owned());
        tokens.by_name.insert(name.to_owned(), id);
        self.created.fetch_add(1, Ordering::Relaxed);
        trace!(kind = self.kind, name, id, "kernel.token.create");
        Ok((self.wrap)(id))
    }

    /// Id for `name` if it was ever created.
    pub fn id_for_name(&self, name: &str) -> Option<T> {
        self.inner.read().by_name.get(name).map(|id| (self.wrap)(*id))
    }

    /// Name of `id` if it exists.
    pub fn name_of(&self, id: T) -> Option<String> {
        let at = usize::try_from(id.into()).ok()?;
        self.inner.read().names.get(at).cloned()
    }

    /// Number of tokens created so far.
    pub fn len(&self) -> usize {
        self.inner.read().names.len()
    }

    /// Returns `true` if no token was created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lookup counters.
    pub fn stats(&self) -> TokenStats {
        TokenStats {
            hits: self.hits.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
        }
    }
}

impl<T> std::fmt::Debug for TokenRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("kind", &self.kind)
            .field("len", &self.inner.read().names.len())
            .finish()
    }
}

/// The three token registries of a kernel.
#[derive(Debug)]
pub struct TokenHolders {
    labels: TokenRegistry<LabelId>,
    property_keys: TokenRegistry<PropertyKeyId>,
    relationship_types: TokenRegistry<TypeId>,
}

impl Default for TokenHolders {
    fn default() -> Self {
        Self {
            labels: TokenRegistry::new("label", LabelId),
            property_keys: TokenRegistry::new("property key", PropertyKeyId),
            relationship_types: TokenRegistry::new("relationship type", TypeId),
        }
    }
}

impl TokenHolders {
    /// Label registry.
    pub fn labels(&self) -> &TokenRegistry<LabelId> {
        &self.labels
    }

    /// Property key registry.
    pub fn property_keys(&self) -> &TokenRegistry<PropertyKeyId> {
        &self.property_keys
    }

    /// Relationship type registry.
    pub fn relationship_types(&self) -> &TokenRegistry<TypeId> {
        &self.relationship_types
    }

    /// Label id for `name`, creating it on first use.
    pub fn label_get_or_create(&self, name: &str) -> Result<LabelId> {
        self.labels.get_or_create_for_name(name)
    }

    /// Property key id for `name`, creating it on first use.
    pub fn property_key_get_or_create(&self, name: &str) -> Result<PropertyKeyId> {
        self.property_keys.get_or_create_for_name(name)
    }

    /// Relationship type id for `name`, creating it on first use.
    pub fn relationship_type_get_or_create(&self, name: &str) -> Result<TypeId> {
        self.relationship_types.get_or_create_for_name(name)
    }
}
