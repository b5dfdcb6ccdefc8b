use std::collections::BTreeSet;

/// Added and removed members relative to committed data.
///
/// Adding a removed member only cancels the removal and vice versa, so a
/// create-then-delete pair leaves no trace.
#[derive(Clone, Debug)]
pub(crate) struct DiffSets<T: Ord + Copy> {
    added: BTreeSet<T>,
    removed: BTreeSet<T>,
}

impl<T: Ord + Copy> Default for DiffSets<T> {
    fn default() -> Self {
        Self {
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Copy> DiffSets<T> {
    /// Returns `true` when the sets changed.
    pub(crate) fn add(&mut self, item: T) -> bool {
        if self.removed.remove(&item) {
            return true;
        }
        self.added.insert(item)
    }

    /// Returns `true` when the sets changed.
    pub(crate) fn remove(&mut self, item: T) -> bool {
        if self.added.remove(&item) {
            return true;
        }
        self.removed.insert(item)
    }

    pub(crate) fn is_added(&self, item: T) -> bool {
        self.added.contains(&item)
    }

    pub(crate) fn is_removed(&self, item: T) -> bool {
        self.removed.contains(&item)
    }

    pub(crate) fn added(&self) -> &BTreeSet<T> {
        &self.added
    }

    pub(crate) fn removed(&self) -> &BTreeSet<T> {
        &self.removed
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
